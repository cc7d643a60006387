// handlers/admin/activities.rs - Audit log

use axum::{
    extract::State,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{Activity, NewActivity};
use crate::database::repos::{ActivityFilter, ActivityRepo};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, CurrentUser};
use crate::types::Paging;

const DEFAULT_RECENT: i64 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

/// GET /api/v1/admin/activities?activity_type=&days=30
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(paging): ApiQuery<Paging>,
    ApiQuery(filter): ApiQuery<ActivityFilter>,
) -> ApiResult<Vec<Activity>> {
    let (offset, limit) = state.page(&paging);
    let activities = ActivityRepo::new(state.pool.clone())
        .list(&filter, offset, limit)
        .await?;
    Ok(ApiResponse::success(activities))
}

/// GET /api/v1/admin/activities/recent?limit=10
pub async fn recent(State(state): State<AppState>, ApiQuery(query): ApiQuery<RecentQuery>) -> ApiResult<Vec<Activity>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT)
        .clamp(1, state.config.api.max_page_limit);
    let activities = ActivityRepo::new(state.pool.clone()).recent(limit).await?;
    Ok(ApiResponse::success(activities))
}

/// GET /api/v1/admin/activities/types - Distinct activity types on record
pub async fn types(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let types = ActivityRepo::new(state.pool.clone()).types().await?;
    Ok(ApiResponse::success(types))
}

/// POST /api/v1/admin/activities - Manual entry, attributed to the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(entry): ApiJson<NewActivity>,
) -> ApiResult<Activity> {
    if entry.activity_type.trim().is_empty() {
        return Err(ApiError::field_error("activity_type", "activity_type is required"));
    }
    if entry.title.trim().is_empty() {
        return Err(ApiError::field_error("title", "title is required"));
    }

    let entry = entry.performed_by(&admin);
    let activity = ActivityRepo::new(state.pool.clone()).insert(&entry).await?;
    Ok(ApiResponse::created(activity))
}
