// handlers/admin/categories.rs - Category catalog management

use axum::extract::State;
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::Category;
use crate::database::repos::{CategoryChanges, CategoryRepo, NewCategory};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub active_only: bool,
}

fn require_name(name: Option<&str>) -> Result<(), ApiError> {
    match name {
        Some(name) if name.trim().is_empty() => Err(ApiError::field_error("name", "name must not be blank")),
        _ => Ok(()),
    }
}

/// GET /api/v1/admin/categories?active_only=true - Catalog in display order
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<CatalogQuery>) -> ApiResult<Vec<Category>> {
    let categories = CategoryRepo::new(state.pool.clone()).list(query.active_only).await?;
    Ok(ApiResponse::success(categories))
}

/// POST /api/v1/admin/categories
pub async fn create(State(state): State<AppState>, ApiJson(payload): ApiJson<NewCategory>) -> ApiResult<Category> {
    require_name(Some(&payload.name))?;
    let category = CategoryRepo::new(state.pool.clone()).create(&payload).await?;
    Ok(ApiResponse::created(category))
}

/// PUT /api/v1/admin/categories/:id
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<CategoryChanges>,
) -> ApiResult<Category> {
    require_name(changes.name.as_deref())?;
    let category = CategoryRepo::new(state.pool.clone()).update(id, &changes).await?;
    Ok(ApiResponse::success(category))
}

/// DELETE /api/v1/admin/categories/:id
pub async fn delete(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<()> {
    CategoryRepo::new(state.pool.clone()).delete(id).await?;
    Ok(ApiResponse::no_content())
}
