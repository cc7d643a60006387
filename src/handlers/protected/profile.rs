// handlers/protected/profile.rs - The caller's own client profile

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::{Client, NewActivity};
use crate::database::repos::{ClientRepo, ProfileChanges};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, CurrentUser};
use crate::services::activity;

/// GET /api/v1/clients/me/profile - Fetch the profile, creating it on first access
pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Client> {
    let client = ClientRepo::new(state.pool.clone()).get_or_create(user.id).await?;
    Ok(ApiResponse::success(client))
}

/// PUT /api/v1/clients/me/profile - Create or update the profile
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Client> {
    changes
        .validate()
        .map_err(|msg| ApiError::validation_error(msg, None))?;

    let client = ClientRepo::new(state.pool.clone()).upsert(user.id, &changes).await?;

    activity::record(
        &state.pool,
        NewActivity::new(activity::CLIENT_UPDATED, "Profile updated")
            .description(format!("{} updated their profile", user.email))
            .about(user.id)
            .performed_by(&user),
    )
    .await;

    Ok(ApiResponse::success(client))
}
