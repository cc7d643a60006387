// handlers/admin/users.rs - Account management

use axum::{
    extract::State,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{check_password_strength, hash_password, normalize_email};
use crate::database::models::{User, UserStats};
use crate::database::repos::{UserChanges, UserRepo};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, CurrentUser};
use crate::types::{Paging, Role};

#[derive(Debug, Default, Deserialize)]
pub struct RoleFilter {
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct NewUserIn {
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Customer
}

#[derive(Debug, Deserialize)]
pub struct PasswordIn {
    pub new_password: String,
}

/// GET /api/v1/admin/users/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<UserStats> {
    let stats = UserRepo::new(state.pool.clone()).stats().await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/v1/admin/users?role=admin|customer
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(paging): ApiQuery<Paging>,
    ApiQuery(filter): ApiQuery<RoleFilter>,
) -> ApiResult<Vec<User>> {
    let (offset, limit) = state.page(&paging);
    let users = UserRepo::new(state.pool.clone())
        .list(filter.role, offset, limit)
        .await?;
    Ok(ApiResponse::success(users))
}

/// GET /api/v1/admin/users/:id
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<User> {
    let user = UserRepo::new(state.pool.clone()).get(id).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/v1/admin/users - Create an admin or customer account
pub async fn create(State(state): State<AppState>, ApiJson(payload): ApiJson<NewUserIn>) -> ApiResult<User> {
    let email = normalize_email(&payload.email)?;
    check_password_strength(&payload.password, &state.config.security)?;

    let hashed = hash_password(&payload.password)?;
    let user = UserRepo::new(state.pool.clone())
        .create(&email, &hashed, payload.role)
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User created by admin");
    Ok(ApiResponse::created(user))
}

/// PUT /api/v1/admin/users/:id - Change email, role or active flag
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut changes): ApiJson<UserChanges>,
) -> ApiResult<User> {
    if id == admin.id && changes.is_active == Some(false) {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    if let Some(email) = changes.email.as_deref() {
        changes.email = Some(normalize_email(email)?);
    }

    let user = UserRepo::new(state.pool.clone()).update(id, &changes).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/v1/admin/users/:id/password
pub async fn set_password(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PasswordIn>,
) -> ApiResult<User> {
    check_password_strength(&payload.new_password, &state.config.security)?;
    let hashed = hash_password(&payload.new_password)?;

    let user = UserRepo::new(state.pool.clone()).set_password(id, &hashed).await?;
    tracing::info!(user_id = id, "Password reset by admin");
    Ok(ApiResponse::success(user))
}

/// PATCH /api/v1/admin/users/:id/toggle-active
pub async fn toggle_active(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<User> {
    if id == admin.id {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }

    let user = UserRepo::new(state.pool.clone()).toggle_active(id).await?;
    tracing::info!(user_id = id, is_active = user.is_active, "Account toggled");
    Ok(ApiResponse::success(user))
}

/// DELETE /api/v1/admin/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if id == admin.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let documents = UserRepo::new(state.pool.clone()).delete(id).await?;
    state.documents().discard_files(&documents).await;

    tracing::info!(user_id = id, "User deleted");
    Ok(ApiResponse::no_content())
}
