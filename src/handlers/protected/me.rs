// handlers/protected/me.rs - GET /api/v1/me

use axum::Extension;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::types::Role;

#[derive(Debug, Serialize)]
pub struct Whoami {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

/// GET /api/v1/me - The account behind the bearer token
pub async fn show(Extension(CurrentUser(user)): Extension<CurrentUser>) -> ApiResult<Whoami> {
    Ok(ApiResponse::success(Whoami {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}
