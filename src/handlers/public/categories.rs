// handlers/public/categories.rs - GET /api/v1/categories[/:id]

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Category;
use crate::database::repos::CategoryRepo;
use crate::middleware::{ApiPath, ApiResponse, ApiResult};
use crate::services::ALLOWED_CATEGORIES;

/// GET /api/v1/categories - The category names accepted by document upload
pub async fn list() -> ApiResult<Vec<&'static str>> {
    Ok(ApiResponse::success(ALLOWED_CATEGORIES.to_vec()))
}

/// GET /api/v1/categories/:id - One row of the category catalog
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Category> {
    let category = CategoryRepo::new(state.pool.clone()).get(id).await?;
    Ok(ApiResponse::success(category))
}
