// handlers/admin/customers.rs - Customer accounts and their documents

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::{Document, User};
use crate::database::repos::UserRepo;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::types::{Paging, Role};

/// GET /api/v1/admin/customers
pub async fn list(State(state): State<AppState>, ApiQuery(paging): ApiQuery<Paging>) -> ApiResult<Vec<User>> {
    let (offset, limit) = state.page(&paging);
    let users = UserRepo::new(state.pool.clone())
        .list(Some(Role::Customer), offset, limit)
        .await?;
    Ok(ApiResponse::success(users))
}

/// GET /api/v1/admin/customers/:user_id/documents
pub async fn documents(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<Document>> {
    let (offset, limit) = state.page(&paging);
    let documents = state.documents().list_for_owner(user_id, offset, limit).await?;
    Ok(ApiResponse::success(documents))
}
