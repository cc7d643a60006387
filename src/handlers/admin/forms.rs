// handlers/admin/forms.rs - Read-only access to intake forms

use axum::extract::State;

use crate::app::AppState;
use crate::database::models::IntakeForm;
use crate::database::repos::FormRepo;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::types::Paging;

use super::CompletedFilter;

/// GET /api/v1/admin/forms?completed=true
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(paging): ApiQuery<Paging>,
    ApiQuery(filter): ApiQuery<CompletedFilter>,
) -> ApiResult<Vec<IntakeForm>> {
    let (offset, limit) = state.page(&paging);
    let forms = FormRepo::new(state.pool.clone())
        .list(filter.completed, offset, limit)
        .await?;
    Ok(ApiResponse::success(forms))
}

/// GET /api/v1/admin/forms/:id
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<IntakeForm> {
    let form = FormRepo::new(state.pool.clone()).get(id).await?;
    Ok(ApiResponse::success(form))
}
