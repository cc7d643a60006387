// handlers/admin/documents.rs - Document listing, download and review

use axum::{
    extract::State,
    response::Response,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{Document, NewActivity};
use crate::error::ApiError;
use crate::handlers::protected::documents::file_response;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, CurrentUser};
use crate::services::activity;
use crate::types::{DocumentStatus, Paging};

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewIn {
    pub status: DocumentStatus,
    pub admin_notes: Option<String>,
}

/// GET /api/v1/admin/documents?status=pending - All documents, newest first
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(paging): ApiQuery<Paging>,
    ApiQuery(filter): ApiQuery<StatusFilter>,
) -> ApiResult<Vec<Document>> {
    let (offset, limit) = state.page(&paging);
    let documents = state.documents().list_all(filter.status, offset, limit).await?;
    Ok(ApiResponse::success(documents))
}

/// GET /api/v1/admin/documents/:id/download - Download any document
pub async fn download(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<Response, ApiError> {
    let (document, data) = state.documents().download(id, None).await?;
    Ok(file_response(&document, data))
}

/// PUT|PATCH /api/v1/admin/documents/:id - Approve or reject
///
/// Expected Input:
/// ```json
/// { "status": "approved" | "rejected", "admin_notes": "optional text" }
/// ```
pub async fn review(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ReviewIn>,
) -> ApiResult<Document> {
    let document = state
        .documents()
        .review(id, payload.status, payload.admin_notes)
        .await?;

    let (activity_type, title) = match document.status {
        DocumentStatus::Rejected => (activity::DOCUMENT_REJECTED, "Document rejected"),
        _ => (activity::DOCUMENT_APPROVED, "Document approved"),
    };
    activity::record(
        &state.pool,
        NewActivity::new(activity_type, title)
            .description(format!("{} reviewed {} ({})", admin.email, document.category, document.status))
            .about(document.user_id)
            .performed_by(&admin),
    )
    .await;

    Ok(ApiResponse::success(document))
}
