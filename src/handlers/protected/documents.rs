// handlers/protected/documents.rs - Owner-facing document endpoints

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::models::{Document, NewActivity};
use crate::error::ApiError;
use crate::middleware::{ApiPath, ApiQuery, ApiResponse, ApiResult, CurrentUser};
use crate::services::{activity, UploadRequest, WorkflowError};
use crate::storage::sanitize_basename;
use crate::types::Paging;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub replace: bool,
}

struct UploadedFile {
    original_name: String,
    mime_type: String,
    data: Vec<u8>,
    oversize: bool,
}

/// Serve stored bytes as an attachment
pub(crate) fn file_response(document: &Document, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, document.mime_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", sanitize_basename(&document.original_name)),
            ),
        ],
        data,
    )
        .into_response()
}

/// Read the `file` part in chunks, keeping at most `max_bytes`
async fn read_file_field(
    mut field: axum::extract::multipart::Field<'_>,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    let original_name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut data = Vec::new();
    let mut oversize = false;
    while let Some(chunk) = field.chunk().await? {
        if oversize || data.len() + chunk.len() > max_bytes {
            oversize = true;
            continue;
        }
        data.extend_from_slice(&chunk);
    }

    Ok(UploadedFile {
        original_name,
        mime_type,
        data,
        oversize,
    })
}

/// POST /api/v1/documents?replace=bool - Upload a document
///
/// Multipart fields: `category` (one of /api/v1/categories), `file`, and an
/// optional `family_member_name`. Without `replace=true` a second upload for
/// the same category and family member is a 409.
pub async fn upload(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<UploadQuery>,
    mut multipart: Multipart,
) -> ApiResult<Document> {
    let service = state.documents();

    let mut category = None;
    let mut family_member_name = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "category" => category = Some(field.text().await?),
            "family_member_name" => family_member_name = Some(field.text().await?),
            "file" => file = Some(read_file_field(field, service.max_upload_bytes()).await?),
            other => tracing::debug!(field = other, "Ignoring unexpected multipart field"),
        }
    }

    let category = category.ok_or_else(|| ApiError::field_error("category", "category is required"))?;
    let file = file.ok_or_else(|| ApiError::field_error("file", "file is required"))?;

    if file.oversize {
        service.check_metadata(&category, &file.mime_type)?;
        return Err(WorkflowError::TooLarge {
            limit: service.max_upload_bytes(),
        }
        .into());
    }

    let outcome = service
        .upload(UploadRequest {
            user_id: user.id,
            category,
            original_name: file.original_name,
            mime_type: file.mime_type,
            data: file.data,
            family_member_name,
            replace: query.replace,
        })
        .await?;

    let document = outcome.document;
    let title = if outcome.replaced.is_empty() {
        "Document uploaded"
    } else {
        "Document replaced"
    };
    activity::record(
        &state.pool,
        NewActivity::new(activity::DOCUMENT_UPLOADED, title)
            .description(format!("{} uploaded {}", user.email, document.category))
            .about(user.id)
            .performed_by(&user),
    )
    .await;

    Ok(ApiResponse::created(document))
}

/// GET /api/v1/documents - The caller's documents, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<Document>> {
    let (offset, limit) = state.page(&paging);
    let documents = state.documents().list_for_owner(user.id, offset, limit).await?;
    Ok(ApiResponse::success(documents))
}

/// GET /api/v1/documents/:id - Download one of the caller's documents
pub async fn download(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    let (document, data) = state.documents().download(id, Some(user.id)).await?;
    Ok(file_response(&document, data))
}

/// DELETE /api/v1/documents/:id - Remove one of the caller's documents
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    state.documents().delete(id, user.id).await?;
    Ok(ApiResponse::no_content())
}
