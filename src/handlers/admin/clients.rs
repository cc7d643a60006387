// handlers/admin/clients.rs - Client profile management

use axum::{
    extract::State,
    Extension,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{check_password_strength, hash_password, normalize_email};
use crate::database::models::{Client, ClientWithEmail, Document, NewActivity};
use crate::database::repos::{ClientRepo, ProfileChanges};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, CurrentUser};
use crate::services::activity;
use crate::types::{ClientStatus, Paging};

#[derive(Debug, Default, Deserialize)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
}

/// Account credentials plus the initial profile
#[derive(Debug, Deserialize)]
pub struct NewClientIn {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: ProfileChanges,
}

fn validate(changes: &ProfileChanges) -> Result<(), ApiError> {
    changes.validate().map_err(|msg| ApiError::validation_error(msg, None))
}

/// GET /api/v1/admin/clients?status=active
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(paging): ApiQuery<Paging>,
    ApiQuery(filter): ApiQuery<ClientFilter>,
) -> ApiResult<Vec<ClientWithEmail>> {
    let (offset, limit) = state.page(&paging);
    let clients = ClientRepo::new(state.pool.clone())
        .list(filter.status, offset, limit)
        .await?;
    Ok(ApiResponse::success(clients))
}

/// POST /api/v1/admin/clients - Create a customer account with its profile
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<NewClientIn>,
) -> ApiResult<ClientWithEmail> {
    let email = normalize_email(&payload.email)?;
    check_password_strength(&payload.password, &state.config.security)?;
    validate(&payload.profile)?;

    let hashed = hash_password(&payload.password)?;
    let (user, client) = ClientRepo::new(state.pool.clone())
        .create_with_account(&email, &hashed, &payload.profile)
        .await?;

    tracing::info!(user_id = user.id, client_id = client.client.id, "Client created by admin");
    activity::record(
        &state.pool,
        NewActivity::new(activity::USER_REGISTERED, "New client registered")
            .description(format!("{} was registered by {}", user.email, admin.email))
            .about(user.id)
            .performed_by(&admin),
    )
    .await;

    Ok(ApiResponse::created(client))
}

/// GET /api/v1/admin/clients/:id
pub async fn show(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<ClientWithEmail> {
    let client = ClientRepo::new(state.pool.clone()).get(id).await?;
    Ok(ApiResponse::success(client))
}

/// PUT /api/v1/admin/clients/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<ProfileChanges>,
) -> ApiResult<Client> {
    validate(&changes)?;
    let client = ClientRepo::new(state.pool.clone()).update(id, &changes).await?;

    activity::record(
        &state.pool,
        NewActivity::new(activity::CLIENT_UPDATED, "Client updated")
            .description(format!("{} updated client {}", admin.email, client.id))
            .about(client.user_id)
            .performed_by(&admin),
    )
    .await;

    Ok(ApiResponse::success(client))
}

/// DELETE /api/v1/admin/clients/:id - Deletes the profile and its account
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    let repo = ClientRepo::new(state.pool.clone());
    let client = repo.get(id).await?;
    if client.client.user_id == admin.id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let documents = repo.delete_with_account(id).await?;
    state.documents().discard_files(&documents).await;

    tracing::info!(client_id = id, user_id = client.client.user_id, "Client deleted");
    Ok(ApiResponse::no_content())
}

/// GET /api/v1/admin/clients/:id/documents
pub async fn documents(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<Document>> {
    let client = ClientRepo::new(state.pool.clone()).get(id).await?;
    let (offset, limit) = state.page(&paging);
    let documents = state
        .documents()
        .list_for_owner(client.client.user_id, offset, limit)
        .await?;
    Ok(ApiResponse::success(documents))
}
