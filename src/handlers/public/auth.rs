// handlers/public/auth.rs - POST /api/v1/register, POST /api/v1/login

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::{check_password_strength, generate_jwt, hash_password, normalize_email, verify_password};
use crate::database::models::NewActivity;
use crate::database::repos::UserRepo;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::activity;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenOut {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

/// POST /api/v1/register - Create a customer account and return a token
///
/// Expected Input:
/// ```json
/// { "email": "ana@example.com", "password": "at-least-6" }
/// ```
///
/// Expected Output:
/// ```json
/// { "success": true, "data": { "access_token": "eyJ...", "token_type": "bearer" } }
/// ```
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> ApiResult<TokenOut> {
    let email = normalize_email(&payload.email)?;
    check_password_strength(&payload.password, &state.config.security)?;

    let hashed = hash_password(&payload.password)?;
    let user = UserRepo::new(state.pool.clone())
        .create(&email, &hashed, Role::Customer)
        .await?;

    tracing::info!(user_id = user.id, "Customer registered");
    activity::record(
        &state.pool,
        NewActivity::new(activity::USER_REGISTERED, "New customer registered")
            .description(format!("{} registered", user.email))
            .about(user.id)
            .performed_by(&user),
    )
    .await;

    let token = generate_jwt(&user.email, &state.config.security)?;
    Ok(ApiResponse::created(TokenOut::bearer(token)))
}

/// POST /api/v1/login - Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Credentials>,
) -> ApiResult<TokenOut> {
    let user = UserRepo::new(state.pool.clone())
        .find_by_email(payload.email.trim())
        .await?;

    // Same answer for unknown email and wrong password
    let user = match user {
        Some(user) if verify_password(&payload.password, &user.hashed_password) => user,
        _ => return Err(ApiError::unauthorized("Invalid credentials")),
    };

    if !user.is_active {
        return Err(ApiError::forbidden("Account is inactive"));
    }

    tracing::info!(user_id = user.id, "User logged in");
    let token = generate_jwt(&user.email, &state.config.security)?;
    Ok(ApiResponse::success(TokenOut::bearer(token)))
}
