use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension,
};

use crate::app::AppState;
use crate::auth::{bearer_token, validate_jwt};
use crate::database::models::User;
use crate::database::repos::UserRepo;
use crate::error::ApiError;

/// Account behind the bearer token, injected by `jwt_auth_middleware`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

/// Validates the bearer token, loads the account it names and injects it
/// as a `CurrentUser` extension
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;
        validate_jwt(token, &state.config.security)?
    };

    let user = UserRepo::new(state.pool.clone())
        .find_by_email(&claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!(email = %claims.sub, "Token subject no longer exists");
            ApiError::unauthorized("Could not validate credentials")
        })?;

    if !user.is_active {
        return Err(ApiError::forbidden("Account is inactive"));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Must run inside `jwt_auth_middleware`
pub async fn require_admin(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !user.is_admin() {
        tracing::warn!(user_id = user.id, path = %request.uri().path(), "Non-admin hit admin route");
        return Err(ApiError::forbidden("Admin privileges required"));
    }
    Ok(next.run(request).await)
}
