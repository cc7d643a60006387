use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{check_password_strength, hash_password, normalize_email, AuthError};
use crate::config::{BootstrapConfig, SecurityConfig};
use crate::database::models::User;
use crate::database::repos::UserRepo;
use crate::database::DatabaseError;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("ADMIN_EMAIL is set but ADMIN_PASSWORD is not")]
    MissingPassword,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Create the configured admin account if no account uses that email yet.
///
/// Returns the new account, or `None` when bootstrap is not configured or the
/// email is already registered. An existing account is never modified.
pub async fn ensure_admin(
    pool: &PgPool,
    bootstrap: &BootstrapConfig,
    security: &SecurityConfig,
) -> Result<Option<User>, BootstrapError> {
    let Some(raw_email) = bootstrap.admin_email.as_deref() else {
        return Ok(None);
    };
    let password = bootstrap
        .admin_password
        .as_deref()
        .ok_or(BootstrapError::MissingPassword)?;

    let email = normalize_email(raw_email)?;
    check_password_strength(password, security)?;

    let repo = UserRepo::new(pool.clone());
    if let Some(existing) = repo.find_by_email(&email).await? {
        if !existing.is_admin() {
            warn!(user_id = existing.id, "Bootstrap admin email belongs to a non-admin account");
        }
        return Ok(None);
    }

    let hashed = hash_password(password)?;
    let created = repo.create_if_absent(&email, &hashed, Role::Admin).await?;
    if let Some(user) = &created {
        info!(user_id = user.id, email = %user.email, "Bootstrap admin created");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn lazy_pool() -> PgPool {
        crate::database::DatabaseManager::connect_lazy(&AppConfig::development().database).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_bootstrap_does_nothing() {
        let config = AppConfig::development();
        let created = ensure_admin(&lazy_pool(), &BootstrapConfig::default(), &config.security)
            .await
            .unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn bad_bootstrap_settings_fail_before_any_query() {
        let config = AppConfig::development();

        let no_password = BootstrapConfig {
            admin_email: Some("admin@example.com".to_string()),
            admin_password: None,
        };
        assert!(matches!(
            ensure_admin(&lazy_pool(), &no_password, &config.security).await,
            Err(BootstrapError::MissingPassword)
        ));

        let bad_email = BootstrapConfig {
            admin_email: Some("admin".to_string()),
            admin_password: Some("admin-password".to_string()),
        };
        assert!(matches!(
            ensure_admin(&lazy_pool(), &bad_email, &config.security).await,
            Err(BootstrapError::Auth(AuthError::InvalidEmail))
        ));

        let weak = BootstrapConfig {
            admin_email: Some("admin@example.com".to_string()),
            admin_password: Some("123".to_string()),
        };
        assert!(matches!(
            ensure_admin(&lazy_pool(), &weak, &config.security).await,
            Err(BootstrapError::Auth(AuthError::WeakPassword(_)))
        ));
    }
}
