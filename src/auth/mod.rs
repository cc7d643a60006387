use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// Bearer token claims. `sub` is the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(email: impl Into<String>, expiry_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: email.into(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(expiry_minutes)).timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("JWT secret not configured")]
    NotConfigured,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

pub fn generate_jwt(email: &str, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::NotConfigured);
    }

    let claims = Claims::new(email, security.jwt_expiry_minutes);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key).map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry; returns the claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::NotConfigured);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AuthError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        Err(AuthError::MalformedHeader)
    } else {
        Ok(token)
    }
}

/// Lowercased, trimmed address; `local@domain.tld` shape only
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

pub fn check_password_strength(password: &str, security: &SecurityConfig) -> Result<(), AuthError> {
    if password.chars().count() < security.min_password_length {
        Err(AuthError::WeakPassword(security.min_password_length))
    } else {
        Ok(())
    }
}

/// Argon2id with a random salt, PHC string format
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password and for an unparseable stored hash
pub fn verify_password(password: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is unreadable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        AppConfig::development().security
    }

    #[test]
    fn token_round_trip_keeps_email() {
        let security = security();
        let token = generate_jwt("ana@example.com", &security).unwrap();
        let claims = validate_jwt(&token, &security).unwrap();
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.exp - claims.iat, 120 * 60);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let mut other = security();
        other.jwt_secret = "another-secret".to_string();
        let token = generate_jwt("ana@example.com", &other).unwrap();
        assert!(matches!(
            validate_jwt(&token, &security()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut security = security();
        security.jwt_expiry_minutes = -10;
        let token = generate_jwt("ana@example.com", &security).unwrap();
        assert!(validate_jwt(&token, &security).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let mut security = security();
        security.jwt_secret.clear();
        assert!(matches!(
            generate_jwt("ana@example.com", &security),
            Err(AuthError::NotConfigured)
        ));
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(bearer_token(Some("Basic xyz")), Err(AuthError::MalformedHeader)));
        assert!(matches!(bearer_token(Some("Bearer   ")), Err(AuthError::MalformedHeader)));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong-pass", &hash));
        assert!(!verify_password("s3cret-pass", "not-a-hash"));
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "ana", "@example.com", "ana@", "ana@example", "ana@@example.com", "a na@example.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn short_passwords_are_weak() {
        let security = security();
        assert!(check_password_strength("12345", &security).is_err());
        assert!(check_password_strength("123456", &security).is_ok());
    }
}
