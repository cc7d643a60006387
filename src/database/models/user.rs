use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Headline counts for the admin dashboard
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserStats {
    pub total_users: i64,
    pub total_admins: i64,
    pub total_customers: i64,
    pub active_users: i64,
}
