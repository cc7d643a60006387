use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::ClientStatus;

/// Visa applicant profile, one per user account
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub destination_country: Option<String>,
    pub visa_type: Option<String>,
    pub application_type: String,
    pub family_members_count: i32,
    #[sqlx(try_from = "String")]
    pub status: ClientStatus,
    pub progress: i32,
    pub total_documents: i32,
    pub pending_documents: i32,
    pub notes: Option<String>,
    pub join_date: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client row joined with the owning account's email
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClientWithEmail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub client: Client,
    pub email: Option<String>,
}
