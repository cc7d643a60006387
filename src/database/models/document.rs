use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::DocumentStatus;

/// An uploaded file and its review state.
///
/// `stored_name` is the generated on-disk name and never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    #[sqlx(try_from = "String")]
    pub status: DocumentStatus,
    pub admin_notes: Option<String>,
    pub family_member_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Row to insert after the file has been written to storage
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i64,
    pub category: String,
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub family_member_name: Option<String>,
}

impl NewDocument {
    pub fn key(&self) -> DocumentKey {
        DocumentKey {
            user_id: self.user_id,
            category: self.category.clone(),
            family_member_name: self.family_member_name.clone(),
        }
    }
}

/// The uniqueness key: one document per owner, category and family member.
/// `None` is the principal applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub user_id: i64,
    pub category: String,
    pub family_member_name: Option<String>,
}

impl DocumentKey {
    pub fn matches(&self, document: &Document) -> bool {
        document.user_id == self.user_id
            && document.category == self.category
            && document.family_member_name == self.family_member_name
    }
}
