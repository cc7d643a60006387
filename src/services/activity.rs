use sqlx::PgPool;
use tracing::error;

use crate::database::models::NewActivity;
use crate::database::repos::ActivityRepo;

pub const USER_REGISTERED: &str = "user_registered";
pub const CLIENT_UPDATED: &str = "client_updated";
pub const DOCUMENT_UPLOADED: &str = "document_uploaded";
pub const DOCUMENT_APPROVED: &str = "document_approved";
pub const DOCUMENT_REJECTED: &str = "document_rejected";
pub const FORM_SUBMITTED: &str = "form_submitted";
pub const FORM_UPDATED: &str = "form_updated";

/// Append an audit entry. Failures are logged and swallowed so the audit
/// trail never fails the request that produced it.
pub async fn record(pool: &PgPool, entry: NewActivity) {
    if let Err(e) = ActivityRepo::new(pool.clone()).insert(&entry).await {
        error!(
            activity_type = %entry.activity_type,
            user_id = ?entry.user_id,
            error = %e,
            "Failed to record activity"
        );
    }
}
