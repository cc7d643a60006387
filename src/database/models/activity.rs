use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::User;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Activity {
    pub id: i64,
    /// The account the activity is about
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub extra_data: Option<String>,
    pub performed_by_id: Option<i64>,
    pub performed_by_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewActivity {
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub extra_data: Option<String>,
    pub user_id: Option<i64>,
    #[serde(skip)]
    pub performed_by_id: Option<i64>,
    #[serde(skip)]
    pub performed_by_email: Option<String>,
}

impl NewActivity {
    pub fn new(activity_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn about(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn performed_by(mut self, actor: &User) -> Self {
        self.performed_by_id = Some(actor.id);
        self.performed_by_email = Some(actor.email.clone());
        self
    }
}
