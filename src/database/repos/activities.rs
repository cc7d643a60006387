use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Activity, NewActivity};
use crate::database::repository::Repository;

pub const TABLE: &str = "activities";

/// Filter for the admin activity feed
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ActivityFilter {
    pub activity_type: Option<String>,
    /// Only entries from the last N days (default 30)
    pub days: Option<i32>,
}

const DEFAULT_WINDOW_DAYS: i32 = 30;
const MAX_WINDOW_DAYS: i32 = 3650;

impl ActivityFilter {
    /// Day window clamped to `0..=3650`
    pub fn window_days(&self) -> i32 {
        self.days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(0, MAX_WINDOW_DAYS)
    }
}

pub struct ActivityRepo {
    repo: Repository<Activity>,
}

impl ActivityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn insert(&self, entry: &NewActivity) -> Result<Activity, DatabaseError> {
        let activity = sqlx::query_as::<_, Activity>(
            "INSERT INTO activities
                 (user_id, activity_type, title, description, extra_data,
                  performed_by_id, performed_by_email)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(entry.user_id)
        .bind(&entry.activity_type)
        .bind(&entry.title)
        .bind(entry.description.as_deref())
        .bind(entry.extra_data.as_deref())
        .bind(entry.performed_by_id)
        .bind(entry.performed_by_email.as_deref())
        .fetch_one(self.pool())
        .await?;
        Ok(activity)
    }

    pub async fn list(
        &self,
        filter: &ActivityFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, DatabaseError> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities
             WHERE ($1::text IS NULL OR activity_type = $1)
               AND created_at >= now() - make_interval(days => $2)
             ORDER BY created_at DESC, id DESC
             OFFSET $3 LIMIT $4",
        )
        .bind(filter.activity_type.as_deref())
        .bind(filter.window_days())
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(activities)
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<Activity>, DatabaseError> {
        self.repo.select_page(0, limit).await
    }

    pub async fn types(&self) -> Result<Vec<String>, DatabaseError> {
        let types: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT activity_type FROM activities ORDER BY activity_type")
                .fetch_all(self.pool())
                .await?;
        Ok(types.into_iter().map(|(t,)| t).collect())
    }
}
