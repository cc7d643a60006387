use sqlx::{PgPool, Postgres, Transaction};

use crate::database::manager::DatabaseError;
use crate::database::models::{Document, User, UserStats};
use crate::database::repository::Repository;
use crate::types::Role;

pub const TABLE: &str = "users";

const EMAIL_TAKEN: &str = "Email already registered";

/// Fields an admin may change on an account; `None` leaves the column as is
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UserChanges {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub struct UserRepo {
    repo: Repository<User>,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn find(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        self.repo.select_one(id).await
    }

    pub async fn get(&self, id: i64) -> Result<User, DatabaseError> {
        self.find(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn create(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, hashed_password, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(self.pool())
        .await
        .map_err(|e| DatabaseError::on_write(e, EMAIL_TAKEN))
    }

    /// Insert unless the email is taken; `None` leaves the existing account untouched
    pub async fn create_if_absent(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, hashed_password, role) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING *",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn list(
        &self,
        role: Option<Role>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users
             WHERE ($1::text IS NULL OR role = $1)
             ORDER BY id
             OFFSET $2 LIMIT $3",
        )
        .bind(role.map(|r| r.as_str()))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    pub async fn stats(&self) -> Result<UserStats, DatabaseError> {
        let stats = sqlx::query_as::<_, UserStats>(
            "SELECT COUNT(*) AS total_users,
                    COUNT(*) FILTER (WHERE role = 'admin') AS total_admins,
                    COUNT(*) FILTER (WHERE role = 'customer') AS total_customers,
                    COUNT(*) FILTER (WHERE is_active) AS active_users
             FROM users",
        )
        .fetch_one(self.pool())
        .await?;
        Ok(stats)
    }

    pub async fn update(&self, id: i64, changes: &UserChanges) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users
             SET email = COALESCE($2, email),
                 role = COALESCE($3, role),
                 is_active = COALESCE($4, is_active)
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.is_active)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DatabaseError::on_write(e, "Email already in use"))?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    pub async fn set_password(&self, id: i64, hashed_password: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("UPDATE users SET hashed_password = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(hashed_password)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    pub async fn toggle_active(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
    }

    /// Delete the account and its documents in one transaction. The removed
    /// document rows are returned so their stored files can be discarded.
    pub async fn delete(&self, id: i64) -> Result<Vec<Document>, DatabaseError> {
        let mut tx = self.pool().begin().await?;
        let documents = Self::delete_account(&mut tx, id).await?;
        tx.commit().await?;
        Ok(documents)
    }

    pub(crate) async fn delete_account(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<Vec<Document>, DatabaseError> {
        // The row lock conflicts with the key-share lock a document insert
        // takes on its owner, so no upload can slip in before the delete.
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

        let documents =
            sqlx::query_as::<_, Document>("DELETE FROM documents WHERE user_id = $1 RETURNING *")
                .bind(id)
                .fetch_all(&mut **tx)
                .await?;

        // clients and intake_forms cascade
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        Ok(documents)
    }
}
