use serde::Deserialize;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::database::manager::DatabaseError;
use crate::database::models::{Client, ClientWithEmail, Document, User};
use crate::database::repos::UserRepo;
use crate::database::repository::Repository;
use crate::types::{nullable, ClientStatus, Role};

pub const TABLE: &str = "clients";

const SELECT_WITH_EMAIL: &str = "SELECT c.*, u.email FROM clients c LEFT JOIN users u ON u.id = c.user_id";

/// Profile fields accepted from customers and admins. Absent fields keep
/// their stored value; an explicit `null` clears the nullable text fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    #[serde(default, deserialize_with = "nullable")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub destination_country: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub visa_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    pub application_type: Option<String>,
    pub family_members_count: Option<i32>,
    pub status: Option<ClientStatus>,
    pub progress: Option<i32>,
}

impl ProfileChanges {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(progress) = self.progress {
            if !(0..=100).contains(&progress) {
                return Err("progress must be between 0 and 100".to_string());
            }
        }
        if let Some(count) = self.family_members_count {
            if count < 1 {
                return Err("family_members_count must be at least 1".to_string());
            }
        }
        Ok(())
    }

    fn text_columns(&self) -> [(&'static str, &Option<Option<String>>); 6] {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("phone", &self.phone),
            ("destination_country", &self.destination_country),
            ("visa_type", &self.visa_type),
            ("notes", &self.notes),
        ]
    }
}

/// INSERT column list and VALUES for a new profile; unset NOT NULL columns
/// fall back to their defaults
fn push_profile_insert(query: &mut QueryBuilder<'_, Postgres>, user_id: i64, changes: &ProfileChanges) {
    query.push("INSERT INTO clients (user_id");
    for (column, _) in changes.text_columns() {
        query.push(", ").push(column);
    }
    query
        .push(", application_type, family_members_count, status, progress) VALUES (")
        .push_bind(user_id);
    for (_, value) in changes.text_columns() {
        query.push(", ").push_bind(value.clone().flatten());
    }
    query
        .push(", COALESCE(")
        .push_bind(changes.application_type.clone())
        .push(", 'individual'), COALESCE(")
        .push_bind(changes.family_members_count)
        .push(", 1), COALESCE(")
        .push_bind(changes.status.map(|s| s.as_str()))
        .push(", 'pending'), COALESCE(")
        .push_bind(changes.progress)
        .push(", 0))");
}

/// `col = $n, ` for every field present in the payload
fn push_profile_assignments(query: &mut QueryBuilder<'_, Postgres>, changes: &ProfileChanges) {
    for (column, value) in changes.text_columns() {
        if let Some(value) = value {
            query.push(column).push(" = ").push_bind(value.clone()).push(", ");
        }
    }
    if let Some(application_type) = &changes.application_type {
        query.push("application_type = ").push_bind(application_type.clone()).push(", ");
    }
    if let Some(count) = changes.family_members_count {
        query.push("family_members_count = ").push_bind(count).push(", ");
    }
    if let Some(status) = changes.status {
        query.push("status = ").push_bind(status.as_str()).push(", ");
    }
    if let Some(progress) = changes.progress {
        query.push("progress = ").push_bind(progress).push(", ");
    }
}

fn upsert_query(user_id: i64, changes: &ProfileChanges) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("");
    push_profile_insert(&mut query, user_id, changes);
    query.push(" ON CONFLICT (user_id) DO UPDATE SET ");
    push_profile_assignments(&mut query, changes);
    query.push("last_activity = now(), updated_at = now() RETURNING *");
    query
}

fn update_query(id: i64, changes: &ProfileChanges) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE clients SET ");
    push_profile_assignments(&mut query, changes);
    query.push("updated_at = now() WHERE id = ").push_bind(id).push(" RETURNING *");
    query
}

pub struct ClientRepo {
    repo: Repository<Client>,
}

impl ClientRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn find(&self, id: i64) -> Result<Option<ClientWithEmail>, DatabaseError> {
        let sql = format!("{} WHERE c.id = $1", SELECT_WITH_EMAIL);
        let client = sqlx::query_as::<_, ClientWithEmail>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(client)
    }

    pub async fn get(&self, id: i64) -> Result<ClientWithEmail, DatabaseError> {
        self.find(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Client not found".to_string()))
    }

    pub async fn list(
        &self,
        status: Option<ClientStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ClientWithEmail>, DatabaseError> {
        let sql = format!(
            "{} WHERE ($1::text IS NULL OR c.status = $1) ORDER BY c.id DESC OFFSET $2 LIMIT $3",
            SELECT_WITH_EMAIL
        );
        let clients = sqlx::query_as::<_, ClientWithEmail>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(offset)
            .bind(limit)
            .fetch_all(self.pool())
            .await?;
        Ok(clients)
    }

    /// Fetch the caller's profile, creating an empty one on first access
    pub async fn get_or_create(&self, user_id: i64) -> Result<Client, DatabaseError> {
        let inserted = sqlx::query("INSERT INTO clients (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(self.pool())
            .await?
            .rows_affected();

        // Documents may predate the profile
        if inserted > 0 {
            Self::refresh_document_counters(self.pool(), user_id).await?;
        }

        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;
        Ok(client)
    }

    /// Insert or update the profile keyed by `user_id`
    pub async fn upsert(&self, user_id: i64, changes: &ProfileChanges) -> Result<Client, DatabaseError> {
        let client = upsert_query(user_id, changes)
            .build_query_as::<Client>()
            .fetch_one(self.pool())
            .await?;
        Ok(client)
    }

    /// Admin edit by client id
    pub async fn update(&self, id: i64, changes: &ProfileChanges) -> Result<Client, DatabaseError> {
        update_query(id, changes)
            .build_query_as::<Client>()
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Client not found".to_string()))
    }

    /// Create a customer account and its profile in one transaction
    pub async fn create_with_account(
        &self,
        email: &str,
        hashed_password: &str,
        changes: &ProfileChanges,
    ) -> Result<(User, ClientWithEmail), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, hashed_password, role) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(email)
        .bind(hashed_password)
        .bind(Role::Customer.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::on_write(e, "Email already registered"))?;

        let mut insert = QueryBuilder::new("");
        push_profile_insert(&mut insert, user.id, changes);
        insert.push(" RETURNING *");
        let client = insert.build_query_as::<Client>().fetch_one(&mut *tx).await?;

        tx.commit().await?;

        let email = Some(user.email.clone());
        Ok((user, ClientWithEmail { client, email }))
    }

    /// Remove the profile together with its owning account and documents,
    /// returning the deleted document rows
    pub async fn delete_with_account(&self, id: i64) -> Result<Vec<Document>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let user_id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Client not found".to_string()))?;

        let documents = UserRepo::delete_account(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(documents)
    }

    /// Recompute the document counters for `user_id` from the documents table
    pub async fn refresh_document_counters<'e, E>(executor: E, user_id: i64) -> Result<(), DatabaseError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            "UPDATE clients SET
                 total_documents = (SELECT COUNT(*) FROM documents WHERE user_id = $1),
                 pending_documents = (SELECT COUNT(*) FROM documents
                                      WHERE user_id = $1 AND status = 'pending'),
                 last_activity = now(),
                 updated_at = now()
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
