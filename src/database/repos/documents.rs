use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Document, DocumentKey, NewDocument};
use crate::database::repos::clients::ClientRepo;
use crate::database::repository::Repository;
use crate::types::DocumentStatus;

pub const TABLE: &str = "documents";

const DUPLICATE_DOCUMENT: &str = "A document for this category already exists";

/// Persistence used by the document workflow.
///
/// `insert` and `replace` must both enforce the one-document-per-key rule:
/// a concurrent writer that wins the race makes the loser fail with
/// `DatabaseError::Conflict`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_key(&self, key: &DocumentKey) -> Result<Vec<Document>, DatabaseError>;

    async fn insert(&self, document: NewDocument) -> Result<Document, DatabaseError>;

    /// Delete every row for the document's key and insert the new one
    /// atomically. Returns the new row and the rows it displaced.
    async fn replace(&self, document: NewDocument) -> Result<(Document, Vec<Document>), DatabaseError>;

    async fn find(&self, id: i64) -> Result<Option<Document>, DatabaseError>;

    async fn list_for_user(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<Document>, DatabaseError>;

    async fn list_all(
        &self,
        status: Option<DocumentStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Document>, DatabaseError>;

    async fn set_review(
        &self,
        id: i64,
        status: DocumentStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<Document>, DatabaseError>;

    /// Returns the removed row, if there was one
    async fn delete(&self, id: i64) -> Result<Option<Document>, DatabaseError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn find_by_key(&self, key: &DocumentKey) -> Result<Vec<Document>, DatabaseError> {
        (**self).find_by_key(key).await
    }

    async fn insert(&self, document: NewDocument) -> Result<Document, DatabaseError> {
        (**self).insert(document).await
    }

    async fn replace(&self, document: NewDocument) -> Result<(Document, Vec<Document>), DatabaseError> {
        (**self).replace(document).await
    }

    async fn find(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
        (**self).find(id).await
    }

    async fn list_for_user(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<Document>, DatabaseError> {
        (**self).list_for_user(user_id, offset, limit).await
    }

    async fn list_all(
        &self,
        status: Option<DocumentStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Document>, DatabaseError> {
        (**self).list_all(status, offset, limit).await
    }

    async fn set_review(
        &self,
        id: i64,
        status: DocumentStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<Document>, DatabaseError> {
        (**self).set_review(id, status, admin_notes).await
    }

    async fn delete(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
        (**self).delete(id).await
    }
}

/// Postgres-backed store; also keeps the owner's client counters in step
pub struct PgDocumentStore {
    repo: Repository<Document>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }
}

const INSERT_DOCUMENT: &str = "INSERT INTO documents
        (user_id, category, original_name, stored_name, mime_type, size_bytes, family_member_name)
     VALUES ($1, $2, $3, $4, $5, $6, $7)
     RETURNING *";

fn bind_new<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, Document, sqlx::postgres::PgArguments>,
    document: &'q NewDocument,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, Document, sqlx::postgres::PgArguments> {
    query
        .bind(document.user_id)
        .bind(&document.category)
        .bind(&document.original_name)
        .bind(&document.stored_name)
        .bind(&document.mime_type)
        .bind(document.size_bytes)
        .bind(document.family_member_name.as_deref())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_by_key(&self, key: &DocumentKey) -> Result<Vec<Document>, DatabaseError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents
             WHERE user_id = $1 AND category = $2
               AND COALESCE(family_member_name, '') = COALESCE($3, '')",
        )
        .bind(key.user_id)
        .bind(&key.category)
        .bind(key.family_member_name.as_deref())
        .fetch_all(self.pool())
        .await?;
        Ok(documents)
    }

    async fn insert(&self, document: NewDocument) -> Result<Document, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let inserted = bind_new(sqlx::query_as::<_, Document>(INSERT_DOCUMENT), &document)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::on_write(e, DUPLICATE_DOCUMENT))?;

        ClientRepo::refresh_document_counters(&mut *tx, document.user_id).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn replace(&self, document: NewDocument) -> Result<(Document, Vec<Document>), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query_as::<_, Document>(
            "DELETE FROM documents
             WHERE user_id = $1 AND category = $2
               AND COALESCE(family_member_name, '') = COALESCE($3, '')
             RETURNING *",
        )
        .bind(document.user_id)
        .bind(&document.category)
        .bind(document.family_member_name.as_deref())
        .fetch_all(&mut *tx)
        .await?;

        let inserted = bind_new(sqlx::query_as::<_, Document>(INSERT_DOCUMENT), &document)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DatabaseError::on_write(e, DUPLICATE_DOCUMENT))?;

        ClientRepo::refresh_document_counters(&mut *tx, document.user_id).await?;
        tx.commit().await?;
        Ok((inserted, removed))
    }

    async fn find(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
        self.repo.select_one(id).await
    }

    async fn list_for_user(&self, user_id: i64, offset: i64, limit: i64) -> Result<Vec<Document>, DatabaseError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             OFFSET $2 LIMIT $3",
        )
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(documents)
    }

    async fn list_all(
        &self,
        status: Option<DocumentStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Document>, DatabaseError> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at DESC, id DESC
             OFFSET $2 LIMIT $3",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(documents)
    }

    async fn set_review(
        &self,
        id: i64,
        status: DocumentStatus,
        admin_notes: Option<String>,
    ) -> Result<Option<Document>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let reviewed = sqlx::query_as::<_, Document>(
            "UPDATE documents SET status = $2, admin_notes = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(admin_notes)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(document) = &reviewed {
            ClientRepo::refresh_document_counters(&mut *tx, document.user_id).await?;
        }
        tx.commit().await?;
        Ok(reviewed)
    }

    async fn delete(&self, id: i64) -> Result<Option<Document>, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let removed = sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(document) = &removed {
            ClientRepo::refresh_document_counters(&mut *tx, document.user_id).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }
}
