use sqlx::{self, postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DatabaseError;

/// Generic by-id access shared by the table-specific repositories.
///
/// `table_name` is always one of the crate's own table constants, never
/// caller input, so it is interpolated directly.
pub struct Repository<T> {
    table_name: &'static str,
    pool: PgPool,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str, pool: PgPool) -> Self {
        Self {
            table_name,
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn select_one(&self, id: i64) -> Result<Option<T>, DatabaseError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", self.table_name);
        let row = sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn select_404(&self, id: i64) -> Result<T, DatabaseError> {
        self.select_one(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} record {} not found", self.table_name, id)))
    }

    /// Page through the table newest-first
    pub async fn select_page(&self, offset: i64, limit: i64) -> Result<Vec<T>, DatabaseError> {
        let sql = format!(
            "SELECT * FROM {} ORDER BY id DESC OFFSET $1 LIMIT $2",
            self.table_name
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Returns false when no row had that id
    pub async fn delete(&self, id: i64) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.table_name);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}
