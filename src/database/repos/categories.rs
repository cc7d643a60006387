use serde::Deserialize;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::Category;
use crate::database::repository::Repository;

pub const TABLE: &str = "categories";

const NAME_TAKEN: &str = "A category with that name already exists";

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_required: Option<bool>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

pub struct CategoryRepo {
    repo: Repository<Category>,
}

impl CategoryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn get(&self, id: i64) -> Result<Category, DatabaseError> {
        self.repo.select_404(id).await
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Category>, DatabaseError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE (NOT $1 OR is_active) ORDER BY display_order, id",
        )
        .bind(active_only)
        .fetch_all(self.pool())
        .await?;
        Ok(categories)
    }

    pub async fn create(&self, category: &NewCategory) -> Result<Category, DatabaseError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description, is_required, display_order, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(category.name.trim())
        .bind(category.description.as_deref())
        .bind(category.is_required)
        .bind(category.display_order)
        .bind(category.is_active)
        .fetch_one(self.pool())
        .await
        .map_err(|e| DatabaseError::on_write(e, NAME_TAKEN))
    }

    pub async fn update(&self, id: i64, changes: &CategoryChanges) -> Result<Category, DatabaseError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 is_required = COALESCE($4, is_required),
                 display_order = COALESCE($5, display_order),
                 is_active = COALESCE($6, is_active),
                 updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(changes.name.as_deref().map(str::trim))
        .bind(changes.description.as_deref())
        .bind(changes.is_required)
        .bind(changes.display_order)
        .bind(changes.is_active)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| DatabaseError::on_write(e, NAME_TAKEN))?
        .ok_or_else(|| DatabaseError::NotFound("Category not found".to_string()))
    }

    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(DatabaseError::NotFound("Category not found".to_string()))
        }
    }
}
