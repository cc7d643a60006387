use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::database::manager::DatabaseError;
use crate::database::models::IntakeForm;
use crate::database::repository::Repository;
use crate::types::nullable;

pub const TABLE: &str = "intake_forms";

type Text = Option<Option<String>>;

/// Questionnaire payload, saved one step at a time. An absent field keeps
/// its stored value; an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormFields {
    #[serde(default, deserialize_with = "nullable")]
    pub apellidos: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub nombres: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub fecha_nacimiento: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub nacionalidad: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub pasaporte: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub nivel_educativo: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub institucion: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub ocupacion: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub compania: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub padre_nombre: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub madre_nombre: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub viajes: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub familiares_exterior: Text,
    #[serde(default, deserialize_with = "nullable")]
    pub family_members_data: Text,
    pub is_completed: Option<bool>,
}

impl FormFields {
    /// True when this save marks the form as submitted
    pub fn submits(&self) -> bool {
        self.is_completed == Some(true)
    }

    fn text_columns(&self) -> [(&'static str, &Text); 14] {
        [
            ("apellidos", &self.apellidos),
            ("nombres", &self.nombres),
            ("fecha_nacimiento", &self.fecha_nacimiento),
            ("nacionalidad", &self.nacionalidad),
            ("pasaporte", &self.pasaporte),
            ("nivel_educativo", &self.nivel_educativo),
            ("institucion", &self.institucion),
            ("ocupacion", &self.ocupacion),
            ("compania", &self.compania),
            ("padre_nombre", &self.padre_nombre),
            ("madre_nombre", &self.madre_nombre),
            ("viajes", &self.viajes),
            ("familiares_exterior", &self.familiares_exterior),
            ("family_members_data", &self.family_members_data),
        ]
    }
}

/// `col = $n, ...` for the fields present in the payload, then the
/// completion flags. `completed_at` is stamped only once.
fn push_assignments(query: &mut QueryBuilder<'_, Postgres>, fields: &FormFields) {
    for (column, value) in fields.text_columns() {
        if let Some(value) = value {
            query.push(column).push(" = ").push_bind(value.clone()).push(", ");
        }
    }
    query
        .push("is_completed = COALESCE(")
        .push_bind(fields.is_completed)
        .push(", intake_forms.is_completed), completed_at = CASE WHEN ")
        .push_bind(fields.is_completed)
        .push(" AND intake_forms.completed_at IS NULL THEN now() ELSE intake_forms.completed_at END, updated_at = now()");
}

fn upsert_query(user_id: i64, fields: &FormFields) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("INSERT INTO intake_forms (user_id");
    for (column, _) in fields.text_columns() {
        query.push(", ").push(column);
    }
    query.push(", is_completed, completed_at) VALUES (").push_bind(user_id);
    for (_, value) in fields.text_columns() {
        query.push(", ").push_bind(value.clone().flatten());
    }
    query
        .push(", COALESCE(")
        .push_bind(fields.is_completed)
        .push(", FALSE), CASE WHEN ")
        .push_bind(fields.is_completed)
        .push(" THEN now() END) ON CONFLICT (user_id) DO UPDATE SET ");
    push_assignments(&mut query, fields);
    query.push(" RETURNING *");
    query
}

fn update_query(user_id: i64, fields: &FormFields) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new("UPDATE intake_forms SET ");
    push_assignments(&mut query, fields);
    query.push(" WHERE user_id = ").push_bind(user_id).push(" RETURNING *");
    query
}

pub struct FormRepo {
    repo: Repository<IntakeForm>,
}

impl FormRepo {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: Repository::new(TABLE, pool),
        }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn get(&self, id: i64) -> Result<IntakeForm, DatabaseError> {
        self.repo.select_404(id).await
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<IntakeForm>, DatabaseError> {
        let form = sqlx::query_as::<_, IntakeForm>("SELECT * FROM intake_forms WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(form)
    }

    pub async fn list(
        &self,
        completed: Option<bool>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<IntakeForm>, DatabaseError> {
        if completed.is_none() {
            return self.repo.select_page(offset, limit).await;
        }

        let forms = sqlx::query_as::<_, IntakeForm>(
            "SELECT * FROM intake_forms WHERE is_completed = $1
             ORDER BY id DESC OFFSET $2 LIMIT $3",
        )
        .bind(completed)
        .bind(offset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(forms)
    }

    /// Create the caller's form or merge into the existing one
    pub async fn upsert(&self, user_id: i64, fields: &FormFields) -> Result<IntakeForm, DatabaseError> {
        let form = upsert_query(user_id, fields)
            .build_query_as::<IntakeForm>()
            .fetch_one(self.pool())
            .await?;
        Ok(form)
    }

    /// Merge into an existing form; `NotFound` if the user has none yet
    pub async fn update(&self, user_id: i64, fields: &FormFields) -> Result<IntakeForm, DatabaseError> {
        update_query(user_id, fields)
            .build_query_as::<IntakeForm>()
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Intake form not found, use POST to create one".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_true_submits() {
        assert!(!FormFields::default().submits());

        let fields: FormFields = serde_json::from_str(r#"{"nombres":"Ana","is_completed":true}"#).unwrap();
        assert!(fields.submits());

        let fields: FormFields = serde_json::from_str(r#"{"is_completed":false}"#).unwrap();
        assert!(!fields.submits());
    }

    #[test]
    fn null_clears_and_absent_keeps() {
        let fields: FormFields = serde_json::from_str(r#"{"nombres":null,"pasaporte":"X123"}"#).unwrap();
        assert_eq!(fields.nombres, Some(None));
        assert_eq!(fields.pasaporte, Some(Some("X123".to_string())));
        assert_eq!(fields.apellidos, None);

        let update = update_query(7, &fields);
        let sql = update.sql();
        assert!(sql.contains("nombres = $"), "{sql}");
        assert!(sql.contains("pasaporte = $"), "{sql}");
        assert!(!sql.contains("apellidos ="), "{sql}");

        let upsert = upsert_query(7, &fields);
        let sql = upsert.sql();
        assert!(sql.contains("(user_id, apellidos, nombres"), "{sql}");
        assert!(sql.contains("DO UPDATE SET nombres = $"), "{sql}");
        assert!(!sql.contains("apellidos ="), "{sql}");
    }
}
