use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Multi-step visa questionnaire. Field names follow the Spanish form labels
/// the applicants fill in.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct IntakeForm {
    pub id: i64,
    pub user_id: i64,

    // Step 1: personal
    pub apellidos: Option<String>,
    pub nombres: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub nacionalidad: Option<String>,
    pub pasaporte: Option<String>,

    // Step 2: education
    pub nivel_educativo: Option<String>,
    pub institucion: Option<String>,

    // Step 3: employment
    pub ocupacion: Option<String>,
    pub compania: Option<String>,

    // Step 4: family
    pub padre_nombre: Option<String>,
    pub madre_nombre: Option<String>,

    // Step 5: travel history
    pub viajes: Option<String>,

    // Step 6: general
    pub familiares_exterior: Option<String>,
    pub family_members_data: Option<String>,

    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
