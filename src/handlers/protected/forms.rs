// handlers/protected/forms.rs - The caller's intake form

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::{IntakeForm, NewActivity, User};
use crate::database::repos::{FormFields, FormRepo};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, CurrentUser};
use crate::services::activity;

fn form_activity(user: &User, fields: &FormFields) -> NewActivity {
    let (activity_type, title, verb) = if fields.submits() {
        (activity::FORM_SUBMITTED, "Form submitted", "completed")
    } else {
        (activity::FORM_UPDATED, "Form updated", "updated")
    };

    NewActivity::new(activity_type, title)
        .description(format!("{} {} their intake form", user.email, verb))
        .about(user.id)
        .performed_by(user)
}

/// POST /api/v1/forms - Create the intake form or merge into the existing one
pub async fn save(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(fields): ApiJson<FormFields>,
) -> ApiResult<IntakeForm> {
    let form = FormRepo::new(state.pool.clone()).upsert(user.id, &fields).await?;
    activity::record(&state.pool, form_activity(&user, &fields)).await;
    Ok(ApiResponse::success(form))
}

/// GET /api/v1/forms/me
pub async fn show(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<IntakeForm> {
    let form = FormRepo::new(state.pool.clone())
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Intake form not found"))?;
    Ok(ApiResponse::success(form))
}

/// PUT /api/v1/forms/me - Update an existing form; 404 if none was created yet
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    ApiJson(fields): ApiJson<FormFields>,
) -> ApiResult<IntakeForm> {
    let form = FormRepo::new(state.pool.clone()).update(user.id, &fields).await?;
    activity::record(&state.pool, form_activity(&user, &fields)).await;
    Ok(ApiResponse::success(form))
}
