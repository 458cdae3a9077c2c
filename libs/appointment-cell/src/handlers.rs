use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{
    AdminAppointmentUpdate, Appointment, ClientAppointmentUpdate, CreateAppointmentRequest,
};
use crate::services::AppointmentService;

// ==============================================================================
// CLIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    user.require_role(Role::Client)?;

    let appointment = AppointmentService::new(&config).create(&user, &request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// Lists what the caller may see; the scope follows the caller's role.
#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = AppointmentService::new(&config).list_visible(&user).await?;
    debug!("{} appointment(s) visible to {}", appointments.len(), user.id);
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ClientAppointmentUpdate>,
) -> Result<Json<Appointment>, AppError> {
    user.require_role(Role::Client)?;

    let appointment = AppointmentService::new(&config)
        .update_as_client(&user, appointment_id, &request)
        .await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    AppointmentService::new(&config).delete(&user, appointment_id).await?;
    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    user.require_role(Role::Doctor)?;

    let appointments = AppointmentService::new(&config)
        .list_for_linked_doctor(user.id)
        .await?;
    Ok(Json(appointments))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_list_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    user.require_role(Role::Admin)?;

    let appointments = AppointmentService::new(&config).list_all().await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn admin_update_appointment(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<AdminAppointmentUpdate>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Admin)?;

    let appointment = AppointmentService::new(&config)
        .update_as_admin(appointment_id, &request)
        .await?;
    Ok(Json(json!({
        "message": "Appointment status updated",
        "appointment": appointment
    })))
}
