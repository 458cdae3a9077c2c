use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use auth_cell::models::{AuthError, LoginRequest, LoginResponse};
use auth_cell::services::account::AccountService;
use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::jwt::issue_token_pair;

use crate::models::{
    AdminDoctorRequest, AdminDoctorView, Doctor, DoctorError, DoctorSelfUpdateRequest, Specialty,
    SpecialtyRequest, SpecialtyWithCount,
};
use crate::services::{DoctorService, SpecialtyService};

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let doctors = DoctorService::new(&config).list().await?;
    Ok(Json(doctors))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(config): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Doctor>, AppError> {
    let doctor = DoctorService::new(&config)
        .get(doctor_id)
        .await?
        .ok_or(DoctorError::DoctorNotFound)?;
    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn doctors_by_specialty(
    State(config): State<Arc<AppConfig>>,
    Path(specialty_id): Path<Uuid>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let doctors = DoctorService::new(&config).list_by_specialty(specialty_id).await?;
    Ok(Json(doctors))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Vec<Specialty>>, AppError> {
    let specialties = SpecialtyService::new(&config).list().await?;
    Ok(Json(specialties))
}

// ==============================================================================
// DOCTOR HANDLERS
// ==============================================================================

/// Doctor login. Unlike the client and admin logins, an inactive account is
/// a 403 and a missing profile a 404.
#[axum::debug_handler]
pub async fn doctor_login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let accounts = AccountService::new(&config);
    let account = accounts
        .authenticate(&request.email, &request.password, Role::Doctor)
        .await?;

    if !account.is_active {
        return Err(AuthError::AccountInactive.into());
    }

    let doctor = DoctorService::new(&config)
        .find_by_user_id(account.id)
        .await?
        .ok_or(DoctorError::NoDoctorProfile)?;

    let tokens = issue_token_pair(account.id, &account.email, account.user_role, &config)
        .map_err(AppError::Internal)?;
    accounts.record_login(account.id).await?;

    info!("Doctor {} logged in", doctor.id);

    let mut response = LoginResponse::new(&account, tokens);
    response.doctor_id = Some(doctor.id);
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;

    let (account, doctor) = DoctorService::new(&config).get_self(user.id).await?;
    Ok(Json(json!({
        "user": account,
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn update_me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<DoctorSelfUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Doctor)?;

    let (account, doctor) = DoctorService::new(&config).update_self(user.id, request).await?;
    Ok(Json(json!({
        "message": "Profile updated",
        "user": account,
        "doctor": doctor
    })))
}

// ==============================================================================
// ADMIN DOCTOR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_list_doctors(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AdminDoctorView>>, AppError> {
    user.require_role(Role::Admin)?;

    let doctors = DoctorService::new(&config).list_admin().await?;
    debug!("Returning {} doctors", doctors.len());
    Ok(Json(doctors))
}

#[axum::debug_handler]
pub async fn admin_create_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<AdminDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_role(Role::Admin)?;

    let doctor = DoctorService::new(&config).create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor created successfully",
            "doctor": doctor
        })),
    ))
}

#[axum::debug_handler]
pub async fn admin_get_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<AdminDoctorView>, AppError> {
    user.require_role(Role::Admin)?;

    let doctor = DoctorService::new(&config)
        .get_admin(doctor_id)
        .await?
        .ok_or(DoctorError::DoctorNotFound)?;
    Ok(Json(doctor))
}

#[axum::debug_handler]
pub async fn admin_replace_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<AdminDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    admin_update(&config, &user, doctor_id, request, true).await
}

#[axum::debug_handler]
pub async fn admin_patch_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<AdminDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    admin_update(&config, &user, doctor_id, request, false).await
}

async fn admin_update(
    config: &AppConfig,
    user: &User,
    doctor_id: Uuid,
    request: AdminDoctorRequest,
    replace: bool,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Admin)?;

    let doctor = DoctorService::new(config).update(doctor_id, request, replace).await?;
    Ok(Json(json!({
        "message": "Doctor updated successfully",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn admin_delete_doctor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Admin)?;

    DoctorService::new(&config).delete(doctor_id).await?;
    Ok(Json(json!({ "message": "Doctor deleted successfully" })))
}

#[axum::debug_handler]
pub async fn admin_toggle_doctor_status(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Admin)?;

    let is_active = DoctorService::new(&config).toggle_status(doctor_id).await?;
    let verb = if is_active { "activated" } else { "deactivated" };
    Ok(Json(json!({
        "message": format!("Doctor {} successfully", verb),
        "is_active": is_active
    })))
}

// ==============================================================================
// ADMIN SPECIALTY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_list_specialties(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<SpecialtyWithCount>>, AppError> {
    user.require_role(Role::Admin)?;

    let specialties = SpecialtyService::new(&config).list_with_counts().await?;
    Ok(Json(specialties))
}

#[axum::debug_handler]
pub async fn admin_create_specialty(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<SpecialtyRequest>,
) -> Result<(StatusCode, Json<SpecialtyWithCount>), AppError> {
    user.require_role(Role::Admin)?;

    let specialty = SpecialtyService::new(&config).create(&request).await?;
    Ok((StatusCode::CREATED, Json(specialty)))
}

#[axum::debug_handler]
pub async fn admin_replace_specialty(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(specialty_id): Path<Uuid>,
    Json(request): Json<SpecialtyRequest>,
) -> Result<Json<Specialty>, AppError> {
    user.require_role(Role::Admin)?;

    let specialty = SpecialtyService::new(&config).update(specialty_id, &request, true).await?;
    Ok(Json(specialty))
}

#[axum::debug_handler]
pub async fn admin_patch_specialty(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(specialty_id): Path<Uuid>,
    Json(request): Json<SpecialtyRequest>,
) -> Result<Json<Specialty>, AppError> {
    user.require_role(Role::Admin)?;

    let specialty = SpecialtyService::new(&config).update(specialty_id, &request, false).await?;
    Ok(Json(specialty))
}

#[axum::debug_handler]
pub async fn admin_delete_specialty(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(specialty_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Admin)?;

    SpecialtyService::new(&config).delete(specialty_id).await?;
    Ok(Json(json!({ "message": "Specialty deleted successfully" })))
}
