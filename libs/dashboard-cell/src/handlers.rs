use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{Activity, AdminStats, DoctorStats, RecentAppointment, Results};
use crate::services::DashboardService;

// ==============================================================================
// ADMIN DASHBOARD
// ==============================================================================

#[axum::debug_handler]
pub async fn admin_stats(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<AdminStats>, AppError> {
    user.require_role(Role::Admin)?;

    let stats = DashboardService::new(&config).admin_stats().await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn admin_activities(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Results<Activity>>, AppError> {
    user.require_role(Role::Admin)?;

    let results = DashboardService::new(&config).admin_activities().await?;
    Ok(Json(Results { results }))
}

// ==============================================================================
// DOCTOR DASHBOARD
// ==============================================================================

#[axum::debug_handler]
pub async fn doctor_stats(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<DoctorStats>, AppError> {
    user.require_role(Role::Doctor)?;

    let stats = DashboardService::new(&config).doctor_stats(user.id).await?;
    Ok(Json(stats))
}

#[axum::debug_handler]
pub async fn doctor_recent_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Results<RecentAppointment>>, AppError> {
    user.require_role(Role::Doctor)?;

    let results = DashboardService::new(&config).doctor_recent(user.id).await?;
    Ok(Json(Results { results }))
}
