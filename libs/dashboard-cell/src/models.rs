use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::AppointmentStatus;
use doctor_cell::models::DoctorError;
use shared_models::auth::Role;
use shared_models::error::AppError;

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCount {
    /// `Jan 2025` style label.
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecialtyStat {
    pub specialty: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_doctors: usize,
    pub total_patients: usize,
    pub total_appointments: usize,
    pub total_specialties: usize,
    pub today_appointments: usize,
    pub pending_appointments: usize,
    pub completed_appointments: usize,
    pub active_users: usize,
    pub monthly_appointments: Vec<MonthlyCount>,
    pub specialty_stats: Vec<SpecialtyStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorStats {
    pub total_patients: usize,
    pub today_appointments: usize,
    pub week_appointments: usize,
    pub completed_appointments: usize,
}

/// One line of the admin activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    pub date: DateTime<Utc>,
    pub status: AppointmentStatus,
}

/// One line of a doctor's recent appointments.
#[derive(Debug, Clone, Serialize)]
pub struct RecentAppointment {
    pub id: Uuid,
    pub client_name: String,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

// ==============================================================================
// QUERY ROWS
// ==============================================================================

/// The appointment columns the counters look at.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentFacts {
    pub client_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserFacts {
    pub user_role: Role,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorFacts {
    pub specialty_id: Uuid,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Doctor not found")]
    NoDoctorProfile,

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::NoDoctorProfile => AppError::NotFound(err.to_string()),
            DashboardError::Doctor(e) => e.into(),
            DashboardError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
