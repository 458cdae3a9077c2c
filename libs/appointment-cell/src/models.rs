use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::models::{Doctor, DoctorError};
use shared_models::error::AppError;

// ==============================================================================
// STATUS
// ==============================================================================

/// Appointment status. Admins may move between any of the three; new
/// appointments always start out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(AppointmentError::UnknownStatus(s.to_string())),
        }
    }
}

// ==============================================================================
// PERSISTED ROWS
// ==============================================================================

/// The client side of an appointment as embedded from `users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
}

impl ClientSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Booking form. Both fields arrive as raw strings so that a malformed id
/// or date is reported as a field error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default, alias = "doctor_id")]
    pub doctor: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
}

/// Client edit. Only `date_time` is applied; `status` is accepted and dropped.
#[derive(Debug, Default, Deserialize)]
pub struct ClientAppointmentUpdate {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
}

/// Admin edit. Only `status` is applied; anything else in the body is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct AdminAppointmentUpdate {
    #[serde(default)]
    pub status: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("You can only manage your own appointments")]
    NotOwner,

    #[error("Doctor not found")]
    UnknownDoctor,

    #[error("Appointment date and time must be in the future.")]
    NotInFuture,

    #[error("Enter a valid date/time.")]
    InvalidDateTime,

    #[error("\"{0}\" is not a valid status. Use pending, confirmed or completed.")]
    UnknownStatus(String),

    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppointmentError {
    pub fn required(field: &'static str) -> Self {
        AppointmentError::Validation {
            field,
            message: "This field is required.".to_string(),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::NotOwner => AppError::Forbidden(err.to_string()),
            AppointmentError::UnknownDoctor => AppError::field("doctor", err.to_string()),
            AppointmentError::NotInFuture | AppointmentError::InvalidDateTime => {
                AppError::field("date_time", err.to_string())
            }
            AppointmentError::UnknownStatus(_) => AppError::field("status", err.to_string()),
            AppointmentError::Validation { field, message } => AppError::field(field, message),
            AppointmentError::Doctor(e) => e.into(),
            AppointmentError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
