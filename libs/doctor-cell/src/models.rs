use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use auth_cell::models::AuthError;
use shared_models::error::AppError;

/// Date (`YYYY-MM-DD`) to the bookable time strings of that day.
pub type AvailabilityMap = BTreeMap<String, Vec<String>>;

// ==============================================================================
// PERSISTED ROWS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    pub specialty_id: Uuid,
    #[serde(default)]
    pub availability: AvailabilityMap,
    #[serde(default)]
    pub bio: String,
    pub photo: Option<String>,
    pub consultation_fee: Option<f64>,
    /// Embedded when the query asks for `specialty:specialty_id(*)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<Specialty>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// The slice of the linked `users` row shown on admin screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub is_active: bool,
    pub date_joined: Option<DateTime<Utc>>,
}

/// A doctor row with its specialty and linked account embedded.
#[derive(Debug, Clone, Deserialize)]
pub struct DoctorRecord {
    #[serde(flatten)]
    pub doctor: Doctor,
    #[serde(default)]
    pub account: Option<LinkedAccount>,
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AdminDoctorView {
    #[serde(flatten)]
    pub doctor: Doctor,
    pub specialization: String,
    pub is_active: bool,
    pub date_joined: Option<DateTime<Utc>>,
}

impl From<DoctorRecord> for AdminDoctorView {
    fn from(record: DoctorRecord) -> Self {
        let specialization = record
            .doctor
            .specialty
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| "Unspecified".to_string());

        Self {
            specialization,
            // A doctor without an account cannot be deactivated.
            is_active: record.account.as_ref().map_or(true, |a| a.is_active),
            date_joined: record.account.and_then(|a| a.date_joined),
            doctor: record.doctor,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialtyWithCount {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub doctors_count: usize,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Body of the admin create/replace/patch doctor endpoints. The specialty
/// may be given by id or by name (`specialization`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminDoctorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub specialty_id: Option<Uuid>,
    pub specialization: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub bio: Option<String>,
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "explicit")]
    pub consultation_fee: Option<Value>,
    pub availability: Option<Value>,
}

/// Body of `PATCH /doctors/me/`. `adresse` is the account address, `address`
/// the practice address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSelfUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub adresse: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "explicit")]
    pub consultation_fee: Option<Value>,
    pub availability: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialtyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it can clear a field,
/// while an absent key stays `None`.
fn explicit<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("No doctor profile associated with this user")]
    NoDoctorProfile,

    #[error("Specialty not found")]
    SpecialtyNotFound,

    #[error("Specialty not found")]
    UnknownSpecialty,

    #[error("This specialty already exists")]
    SpecialtyNameTaken,

    #[error("Cannot delete this specialty: {0} doctor(s) still use it")]
    SpecialtyInUse(usize),

    #[error("Linked user account not found")]
    LinkedAccountMissing,

    #[error("{0}")]
    InvalidAvailability(String),

    #[error("{0}")]
    InvalidFee(String),

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Account(#[from] AuthError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl DoctorError {
    pub fn required(field: &str) -> Self {
        DoctorError::Validation {
            field: field.to_string(),
            message: "This field is required".to_string(),
        }
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::DoctorNotFound
            | DoctorError::NoDoctorProfile
            | DoctorError::SpecialtyNotFound
            | DoctorError::LinkedAccountMissing => AppError::NotFound(err.to_string()),
            DoctorError::UnknownSpecialty => AppError::field("specialty", err.to_string()),
            DoctorError::SpecialtyNameTaken => AppError::field("name", err.to_string()),
            DoctorError::SpecialtyInUse(_) => AppError::BadRequest(err.to_string()),
            DoctorError::InvalidAvailability(msg) => AppError::field("availability", msg),
            DoctorError::InvalidFee(msg) => AppError::field("consultation_fee", msg),
            DoctorError::Validation { field, message } => AppError::field(&field, message),
            DoctorError::Account(e) => e.into(),
            DoctorError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
