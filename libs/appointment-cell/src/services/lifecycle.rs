use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AdminAppointmentUpdate, AppointmentError, AppointmentStatus, ClientAppointmentUpdate,
    CreateAppointmentRequest,
};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub fn parse_date_time(raw: &str) -> Result<DateTime<Utc>, AppointmentError> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or(AppointmentError::InvalidDateTime)
}

/// Appointments must start strictly after `now`.
pub fn ensure_future(date_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppointmentError> {
    if date_time <= now {
        return Err(AppointmentError::NotInFuture);
    }
    Ok(())
}

fn required_date_time(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppointmentError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppointmentError::required("date_time"))?;
    let date_time = parse_date_time(raw)?;
    ensure_future(date_time, now)?;
    Ok(date_time)
}

/// A validated booking: which doctor, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
}

pub fn validate_booking(
    request: &CreateAppointmentRequest,
    now: DateTime<Utc>,
) -> Result<Booking, AppointmentError> {
    let doctor = request
        .doctor
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppointmentError::required("doctor"))?;
    let doctor_id = Uuid::parse_str(doctor).map_err(|_| AppointmentError::UnknownDoctor)?;
    let date_time = required_date_time(request.date_time.as_deref(), now)?;

    Ok(Booking { doctor_id, date_time })
}

/// Column changes for a client edit. A supplied status never makes it
/// through.
pub fn client_changes(
    request: &ClientAppointmentUpdate,
    now: DateTime<Utc>,
) -> Result<Map<String, Value>, AppointmentError> {
    if request.status.is_some() {
        debug!("Dropping status from client appointment update");
    }

    let mut changes = Map::new();
    if let Some(raw) = request.date_time.as_deref() {
        let date_time = required_date_time(Some(raw), now)?;
        changes.insert("date_time".to_string(), json!(date_time));
        changes.insert("updated_at".to_string(), json!(now));
    }
    Ok(changes)
}

/// Column changes for an admin edit: the status and nothing else.
pub fn admin_changes(
    request: &AdminAppointmentUpdate,
    now: DateTime<Utc>,
) -> Result<Map<String, Value>, AppointmentError> {
    let status: AppointmentStatus = request
        .status
        .as_deref()
        .ok_or_else(|| AppointmentError::required("status"))?
        .parse()?;

    let mut changes = Map::new();
    changes.insert("status".to_string(), json!(status));
    changes.insert("updated_at".to_string(), json!(now));
    Ok(changes)
}
