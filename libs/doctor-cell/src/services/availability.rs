use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{AvailabilityMap, DoctorError};

/// Minimum length of a slot string (`HH:MM` without a leading zero).
const MIN_SLOT_LEN: usize = 4;

/// Normalizes an availability payload to the date-keyed map.
///
/// Accepted shapes:
/// - `{"2025-03-01": ["09:00", "10:30"]}`
/// - `[{"date": "2025-03-01", "times": ["09:00"]}]`, with `slots` accepted
///   in place of `times`
///
/// The whole payload is rejected on the first bad date or slot.
pub fn normalize_availability(payload: &Value) -> Result<AvailabilityMap, DoctorError> {
    match payload {
        Value::Object(entries) => {
            let mut availability = AvailabilityMap::new();
            for (date, times) in entries {
                availability.insert(date.clone(), validate_day(date, times)?);
            }
            Ok(availability)
        }
        Value::Array(items) => {
            let mut availability = AvailabilityMap::new();
            for item in items {
                let (date, times) = list_entry(item)?;
                availability.insert(date.to_string(), validate_day(date, times)?);
            }
            Ok(availability)
        }
        _ => Err(DoctorError::InvalidAvailability(
            "Availability must be an object or a list of {date, times} entries".to_string(),
        )),
    }
}

fn list_entry(item: &Value) -> Result<(&str, &Value), DoctorError> {
    let malformed = || {
        DoctorError::InvalidAvailability(
            "Each entry needs a 'date' and a 'times' list".to_string(),
        )
    };

    let entry = item.as_object().ok_or_else(malformed)?;
    let date = entry
        .get("date")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or_else(malformed)?;

    static NO_TIMES: Value = Value::Null;
    let times = match (entry.get("times"), entry.get("slots")) {
        (Some(times), _) if !times.is_null() => times,
        (_, Some(slots)) if !slots.is_null() => slots,
        _ => &NO_TIMES,
    };

    Ok((date, times))
}

fn validate_day(date: &str, times: &Value) -> Result<Vec<String>, DoctorError> {
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(DoctorError::InvalidAvailability(format!(
            "Invalid date {}, expected YYYY-MM-DD",
            date
        )));
    }

    let bad_slots = || {
        DoctorError::InvalidAvailability(format!("Invalid time slots for {}, use HH:MM", date))
    };

    let slots = match times {
        Value::Null => return Ok(Vec::new()),
        Value::Array(slots) => slots,
        _ => return Err(bad_slots()),
    };

    slots
        .iter()
        .map(|slot| match slot.as_str() {
            Some(s) if s.chars().count() >= MIN_SLOT_LEN => Ok(s.to_string()),
            _ => Err(bad_slots()),
        })
        .collect()
}
