//! Counters behind the dashboards. Everything here is a pure function of
//! the rows and a `now`, with day and week boundaries taken in UTC.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use appointment_cell::models::{Appointment, AppointmentStatus};
use doctor_cell::models::Specialty;
use doctor_cell::services::specialty::count_by_specialty;
use shared_models::auth::Role;

use crate::models::{
    Activity, AdminStats, AppointmentFacts, DoctorFacts, DoctorStats, MonthlyCount,
    RecentAppointment, SpecialtyStat, UserFacts,
};

pub const HISTOGRAM_MONTHS: u32 = 6;
pub const ACTIVE_WINDOW_DAYS: i64 = 30;

/// Everything the admin counters read.
#[derive(Debug, Default)]
pub struct AdminSnapshot {
    pub doctors: Vec<DoctorFacts>,
    pub users: Vec<UserFacts>,
    pub appointments: Vec<AppointmentFacts>,
    pub specialties: Vec<Specialty>,
}

pub fn admin_stats(snapshot: &AdminSnapshot, now: DateTime<Utc>) -> AdminStats {
    let today = now.date_naive();
    let active_since = now - Duration::days(ACTIVE_WINDOW_DAYS);

    AdminStats {
        total_doctors: snapshot.doctors.len(),
        total_patients: snapshot.users.iter().filter(|u| u.user_role == Role::Client).count(),
        total_appointments: snapshot.appointments.len(),
        total_specialties: snapshot.specialties.len(),
        today_appointments: count_on(&snapshot.appointments, today),
        pending_appointments: count_status(&snapshot.appointments, AppointmentStatus::Pending),
        completed_appointments: count_status(&snapshot.appointments, AppointmentStatus::Completed),
        active_users: snapshot
            .users
            .iter()
            .filter(|u| u.last_login.is_some_and(|at| at >= active_since))
            .count(),
        monthly_appointments: monthly_histogram(
            snapshot.appointments.iter().map(|a| a.date_time),
            now,
            HISTOGRAM_MONTHS,
        ),
        specialty_stats: specialty_stats(&snapshot.specialties, &snapshot.doctors),
    }
}

/// Counters over one doctor's appointments.
pub fn doctor_stats(appointments: &[AppointmentFacts], now: DateTime<Utc>) -> DoctorStats {
    let today = now.date_naive();
    let (week_start, week_end) = week_range(today);

    let patients: HashSet<_> = appointments.iter().map(|a| a.client_id).collect();

    DoctorStats {
        total_patients: patients.len(),
        today_appointments: count_on(appointments, today),
        week_appointments: appointments
            .iter()
            .filter(|a| (week_start..=week_end).contains(&a.date_time.date_naive()))
            .count(),
        completed_appointments: count_status(appointments, AppointmentStatus::Completed),
    }
}

/// Monday and Sunday of the ISO week containing `day`.
pub fn week_range(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    (start, start + Duration::days(6))
}

/// Appointment counts for the last `months` calendar months, current month
/// included, oldest first.
pub fn monthly_histogram(
    dates: impl IntoIterator<Item = DateTime<Utc>>,
    now: DateTime<Utc>,
    months: u32,
) -> Vec<MonthlyCount> {
    let span = months as i32;
    let first = month_index(now.year(), now.month0()) - (span - 1);
    let mut counts = vec![0usize; months as usize];

    for date in dates {
        let offset = month_index(date.year(), date.month0()) - first;
        if (0..span).contains(&offset) {
            counts[offset as usize] += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(offset, count)| MonthlyCount {
            month: month_label(first + offset as i32),
            count,
        })
        .collect()
}

/// Doctor counts per specialty, keeping only specialties in use.
pub fn specialty_stats(specialties: &[Specialty], doctors: &[DoctorFacts]) -> Vec<SpecialtyStat> {
    let counts = count_by_specialty(doctors.iter().map(|d| d.specialty_id));
    specialties
        .iter()
        .filter_map(|s| {
            counts.get(&s.id).map(|&count| SpecialtyStat {
                specialty: s.name.clone(),
                count,
            })
        })
        .collect()
}

pub fn activity(appointment: &Appointment) -> Activity {
    let client = appointment
        .client
        .as_ref()
        .map(|c| c.full_name())
        .unwrap_or_else(|| "Unknown client".to_string());
    let doctor = appointment
        .doctor
        .as_ref()
        .map(|d| d.full_name())
        .unwrap_or_else(|| "Unknown".to_string());

    Activity {
        id: appointment.id,
        kind: "appointment_created",
        message: format!("New appointment: {} with Dr. {}", client, doctor),
        date: appointment.created_at,
        status: appointment.status,
    }
}

pub fn recent_appointment(appointment: &Appointment) -> RecentAppointment {
    RecentAppointment {
        id: appointment.id,
        client_name: appointment
            .client
            .as_ref()
            .map(|c| c.full_name())
            .unwrap_or_default(),
        date_time: appointment.date_time,
        status: appointment.status,
        created_at: appointment.created_at,
    }
}

fn count_on(appointments: &[AppointmentFacts], day: NaiveDate) -> usize {
    appointments.iter().filter(|a| a.date_time.date_naive() == day).count()
}

fn count_status(appointments: &[AppointmentFacts], status: AppointmentStatus) -> usize {
    appointments.iter().filter(|a| a.status == status).count()
}

fn month_index(year: i32, month0: u32) -> i32 {
    year * 12 + month0 as i32
}

fn month_label(index: i32) -> String {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %Y").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn facts(client_id: Uuid, date_time: DateTime<Utc>, status: AppointmentStatus) -> AppointmentFacts {
        AppointmentFacts { client_id, date_time, status }
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2025-03-13 is a Thursday
        let (start, end) = week_range(NaiveDate::from_ymd_opt(2025, 3, 13).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 16).unwrap());

        let (start, _) = week_range(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }

    #[test]
    fn histogram_spans_the_year_boundary() {
        let now = at(2025, 2, 15, 12);
        let dates = [
            at(2025, 2, 1, 9),
            at(2025, 1, 31, 9),
            at(2024, 9, 30, 9),
            at(2024, 9, 1, 9),
            at(2024, 8, 31, 9),
            at(2025, 3, 1, 9),
        ];

        let histogram = monthly_histogram(dates, now, 6);

        let labels: Vec<_> = histogram.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, ["Sep 2024", "Oct 2024", "Nov 2024", "Dec 2024", "Jan 2025", "Feb 2025"]);
        let counts: Vec<_> = histogram.iter().map(|m| m.count).collect();
        assert_eq!(counts, [2, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn doctor_counters() {
        let now = at(2025, 3, 13, 8);
        let ada = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let appointments = [
            facts(ada, at(2025, 3, 13, 15), AppointmentStatus::Pending),
            facts(ada, at(2025, 3, 16, 9), AppointmentStatus::Confirmed),
            facts(bob, at(2025, 3, 9, 9), AppointmentStatus::Completed),
            facts(bob, at(2025, 3, 17, 9), AppointmentStatus::Pending),
        ];

        let stats = doctor_stats(&appointments, now);

        assert_eq!(
            stats,
            DoctorStats {
                total_patients: 2,
                today_appointments: 1,
                week_appointments: 2,
                completed_appointments: 1,
            }
        );
    }

    #[test]
    fn admin_counters() {
        let now = at(2025, 3, 13, 8);
        let cardio = Specialty { id: Uuid::new_v4(), name: "Cardiology".into(), description: String::new() };
        let derm = Specialty { id: Uuid::new_v4(), name: "Dermatology".into(), description: String::new() };
        let snapshot = AdminSnapshot {
            doctors: vec![
                DoctorFacts { specialty_id: cardio.id },
                DoctorFacts { specialty_id: cardio.id },
            ],
            users: vec![
                UserFacts { user_role: Role::Client, last_login: Some(now - Duration::days(2)) },
                UserFacts { user_role: Role::Client, last_login: Some(now - Duration::days(45)) },
                UserFacts { user_role: Role::Admin, last_login: Some(now) },
                UserFacts { user_role: Role::Doctor, last_login: None },
            ],
            appointments: vec![
                facts(Uuid::new_v4(), at(2025, 3, 13, 23), AppointmentStatus::Pending),
                facts(Uuid::new_v4(), at(2025, 3, 14, 0), AppointmentStatus::Completed),
            ],
            specialties: vec![cardio, derm],
        };

        let stats = admin_stats(&snapshot, now);

        assert_eq!(stats.total_doctors, 2);
        assert_eq!(stats.total_patients, 2);
        assert_eq!(stats.total_appointments, 2);
        assert_eq!(stats.total_specialties, 2);
        assert_eq!(stats.today_appointments, 1);
        assert_eq!(stats.pending_appointments, 1);
        assert_eq!(stats.completed_appointments, 1);
        assert_eq!(stats.active_users, 2);
        assert_eq!(stats.monthly_appointments.last().unwrap().count, 2);
        assert_eq!(
            stats.specialty_stats,
            vec![SpecialtyStat { specialty: "Cardiology".into(), count: 2 }]
        );
    }
}
