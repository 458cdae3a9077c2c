use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::Appointment;
use appointment_cell::services::appointment::EMBED_SELECT;
use doctor_cell::models::Doctor;
use doctor_cell::services::{DoctorService, SpecialtyService};
use shared_config::AppConfig;
use shared_database::{eq, SupabaseClient};

use crate::models::{
    Activity, AdminStats, AppointmentFacts, DashboardError, DoctorFacts, DoctorStats,
    RecentAppointment, UserFacts,
};
use crate::services::aggregate::{self, AdminSnapshot};

const APPOINTMENTS: &str = "appointments";
const FACT_COLUMNS: &str = "select=client_id,date_time,status";
const RECENT_LIMIT: usize = 10;

pub struct DashboardService {
    supabase: SupabaseClient,
    doctors: DoctorService,
    specialties: SpecialtyService,
}

impl DashboardService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
            specialties: SpecialtyService::new(config),
        }
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, DashboardError> {
        let snapshot = AdminSnapshot {
            doctors: self.supabase.select::<DoctorFacts>("doctors", "select=specialty_id").await?,
            users: self.supabase.select::<UserFacts>("users", "select=user_role,last_login").await?,
            appointments: self.supabase.select::<AppointmentFacts>(APPOINTMENTS, FACT_COLUMNS).await?,
            specialties: self.specialties.list().await?,
        };

        debug!(
            "Admin stats over {} appointment(s), {} user(s)",
            snapshot.appointments.len(),
            snapshot.users.len()
        );
        Ok(aggregate::admin_stats(&snapshot, Utc::now()))
    }

    /// The most recently created appointments, newest first.
    pub async fn admin_activities(&self) -> Result<Vec<Activity>, DashboardError> {
        let query = format!("{}&order=created_at.desc&limit={}", EMBED_SELECT, RECENT_LIMIT);
        let recent: Vec<Appointment> = self.supabase.select(APPOINTMENTS, &query).await?;
        Ok(recent.iter().map(aggregate::activity).collect())
    }

    pub async fn doctor_stats(&self, user_id: Uuid) -> Result<DoctorStats, DashboardError> {
        let doctor = self.linked_doctor(user_id).await?;

        let query = format!("{}&doctor_id={}", FACT_COLUMNS, eq(doctor.id.to_string()));
        let appointments: Vec<AppointmentFacts> = self.supabase.select(APPOINTMENTS, &query).await?;

        Ok(aggregate::doctor_stats(&appointments, Utc::now()))
    }

    pub async fn doctor_recent(&self, user_id: Uuid) -> Result<Vec<RecentAppointment>, DashboardError> {
        let doctor = self.linked_doctor(user_id).await?;

        let query = format!(
            "select=*,client:client_id(id,first_name,last_name,email)&doctor_id={}&order=created_at.desc&limit={}",
            eq(doctor.id.to_string()),
            RECENT_LIMIT
        );
        let recent: Vec<Appointment> = self.supabase.select(APPOINTMENTS, &query).await?;
        Ok(recent.iter().map(aggregate::recent_appointment).collect())
    }

    async fn linked_doctor(&self, user_id: Uuid) -> Result<Doctor, DashboardError> {
        self.doctors
            .find_by_user_id(user_id)
            .await?
            .ok_or(DashboardError::NoDoctorProfile)
    }
}
