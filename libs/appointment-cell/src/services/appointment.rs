use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::{eq, SupabaseClient};
use shared_models::auth::{Role, User};

use crate::models::{
    AdminAppointmentUpdate, Appointment, AppointmentError, AppointmentStatus,
    ClientAppointmentUpdate, CreateAppointmentRequest,
};
use crate::services::lifecycle;

const APPOINTMENTS: &str = "appointments";

/// Appointment row with the client and the doctor (and its specialty)
/// embedded.
pub const EMBED_SELECT: &str = "select=*,client:client_id(id,first_name,last_name,email),doctor:doctor_id(*,specialty:specialty_id(id,name,description))";

pub struct AppointmentService {
    supabase: SupabaseClient,
    doctors: DoctorService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            doctors: DoctorService::new(config),
        }
    }

    /// Books a pending appointment for `client`.
    pub async fn create(
        &self,
        client: &User,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let booking = lifecycle::validate_booking(request, Utc::now())?;

        let doctor = self
            .doctors
            .get(booking.doctor_id)
            .await?
            .ok_or(AppointmentError::UnknownDoctor)?;

        let mut appointment: Appointment = self.supabase.insert(APPOINTMENTS, json!({
            "client_id": client.id,
            "doctor_id": doctor.id,
            "date_time": booking.date_time,
            "status": AppointmentStatus::Pending
        })).await?;

        info!(
            "Client {} booked appointment {} with doctor {} at {}",
            client.id, appointment.id, doctor.id, appointment.date_time
        );

        appointment.doctor = Some(doctor);
        Ok(appointment)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let query = format!("id={}&limit=1", eq(id.to_string()));
        Ok(self.supabase.select_one(APPOINTMENTS, &query).await?)
    }

    pub async fn list_for_client(&self, client_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!(
            "{}&client_id={}&order=date_time.asc",
            EMBED_SELECT,
            eq(client_id.to_string())
        );
        Ok(self.supabase.select(APPOINTMENTS, &query).await?)
    }

    pub async fn list_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!(
            "{}&doctor_id={}&order=date_time.asc",
            EMBED_SELECT,
            eq(doctor_id.to_string())
        );
        Ok(self.supabase.select(APPOINTMENTS, &query).await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!("{}&order=date_time.desc", EMBED_SELECT);
        Ok(self.supabase.select(APPOINTMENTS, &query).await?)
    }

    /// Appointments the caller may see: their own as a client, their
    /// profile's as a doctor, everything as an admin.
    pub async fn list_visible(&self, user: &User) -> Result<Vec<Appointment>, AppointmentError> {
        match user.role {
            Role::Client => self.list_for_client(user.id).await,
            Role::Doctor => self.list_for_linked_doctor(user.id).await,
            Role::Admin => self.list_all().await,
        }
    }

    /// Appointments of the doctor profile linked to `user_id`.
    pub async fn list_for_linked_doctor(&self, user_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let doctor = self
            .doctors
            .find_by_user_id(user_id)
            .await?
            .ok_or(DoctorError::NoDoctorProfile)?;
        self.list_for_doctor(doctor.id).await
    }

    /// Reschedules one of the client's own appointments.
    pub async fn update_as_client(
        &self,
        client: &User,
        id: Uuid,
        request: &ClientAppointmentUpdate,
    ) -> Result<Appointment, AppointmentError> {
        let existing = self.get(id).await?.ok_or(AppointmentError::NotFound)?;
        if existing.client_id != client.id {
            warn!("User {} tried to edit appointment {} of client {}", client.id, id, existing.client_id);
            return Err(AppointmentError::NotOwner);
        }

        let changes = lifecycle::client_changes(request, Utc::now())?;
        if changes.is_empty() {
            debug!("Nothing to update on appointment {}", id);
            return Ok(existing);
        }

        self.apply(id, Value::Object(changes)).await
    }

    pub async fn update_as_admin(
        &self,
        id: Uuid,
        request: &AdminAppointmentUpdate,
    ) -> Result<Appointment, AppointmentError> {
        let changes = lifecycle::admin_changes(request, Utc::now())?;
        self.get(id).await?.ok_or(AppointmentError::NotFound)?;

        let updated = self.apply(id, Value::Object(changes)).await?;
        info!("Appointment {} set to {}", id, updated.status);
        Ok(updated)
    }

    /// Removes an appointment. Clients may only remove their own; admins any.
    pub async fn delete(&self, user: &User, id: Uuid) -> Result<(), AppointmentError> {
        let existing = self.get(id).await?.ok_or(AppointmentError::NotFound)?;
        if !user.is_admin() && existing.client_id != user.id {
            warn!("User {} tried to delete appointment {} of client {}", user.id, id, existing.client_id);
            return Err(AppointmentError::NotOwner);
        }

        let _: Vec<Value> = self
            .supabase
            .delete(APPOINTMENTS, &format!("id={}", eq(id.to_string())))
            .await?;

        info!("Appointment {} deleted by {}", id, user.id);
        Ok(())
    }

    async fn apply(&self, id: Uuid, changes: Value) -> Result<Appointment, AppointmentError> {
        let filter = format!("id={}&{}", eq(id.to_string()), EMBED_SELECT);
        let rows: Vec<Appointment> = self.supabase.update(APPOINTMENTS, &filter, changes).await?;
        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}
