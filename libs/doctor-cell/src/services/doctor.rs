use serde_json::{json, Map, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use auth_cell::models::{present, AuthError, NewAccount, UpdateProfileRequest, UserAccount};
use auth_cell::services::account::{normalize_email, validate_email, validate_password, AccountService};
use auth_cell::services::password::PasswordService;
use shared_config::AppConfig;
use shared_database::{eq, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{
    AdminDoctorRequest, AdminDoctorView, Doctor, DoctorError, DoctorRecord,
    DoctorSelfUpdateRequest,
};
use crate::services::availability::normalize_availability;
use crate::services::specialty::SpecialtyService;

const DOCTORS: &str = "doctors";
const PUBLIC_SELECT: &str = "select=*,specialty:specialty_id(id,name,description)";
const ADMIN_SELECT: &str =
    "select=*,specialty:specialty_id(id,name,description),account:user_id(is_active,date_joined)";

pub struct DoctorService {
    supabase: SupabaseClient,
    accounts: AccountService,
    specialties: SpecialtyService,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            accounts: AccountService::new(config),
            specialties: SpecialtyService::new(config),
        }
    }

    // ==========================================================================
    // PUBLIC READS
    // ==========================================================================

    pub async fn list(&self) -> Result<Vec<Doctor>, DoctorError> {
        let query = format!("{}&order=last_name.asc,first_name.asc", PUBLIC_SELECT);
        Ok(self.supabase.select(DOCTORS, &query).await?)
    }

    pub async fn list_by_specialty(&self, specialty_id: Uuid) -> Result<Vec<Doctor>, DoctorError> {
        let query = format!(
            "{}&specialty_id={}&order=last_name.asc,first_name.asc",
            PUBLIC_SELECT,
            eq(specialty_id.to_string())
        );
        Ok(self.supabase.select(DOCTORS, &query).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let query = format!("{}&id={}&limit=1", PUBLIC_SELECT, eq(id.to_string()));
        Ok(self.supabase.select_one(DOCTORS, &query).await?)
    }

    /// The doctor profile linked to a user account.
    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let query = format!("{}&user_id={}&limit=1", PUBLIC_SELECT, eq(user_id.to_string()));
        Ok(self.supabase.select_one(DOCTORS, &query).await?)
    }

    // ==========================================================================
    // ADMINISTRATION
    // ==========================================================================

    pub async fn list_admin(&self) -> Result<Vec<AdminDoctorView>, DoctorError> {
        let query = format!("{}&order=first_name.asc,last_name.asc", ADMIN_SELECT);
        let records: Vec<DoctorRecord> = self.supabase.select(DOCTORS, &query).await?;
        Ok(records.into_iter().map(AdminDoctorView::from).collect())
    }

    pub async fn get_admin(&self, id: Uuid) -> Result<Option<AdminDoctorView>, DoctorError> {
        Ok(self.get_record(id).await?.map(AdminDoctorView::from))
    }

    async fn get_record(&self, id: Uuid) -> Result<Option<DoctorRecord>, DoctorError> {
        let query = format!("{}&id={}&limit=1", ADMIN_SELECT, eq(id.to_string()));
        Ok(self.supabase.select_one(DOCTORS, &query).await?)
    }

    /// Provisions the doctor's user account and profile together. The account
    /// is removed again if the profile insert fails.
    pub async fn create(&self, request: AdminDoctorRequest) -> Result<AdminDoctorView, DoctorError> {
        let first_name = required(&request.first_name, "first_name")?;
        let last_name = required(&request.last_name, "last_name")?;
        let email = normalize_email(&required(&request.email, "email")?);
        let password = required(&request.password, "password")?;
        validate_email(&email)?;

        let specialty = self
            .specialties
            .resolve(request.specialty_id, request.specialization.as_deref())
            .await?
            .ok_or_else(|| DoctorError::required("specialty"))?;

        let consultation_fee = match &request.consultation_fee {
            Some(value) => parse_consultation_fee(value)?,
            None => None,
        };
        let availability = match &request.availability {
            Some(value) => normalize_availability(value)?,
            None => Default::default(),
        };

        if self.email_used_by_doctor(&email, None).await? {
            return Err(AuthError::EmailTaken.into());
        }

        let account = self.accounts.create_account(NewAccount {
            email: email.clone(),
            password,
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            role: Role::Doctor,
            address: String::new(),
            gender: String::new(),
        }).await?;

        let text = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();
        let row = json!({
            "user_id": account.id,
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
            "phone": text(&request.phone),
            "address": text(&request.address),
            "city": text(&request.city),
            "state": text(&request.state),
            "zip_code": text(&request.zip_code),
            "specialty_id": specialty.id,
            "availability": availability,
            "bio": text(&request.bio),
            "photo": request.photo.as_deref().map(str::trim).filter(|p| !p.is_empty()),
            "consultation_fee": consultation_fee
        });

        let mut doctor: Doctor = match self.supabase.insert(DOCTORS, row).await {
            Ok(doctor) => doctor,
            Err(e) => {
                error!("Doctor insert failed, removing account {}: {}", account.id, e);
                if let Err(cleanup) = self.accounts.delete_account(account.id).await {
                    error!("Failed to remove account {}: {}", account.id, cleanup);
                }
                return Err(e.into());
            }
        };

        info!("Created doctor {} linked to account {}", doctor.id, account.id);

        let specialization = specialty.name.clone();
        doctor.specialty = Some(specialty);
        Ok(AdminDoctorView {
            doctor,
            specialization,
            is_active: account.is_active,
            date_joined: Some(account.date_joined),
        })
    }

    /// Admin edit. `replace` is the PUT variant, where names, email and
    /// specialty are required; otherwise only supplied fields change.
    pub async fn update(
        &self,
        id: Uuid,
        request: AdminDoctorRequest,
        replace: bool,
    ) -> Result<AdminDoctorView, DoctorError> {
        let record = self.get_record(id).await?.ok_or(DoctorError::DoctorNotFound)?;
        let user_id = record.doctor.user_id;

        let (first_name, last_name, email) = if replace {
            (
                Some(required(&request.first_name, "first_name")?),
                Some(required(&request.last_name, "last_name")?),
                Some(required(&request.email, "email")?),
            )
        } else {
            (
                present(&request.first_name).map(str::to_string),
                present(&request.last_name).map(str::to_string),
                present(&request.email).map(str::to_string),
            )
        };

        let specialty = self
            .specialties
            .resolve(request.specialty_id, request.specialization.as_deref())
            .await?;
        if replace && specialty.is_none() {
            return Err(DoctorError::required("specialty"));
        }

        let email = match email {
            Some(email) => {
                let email = normalize_email(&email);
                validate_email(&email)?;
                if email != record.doctor.email {
                    if self.accounts.email_taken(&email, user_id).await?
                        || self.email_used_by_doctor(&email, Some(id)).await?
                    {
                        return Err(AuthError::EmailTaken.into());
                    }
                }
                Some(email)
            }
            None => None,
        };

        let mut doctor_changes = Map::new();
        let mut account_changes = Map::new();

        for (column, value) in [("first_name", &first_name), ("last_name", &last_name), ("email", &email)] {
            if let Some(value) = value {
                doctor_changes.insert(column.to_string(), json!(value));
                account_changes.insert(column.to_string(), json!(value));
            }
        }
        for (column, value) in [
            ("phone", &request.phone),
            ("address", &request.address),
            ("city", &request.city),
            ("state", &request.state),
            ("zip_code", &request.zip_code),
            ("bio", &request.bio),
            ("photo", &request.photo),
        ] {
            if let Some(value) = value {
                doctor_changes.insert(column.to_string(), json!(value.trim()));
            }
        }
        if let Some(specialty) = &specialty {
            doctor_changes.insert("specialty_id".to_string(), json!(specialty.id));
        }
        if let Some(value) = &request.consultation_fee {
            doctor_changes.insert("consultation_fee".to_string(), json!(parse_consultation_fee(value)?));
        }
        if let Some(value) = &request.availability {
            doctor_changes.insert("availability".to_string(), json!(normalize_availability(value)?));
        }
        if let Some(password) = present(&request.password).filter(|_| user_id.is_some()) {
            validate_password(password)?;
            account_changes.insert(
                "password_hash".to_string(),
                json!(PasswordService::hash_password(password)?),
            );
        }

        if !doctor_changes.is_empty() {
            let _: Vec<Value> = self.supabase.update(
                DOCTORS,
                &format!("id={}", eq(id.to_string())),
                Value::Object(doctor_changes),
            ).await?;
        }

        if let Some(user_id) = user_id.filter(|_| !account_changes.is_empty()) {
            self.accounts.update_fields(user_id, account_changes).await?;
        }

        info!("Updated doctor {}", id);
        self.get_admin(id).await?.ok_or(DoctorError::DoctorNotFound)
    }

    /// Removes the doctor. A linked account is deleted with it, which
    /// cascades to the profile and its appointments.
    pub async fn delete(&self, id: Uuid) -> Result<(), DoctorError> {
        let doctor = self.get(id).await?.ok_or(DoctorError::DoctorNotFound)?;

        match doctor.user_id {
            Some(user_id) => {
                self.accounts.delete_account(user_id).await?;
            }
            None => {
                let _: Vec<Value> = self.supabase.delete(DOCTORS, &format!("id={}", eq(id.to_string()))).await?;
            }
        }

        info!("Deleted doctor {}", id);
        Ok(())
    }

    /// Flips the active flag of the linked account and returns the new value.
    pub async fn toggle_status(&self, id: Uuid) -> Result<bool, DoctorError> {
        let doctor = self.get(id).await?.ok_or(DoctorError::DoctorNotFound)?;
        let user_id = doctor.user_id.ok_or(DoctorError::LinkedAccountMissing)?;
        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(DoctorError::LinkedAccountMissing)?;

        let updated = self.accounts.set_active(user_id, !account.is_active).await?;
        info!("Doctor {} is now {}", id, if updated.is_active { "active" } else { "inactive" });
        Ok(updated.is_active)
    }

    // ==========================================================================
    // SELF SERVICE
    // ==========================================================================

    pub async fn get_self(&self, user_id: Uuid) -> Result<(UserAccount, Doctor), DoctorError> {
        let doctor = self.find_by_user_id(user_id).await?.ok_or(DoctorError::NoDoctorProfile)?;
        let account = self
            .accounts
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;
        Ok((account, doctor))
    }

    /// Applies a doctor's own edit to the account and the profile. Everything
    /// is validated before the first write.
    pub async fn update_self(
        &self,
        user_id: Uuid,
        request: DoctorSelfUpdateRequest,
    ) -> Result<(UserAccount, Doctor), DoctorError> {
        let doctor = self.find_by_user_id(user_id).await?.ok_or(DoctorError::NoDoctorProfile)?;

        let mut doctor_changes = Map::new();
        if let Some(value) = &request.consultation_fee {
            doctor_changes.insert("consultation_fee".to_string(), json!(parse_consultation_fee(value)?));
        }
        if let Some(value) = &request.availability {
            doctor_changes.insert("availability".to_string(), json!(normalize_availability(value)?));
        }
        for (column, value) in [
            ("phone", &request.phone),
            ("address", &request.address),
            ("city", &request.city),
            ("state", &request.state),
            ("zip_code", &request.zip_code),
            ("bio", &request.bio),
        ] {
            if let Some(value) = value {
                doctor_changes.insert(column.to_string(), json!(value.trim()));
            }
        }

        let profile = UpdateProfileRequest {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            address: request.adresse,
            gender: request.gender,
            password: request.password,
        };
        let account_changes = self.accounts.profile_changes(user_id, &profile).await?;

        // The profile row carries its own copy of the name and email.
        for column in ["first_name", "last_name", "email"] {
            if let Some(value) = account_changes.get(column) {
                doctor_changes.insert(column.to_string(), value.clone());
            }
        }

        if let Some(email) = account_changes.get("email").and_then(Value::as_str) {
            if email != doctor.email && self.email_used_by_doctor(email, Some(doctor.id)).await? {
                return Err(AuthError::EmailTaken.into());
            }
        }

        // Profile row before the account.
        let updated = if doctor_changes.is_empty() {
            doctor
        } else {
            debug!("Doctor {} updating {} profile field(s)", doctor.id, doctor_changes.len());
            let query = format!("id={}&{}", eq(doctor.id.to_string()), PUBLIC_SELECT);
            let rows: Vec<Doctor> = self.supabase.update(DOCTORS, &query, Value::Object(doctor_changes)).await?;
            rows.into_iter().next().ok_or(DoctorError::DoctorNotFound)?
        };

        let account = if account_changes.is_empty() {
            self.accounts.find_by_id(user_id).await?.ok_or(AuthError::AccountNotFound)?
        } else {
            self.accounts.update_fields(user_id, account_changes).await?
        };

        Ok((account, updated))
    }

    async fn email_used_by_doctor(&self, email: &str, except: Option<Uuid>) -> Result<bool, DoctorError> {
        let query = format!("select=id&email={}", eq(email));
        let rows: Vec<Value> = self.supabase.select(DOCTORS, &query).await?;
        Ok(rows.iter().any(|row| {
            let id = row.get("id").and_then(Value::as_str).and_then(|s| Uuid::parse_str(s).ok());
            id.is_none() || id != except
        }))
    }
}

fn required(value: &Option<String>, field: &str) -> Result<String, DoctorError> {
    present(value)
        .map(str::to_string)
        .ok_or_else(|| DoctorError::required(field))
}

/// Reads a consultation fee given as a number or a numeric string. Blank
/// values and `null` clear the fee.
pub fn parse_consultation_fee(value: &Value) -> Result<Option<f64>, DoctorError> {
    let invalid = || DoctorError::InvalidFee("consultation_fee must be a non-negative decimal number".to_string());

    let fee = match value {
        Value::Null => return Ok(None),
        Value::String(raw) => {
            let raw = raw.trim();
            if matches!(raw, "" | "null" | "None") {
                return Ok(None);
            }
            raw.parse::<f64>().map_err(|_| invalid())?
        }
        Value::Number(number) => number.as_f64().ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };

    if !fee.is_finite() || fee < 0.0 {
        return Err(invalid());
    }
    Ok(Some(fee))
}
