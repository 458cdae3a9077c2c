use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{eq, SupabaseClient};
use shared_models::auth::Role;

use crate::models::{present, AuthError, NewAccount, UpdateProfileRequest, UserAccount};
use crate::services::password::PasswordService;

const USERS: &str = "users";

pub struct AccountService {
    supabase: SupabaseClient,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthError> {
        let query = format!("email={}&limit=1", eq(normalize_email(email)));
        Ok(self.supabase.select_one(USERS, &query).await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, AuthError> {
        let query = format!("id={}&limit=1", eq(id.to_string()));
        Ok(self.supabase.select_one(USERS, &query).await?)
    }

    /// Whether another account already uses `email`. `except` excludes the
    /// caller's own row on profile updates.
    pub async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AuthError> {
        Ok(match self.find_by_email(email).await? {
            Some(existing) => Some(existing.id) != except,
            None => false,
        })
    }

    pub async fn create_account(&self, account: NewAccount) -> Result<UserAccount, AuthError> {
        let email = normalize_email(&account.email);
        validate_email(&email)?;
        validate_password(&account.password)?;

        if self.email_taken(&email, None).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = PasswordService::hash_password(&account.password)?;
        let is_admin = account.role == Role::Admin;

        let created: UserAccount = self.supabase.insert(USERS, json!({
            "email": email,
            "password_hash": password_hash,
            "first_name": account.first_name.trim(),
            "last_name": account.last_name.trim(),
            "user_role": account.role,
            "is_active": true,
            "is_staff": is_admin,
            "is_superuser": is_admin,
            "date_joined": Utc::now().to_rfc3339(),
            "address": account.address.trim(),
            "gender": account.gender.trim()
        })).await?;

        info!("Created {} account {}", created.user_role, created.id);
        Ok(created)
    }

    /// Checks the credentials against an account of the given role. A wrong
    /// password, an unknown email and a role mismatch all look the same to
    /// the caller. The active flag is checked by the login endpoint.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserAccount, AuthError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &account.password_hash) {
            debug!("Password mismatch for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        if account.user_role != role {
            debug!("Account {} is {}, expected {}", account.id, account.user_role, role);
            return Err(AuthError::InvalidCredentials);
        }

        Ok(account)
    }

    pub async fn record_login(&self, id: Uuid) -> Result<(), AuthError> {
        let _: Vec<Value> = self.supabase.update(
            USERS,
            &format!("id={}", eq(id.to_string())),
            json!({ "last_login": Utc::now().to_rfc3339() }),
        ).await?;
        Ok(())
    }

    pub async fn set_password(&self, id: Uuid, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = PasswordService::hash_password(password)?;
        self.update_fields(id, Map::from_iter([
            ("password_hash".to_string(), json!(password_hash)),
        ])).await?;
        Ok(())
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<UserAccount, AuthError> {
        self.update_fields(id, Map::from_iter([
            ("is_active".to_string(), json!(is_active)),
        ])).await
    }

    /// Applies the non-blank fields of a profile update. Returns the stored
    /// account unchanged when nothing was supplied.
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: &UpdateProfileRequest,
    ) -> Result<UserAccount, AuthError> {
        let changes = self.profile_changes(id, request).await?;
        if changes.is_empty() {
            return self.find_by_id(id).await?.ok_or(AuthError::AccountNotFound);
        }
        self.update_fields(id, changes).await
    }

    /// Validates a profile update and turns it into column changes without
    /// writing anything.
    pub async fn profile_changes(
        &self,
        id: Uuid,
        request: &UpdateProfileRequest,
    ) -> Result<Map<String, Value>, AuthError> {
        let mut changes = Map::new();

        for (column, value) in [
            ("first_name", &request.first_name),
            ("last_name", &request.last_name),
            ("address", &request.address),
            ("gender", &request.gender),
        ] {
            if let Some(value) = present(value) {
                changes.insert(column.to_string(), json!(value));
            }
        }

        if let Some(email) = present(&request.email) {
            let email = normalize_email(email);
            validate_email(&email)?;
            if self.email_taken(&email, Some(id)).await? {
                return Err(AuthError::EmailTaken);
            }
            changes.insert("email".to_string(), json!(email));
        }

        if let Some(password) = present(&request.password) {
            validate_password(password)?;
            changes.insert(
                "password_hash".to_string(),
                json!(PasswordService::hash_password(password)?),
            );
        }

        Ok(changes)
    }

    pub async fn update_fields(
        &self,
        id: Uuid,
        changes: Map<String, Value>,
    ) -> Result<UserAccount, AuthError> {
        let rows: Vec<UserAccount> = self.supabase.update(
            USERS,
            &format!("id={}", eq(id.to_string())),
            Value::Object(changes),
        ).await?;

        rows.into_iter().next().ok_or(AuthError::AccountNotFound)
    }

    pub async fn delete_account(&self, id: Uuid) -> Result<bool, AuthError> {
        let rows: Vec<Value> = self.supabase.delete(USERS, &format!("id={}", eq(id.to_string()))).await?;
        Ok(!rows.is_empty())
    }

    /// Makes sure an admin account exists for the bootstrap credentials.
    /// An existing account with that email is left untouched.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AuthError> {
        match self.find_by_email(email).await? {
            Some(existing) if existing.user_role == Role::Admin => {
                debug!("Bootstrap admin {} already present", existing.id);
            }
            Some(existing) => {
                warn!("Bootstrap admin email belongs to a {} account, not promoting it", existing.user_role);
            }
            None => {
                self.create_account(NewAccount {
                    email: email.to_string(),
                    password: password.to_string(),
                    first_name: "Admin".to_string(),
                    last_name: String::new(),
                    role: Role::Admin,
                    address: String::new(),
                    gender: String::new(),
                }).await?;
            }
        }
        Ok(())
    }
}

/// Lower-cases the domain part, matching how accounts are stored.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::validation("email", "This field is required"));
    }
    if !email_pattern().is_some_and(|pattern| pattern.is_match(email)) {
        return Err(AuthError::validation("email", "Enter a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.trim().is_empty() {
        return Err(AuthError::validation("password", "This field may not be blank"));
    }
    Ok(())
}
