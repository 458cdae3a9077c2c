use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::auth::{Role, TokenPair};
use shared_models::error::AppError;

// ==============================================================================
// PERSISTED ACCOUNT
// ==============================================================================

/// A row of the `users` table. The password hash is read for credential
/// checks but never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub user_role: Role,
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub gender: String,
}

impl UserAccount {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub address: String,
    pub gender: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(alias = "adresse")]
    pub address: Option<String>,
    pub gender: Option<String>,
    pub user_role: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user_id: Uuid,
    pub user_role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
    pub address: String,
    pub date_joined: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<Uuid>,
}

impl LoginResponse {
    pub fn new(account: &UserAccount, tokens: TokenPair) -> Self {
        Self {
            tokens,
            user_id: account.id,
            user_role: account.user_role,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            email: account.email.clone(),
            is_active: account.is_active,
            is_staff: account.is_staff,
            is_superuser: None,
            address: account.address.clone(),
            date_joined: account.date_joined,
            doctor_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Partial profile update. Blank values ("", "null", "None") leave the stored
/// field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "adresse")]
    pub address: Option<String>,
    pub gender: Option<String>,
    pub password: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.address,
            &self.gender,
            &self.password,
        ]
        .iter()
        .all(|value| present(value).is_none())
    }
}

/// Returns the trimmed value unless it is missing or one of the blank
/// markers clients send for "no change".
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !matches!(*v, "" | "null" | "None"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub new_password: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive, contact the administrator")]
    AccountInactive,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("No user with this email")]
    UnknownEmail,

    #[error("User not found")]
    AccountNotFound,

    #[error("Password reset is reserved for clients")]
    NotAClient,

    #[error("The code has expired or is invalid")]
    CodeExpired,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Invalid token: {0}")]
    Token(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation { field, message: message.into() }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::Token(_) => AppError::Auth(err.to_string()),
            AuthError::AccountInactive | AuthError::NotAClient => AppError::Forbidden(err.to_string()),
            AuthError::UnknownEmail | AuthError::AccountNotFound => AppError::NotFound(err.to_string()),
            AuthError::EmailTaken => AppError::field("email", err.to_string()),
            AuthError::CodeExpired | AuthError::InvalidCode => AppError::BadRequest(err.to_string()),
            AuthError::Validation { field, message } => AppError::field(field, message),
            AuthError::Mail(msg) => AppError::ExternalService(msg),
            AuthError::PasswordHash(msg) => AppError::Internal(msg),
            AuthError::Database(e) => AppError::Database(e.to_string()),
        }
    }
}
