use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::{Role, TokenPair, TokenType, User};
use shared_models::error::AppError;
use shared_utils::jwt::{issue_token, issue_token_pair, validate_token};
use shared_utils::mailer::Mailer;

use crate::models::{
    present, AuthError, ForgotPasswordRequest, LoginRequest, LoginResponse, NewAccount,
    RefreshRequest, RegisterRequest, UpdateProfileRequest, UserAccount, VerifyCodeRequest,
};
use crate::services::account::AccountService;
use crate::services::code_store::VerificationCodeStore;
use crate::services::password_reset::PasswordResetService;

/// Shared state of the auth routes: configuration plus the two
/// collaborators of the password reset flow.
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub codes: Arc<dyn VerificationCodeStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl AuthState {
    pub fn new(
        config: Arc<AppConfig>,
        codes: Arc<dyn VerificationCodeStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self { config, codes, mailer }
    }
}

// ==============================================================================
// REGISTRATION
// ==============================================================================

#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in [
        ("email", &request.email),
        ("password", &request.password),
    ] {
        if present(value).is_none() {
            fields.entry(name.to_string()).or_default().push("This field is required".to_string());
        }
    }

    if let Some(role) = present(&request.user_role) {
        if role.parse::<Role>() != Ok(Role::Client) {
            fields
                .entry("user_role".to_string())
                .or_default()
                .push("Only client accounts can self-register".to_string());
        }
    }

    if !fields.is_empty() {
        return Err(AppError::FieldErrors(fields));
    }

    let field = |value: &Option<String>| present(value).unwrap_or_default().to_string();
    let account = AccountService::new(&state.config)
        .create_account(NewAccount {
            email: field(&request.email),
            password: field(&request.password),
            first_name: field(&request.first_name),
            last_name: field(&request.last_name),
            role: Role::Client,
            address: field(&request.address),
            gender: field(&request.gender),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

// ==============================================================================
// LOGIN & TOKENS
// ==============================================================================

#[axum::debug_handler]
pub async fn client_login(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (account, tokens) = login_as(&state.config, &request, Role::Client).await?;
    Ok(Json(LoginResponse::new(&account, tokens)))
}

#[axum::debug_handler]
pub async fn admin_login(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let (account, tokens) = login_as(&state.config, &request, Role::Admin).await?;
    let mut response = LoginResponse::new(&account, tokens);
    response.is_superuser = Some(account.is_superuser);
    Ok(Json(response))
}

/// Credential check, active check and token issuance for the client and
/// admin logins. Inactive accounts are reported as a 401.
async fn login_as(
    config: &AppConfig,
    request: &LoginRequest,
    role: Role,
) -> Result<(UserAccount, TokenPair), AppError> {
    debug!("{} login attempt", role);

    let accounts = AccountService::new(config);
    let account = accounts
        .authenticate(&request.email, &request.password, role)
        .await?;

    if !account.is_active {
        return Err(AppError::Auth(AuthError::AccountInactive.to_string()));
    }

    let tokens = issue_token_pair(account.id, &account.email, account.user_role, config)
        .map_err(AppError::Internal)?;
    accounts.record_login(account.id).await?;

    info!("{} {} logged in", role, account.id);
    Ok((account, tokens))
}

/// Exchanges a refresh token for a new access token. The account must still
/// exist and be active.
#[axum::debug_handler]
pub async fn refresh_token(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let config = &state.config;
    let user = validate_token(request.refresh.trim(), &config.jwt_secret, TokenType::Refresh)
        .map_err(|e| AppError::from(AuthError::Token(e)))?;

    let account = AccountService::new(config)
        .find_by_id(user.id)
        .await?
        .filter(|account| account.is_active)
        .ok_or_else(|| AppError::Auth("Account is no longer available".to_string()))?;

    let access = issue_token(
        account.id,
        &account.email,
        account.user_role,
        TokenType::Access,
        chrono::Duration::minutes(config.access_token_ttl_minutes),
        &config.jwt_secret,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(json!({ "access": access })))
}

// ==============================================================================
// PASSWORD RESET
// ==============================================================================

#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    PasswordResetService::new(&state.config, state.codes.clone(), state.mailer.clone())
        .request_code(&request.email)
        .await?;

    Ok(Json(json!({ "message": "A verification code has been sent to your email" })))
}

#[axum::debug_handler]
pub async fn verify_code(
    State(state): State<Arc<AuthState>>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<Value>, AppError> {
    PasswordResetService::new(&state.config, state.codes.clone(), state.mailer.clone())
        .verify_code(&request.email, &request.code, &request.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password has been reset successfully" })))
}

// ==============================================================================
// PROFILE
// ==============================================================================

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<Arc<AuthState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Client)?;

    let account = AccountService::new(&state.config)
        .update_profile(user.id, &request)
        .await?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": account
    })))
}
