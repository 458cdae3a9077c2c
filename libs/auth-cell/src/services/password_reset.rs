use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::Role;
use shared_utils::mailer::{Mailer, OutgoingEmail};

use crate::models::AuthError;
use crate::services::account::{normalize_email, validate_password, AccountService};
use crate::services::code_store::VerificationCodeStore;

/// How long an emailed code stays valid.
pub const CODE_TTL: Duration = Duration::from_secs(300);

pub fn generate_code() -> String {
    rand::thread_rng().gen_range(1000..=9999).to_string()
}

pub struct PasswordResetService {
    accounts: AccountService,
    codes: Arc<dyn VerificationCodeStore>,
    mailer: Arc<dyn Mailer>,
}

impl PasswordResetService {
    pub fn new(
        config: &AppConfig,
        codes: Arc<dyn VerificationCodeStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            accounts: AccountService::new(config),
            codes,
            mailer,
        }
    }

    /// Stores a fresh code for a client account and emails it.
    pub async fn request_code(&self, email: &str) -> Result<(), AuthError> {
        let email = require_email(email)?;

        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        if account.user_role != Role::Client {
            return Err(AuthError::NotAClient);
        }

        let code = generate_code();
        self.codes.put(&email, &code, CODE_TTL).await?;

        self.mailer
            .send(OutgoingEmail {
                to: account.email.clone(),
                subject: "Password reset code".to_string(),
                body: format!(
                    "Hello {},\n\nYour verification code is {}. It expires in {} minutes.",
                    account.full_name(),
                    code,
                    CODE_TTL.as_secs() / 60
                ),
            })
            .await
            .map_err(|e| AuthError::Mail(e.to_string()))?;

        info!("Password reset code issued for account {}", account.id);
        Ok(())
    }

    /// Checks the code and sets the new password. A matched code is
    /// consumed.
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = require_email(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::validation("code", "This field is required"));
        }
        validate_password(new_password)
            .map_err(|_| AuthError::validation("new_password", "This field may not be blank"))?;

        let stored = self.codes.get(&email).await?.ok_or(AuthError::CodeExpired)?;
        if stored != code {
            debug!("Verification code mismatch");
            return Err(AuthError::InvalidCode);
        }

        let account = self
            .accounts
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        if account.user_role != Role::Client {
            return Err(AuthError::NotAClient);
        }

        self.accounts.set_password(account.id, new_password).await?;
        self.codes.remove(&email).await?;

        info!("Password reset completed for account {}", account.id);
        Ok(())
    }
}

fn require_email(email: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AuthError::validation("email", "This field is required"));
    }
    Ok(email)
}
