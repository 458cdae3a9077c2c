use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

pub const DEFAULT_SUBJECT: &str = "Support CuraTime";
pub const DEFAULT_CATEGORY: &str = "general";

/// Body of `POST /support/contact/`. Everything but the message is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Address of whoever wrote in; `email` in the public form.
    #[serde(default, alias = "email")]
    pub sender: Option<String>,
}

#[derive(Error, Debug)]
pub enum SupportError {
    #[error("A message is required.")]
    MissingMessage,

    #[error("Could not reach the support mailbox: {0}")]
    Mail(String),
}

impl From<SupportError> for AppError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::MissingMessage => AppError::field("message", err.to_string()),
            SupportError::Mail(msg) => AppError::ExternalService(msg),
        }
    }
}
