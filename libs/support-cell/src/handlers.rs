use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::mailer::Mailer;

use crate::models::ContactRequest;
use crate::services::SupportRelay;

#[derive(Clone)]
pub struct SupportState {
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl SupportState {
    pub fn new(config: Arc<AppConfig>, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }
}

#[axum::debug_handler]
pub async fn contact_support(
    State(state): State<Arc<SupportState>>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<Value>, AppError> {
    SupportRelay::new(state.mailer.clone(), state.config.support_email.clone())
        .relay(&request)
        .await?;

    Ok(Json(json!({ "message": "Message sent to support." })))
}
