use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use auth_cell::services::code_store::VerificationCodeStore;
use auth_cell::AuthState;
use dashboard_cell::router::dashboard_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;
use shared_utils::mailer::Mailer;
use support_cell::router::support_routes;
use support_cell::SupportState;

/// Cell routers carry absolute paths, so they are merged rather than nested.
pub fn create_router(
    config: Arc<AppConfig>,
    codes: Arc<dyn VerificationCodeStore>,
    mailer: Arc<dyn Mailer>,
) -> Router {
    let auth_state = Arc::new(AuthState::new(config.clone(), codes, mailer.clone()));
    let support_state = Arc::new(SupportState::new(config.clone(), mailer));

    Router::new()
        .route("/", get(|| async { "CuraTime API is running!" }))
        .merge(auth_routes(auth_state))
        .merge(doctor_routes(config.clone()))
        .merge(appointment_routes(config.clone()))
        .merge(dashboard_routes(config))
        .merge(support_routes(support_state))
}
