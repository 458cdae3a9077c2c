use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn dashboard_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/admin/dashboard/stats/", get(handlers::admin_stats))
        .route("/admin/dashboard/activities/", get(handlers::admin_activities))
        .route("/doctors/dashboard/stats/", get(handlers::doctor_stats))
        .route("/doctors/appointments/recent/", get(handlers::doctor_recent_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
