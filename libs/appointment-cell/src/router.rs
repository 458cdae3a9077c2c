use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // Every appointment operation requires authentication
    let protected_routes = Router::new()
        .route("/appointments/", post(handlers::create_appointment))
        .route("/appointments/list/", get(handlers::list_appointments))
        .route("/appointments/update/{appointment_id}/", patch(handlers::update_appointment))
        .route("/appointments/{appointment_id}/delete/", delete(handlers::delete_appointment))
        .route("/doctors/appointment/", get(handlers::doctor_appointments))
        .route("/admin/appointments/list/", get(handlers::admin_list_appointments))
        .route(
            "/admin/appointments/update/{appointment_id}/",
            patch(handlers::admin_update_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
