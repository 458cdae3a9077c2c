use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/doctors/", get(handlers::list_doctors))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor))
        .route("/doctors/{doctor_id}/", get(handlers::get_doctor))
        .route("/doctors/by-specialty/{specialty_id}", get(handlers::doctors_by_specialty))
        .route("/doctors/by-specialty/{specialty_id}/", get(handlers::doctors_by_specialty))
        .route("/specialties/", get(handlers::list_specialties))
        .route("/doctors/login", post(handlers::doctor_login));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/doctors/me/", get(handlers::get_me).patch(handlers::update_me))
        .route(
            "/admin/doctors/",
            get(handlers::admin_list_doctors).post(handlers::admin_create_doctor),
        )
        .route(
            "/admin/doctors/{doctor_id}/",
            get(handlers::admin_get_doctor)
                .put(handlers::admin_replace_doctor)
                .patch(handlers::admin_patch_doctor)
                .delete(handlers::admin_delete_doctor),
        )
        .route(
            "/admin/doctors/{doctor_id}/toggle-status/",
            patch(handlers::admin_toggle_doctor_status),
        )
        .route(
            "/admin/specialties/",
            get(handlers::admin_list_specialties).post(handlers::admin_create_specialty),
        )
        .route(
            "/admin/specialties/{specialty_id}/",
            patch(handlers::admin_patch_specialty)
                .put(handlers::admin_replace_specialty)
                .delete(handlers::admin_delete_specialty),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
