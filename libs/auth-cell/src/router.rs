use std::sync::Arc;

use axum::{
    Router,
    routing::{patch, post},
    middleware,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AuthState};

pub fn auth_routes(state: Arc<AuthState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/client/login", post(handlers::client_login))
        .route("/admin/login", post(handlers::admin_login))
        .route("/token/refresh", post(handlers::refresh_token))
        .route("/client/forgot-password", post(handlers::forgot_password))
        .route("/client/verify-code", post(handlers::verify_code));

    let protected_routes = Router::new()
        .route("/client/update-profile", patch(handlers::update_profile))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
