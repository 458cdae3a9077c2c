use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers::{self, SupportState};

pub fn support_routes(state: Arc<SupportState>) -> Router {
    // Public: the contact form is usable before signing in
    Router::new()
        .route("/support/contact/", post(handlers::contact_support))
        .with_state(state)
}
