use std::sync::Arc;

use axum::{middleware, routing::get, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn auth_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/register", post(handlers::register_patient))
        .route("/verify-otp", post(handlers::verify_otp))
        .route("/resend-otp", post(handlers::resend_otp))
        .route("/login", post(handlers::login))
        .route("/bootstrap-admin", post(handlers::bootstrap_admin));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route("/change-password", post(handlers::change_password))
        .route("/reset-password", post(handlers::reset_password))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
