use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Routes are mounted under `/doctors/{doctor_id}/schedule`.
pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/availability", get(handlers::get_day_availability))
        .route("/check", get(handlers::check_slot));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/", put(handlers::upsert_schedule))
        .route("/", get(handlers::get_schedule))
        .route("/working-hours", put(handlers::set_working_hours))
        .route("/breaks", post(handlers::add_break))
        .route("/holidays", post(handlers::add_holiday))
        .route("/vacations", post(handlers::request_vacation))
        .route("/vacations/{vacation_id}", patch(handlers::resolve_vacation))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
