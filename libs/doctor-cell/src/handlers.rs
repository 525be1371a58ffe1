use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use notification_cell::{NotificationEvent, NotificationService, Recipient};
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateDoctorRequest, DoctorSearchQuery, RegistrationDecisionRequest};
use crate::services::doctor::DoctorService;

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors_public(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctors = service
        .search_doctors(query, &state.database_anon_key)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let total = doctors.len();
    Ok(Json(json!({
        "doctors": doctors,
        "total": total,
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_public(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service
        .get_doctor_public(doctor_id, &state.database_anon_key)
        .await
        .map_err(|_| AppError::NotFound("Doctor not found".to_string()))?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// PROTECTED HANDLERS (ADMIN)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can create doctor accounts".to_string(),
        ));
    }

    let service = DoctorService::new(&state);
    let created = service
        .create_doctor(request, auth.token())
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Hand the temporary password to the doctor out-of-band, best-effort.
    let notifier = NotificationService::new(&state);
    let recipient = Recipient::new(created.phone.clone(), created.email.clone());
    let event = NotificationEvent::DoctorAccountCreation {
        temporary_password: created.temporary_password.clone(),
    };
    tokio::spawn(async move {
        notifier.send(recipient, event).await;
    });

    Ok(Json(json!(created.profile)))
}

#[axum::debug_handler]
pub async fn resolve_registration(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegistrationDecisionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can resolve doctor registrations".to_string(),
        ));
    }

    let admin_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid administrator id".to_string()))?;

    let service = DoctorService::new(&state);
    let profile = service
        .resolve_registration(doctor_id, request, admin_id, auth.token())
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("already") {
                AppError::Conflict(msg)
            } else if msg.contains("not found") {
                AppError::NotFound(msg)
            } else {
                AppError::BadRequest(msg)
            }
        })?;

    Ok(Json(json!(profile)))
}
