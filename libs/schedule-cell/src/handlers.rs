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

use crate::models::{
    AvailabilityQuery, Holiday, RequestVacationRequest, ResolveVacationRequest, ScheduleBreak,
    SetWorkingHoursRequest, SlotCheckQuery, UpsertScheduleRequest, VacationDecision,
};
use crate::services::availability::{day_availability, is_slot_available};
use crate::services::schedule::{PostgrestAppointmentLookup, ScheduleService};

fn require_self_or_admin(user: &User, doctor_id: Uuid, action: &str) -> Result<(), AppError> {
    if user.is_admin() || user.id == doctor_id.to_string() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Not authorized to {} for this doctor",
            action
        )))
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

/// Free slots for one day. The whole day reports empty when a holiday or
/// approved vacation covers it.
#[axum::debug_handler]
pub async fn get_day_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);

    let schedule = service
        .get_schedule(doctor_id, &state.database_anon_key)
        .await?;

    let slots = day_availability(&schedule, query.date);
    let total_slots = slots.len();

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
        "total_slots": total_slots,
    })))
}

/// Check one specific slot. "Not available" is a normal `false` in the
/// response body, not an error status.
#[axum::debug_handler]
pub async fn check_slot(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotCheckQuery>,
) -> Result<Json<Value>, AppError> {
    if query.start >= query.end {
        return Err(AppError::ValidationError(
            "Start time must be before end time".to_string(),
        ));
    }

    let service = ScheduleService::new(&state);
    let schedule = service
        .get_schedule(doctor_id, &state.database_anon_key)
        .await?;

    let available = is_slot_available(&schedule, query.date, query.start, query.end);

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "start": query.start,
        "end": query.end,
        "available": available,
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = ScheduleService::new(&state);
    let schedule = service.get_schedule(doctor_id, auth.token()).await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn upsert_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id, "manage the schedule")?;

    let service = ScheduleService::new(&state);
    let schedule = service
        .upsert_schedule(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn set_working_hours(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetWorkingHoursRequest>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id, "manage working hours")?;

    let service = ScheduleService::new(&state);
    let schedule = service
        .set_working_hours(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn add_break(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ScheduleBreak>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id, "add breaks")?;

    let service = ScheduleService::new(&state);
    let schedule = service.add_break(doctor_id, request, auth.token()).await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn add_holiday(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<Holiday>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, doctor_id, "add holidays")?;

    let service = ScheduleService::new(&state);
    let schedule = service
        .add_holiday(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(schedule)))
}

#[axum::debug_handler]
pub async fn request_vacation(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RequestVacationRequest>,
) -> Result<Json<Value>, AppError> {
    if user.id != doctor_id.to_string() {
        return Err(AppError::Forbidden(
            "Only the doctor can request their own vacation".to_string(),
        ));
    }

    let service = ScheduleService::new(&state);
    let lookup = PostgrestAppointmentLookup::new(service.db(), auth.token());

    let (schedule, vacation) = service
        .request_vacation(doctor_id, request, &lookup, auth.token())
        .await?;

    // Notify the admin, best-effort: delivery must never undo the request.
    let doctor_name = match service.doctor_contact(doctor_id, auth.token()).await {
        Ok(contact) => contact.full_name(),
        Err(_) => doctor_id.to_string(),
    };
    let notifier = NotificationService::new(&state);
    let recipient = Recipient::new(
        state.admin_phone.clone(),
        Some(state.admin_email.clone()).filter(|e| !e.is_empty()),
    );
    let event = NotificationEvent::VacationRequest {
        doctor_name,
        start_date: vacation.start_date,
        end_date: vacation.end_date,
        reason: vacation.reason.clone(),
    };
    tokio::spawn(async move {
        notifier.send(recipient, event).await;
    });

    Ok(Json(json!({
        "schedule": schedule,
        "vacation": vacation,
    })))
}

#[axum::debug_handler]
pub async fn resolve_vacation(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, vacation_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ResolveVacationRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can resolve vacation requests".to_string(),
        ));
    }

    let admin_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid administrator id".to_string()))?;

    let service = ScheduleService::new(&state);
    let (schedule, vacation) = service
        .resolve_vacation(doctor_id, vacation_id, request.status, admin_id, auth.token())
        .await?;

    // Notify the doctor, best-effort.
    if let Ok(contact) = service.doctor_contact(doctor_id, auth.token()).await {
        let notifier = NotificationService::new(&state);
        let recipient = Recipient::new(contact.phone, contact.email);
        let event = NotificationEvent::VacationResponse {
            approved: request.status == VacationDecision::Approved,
            start_date: vacation.start_date,
            end_date: vacation.end_date,
            reason: vacation.reason.clone(),
        };
        tokio::spawn(async move {
            notifier.send(recipient, event).await;
        });
    }

    Ok(Json(json!({
        "schedule": schedule,
        "vacation": vacation,
    })))
}
