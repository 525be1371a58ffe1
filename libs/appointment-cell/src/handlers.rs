use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
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

use crate::models::{Appointment, BookAppointmentRequest, CancelAppointmentRequest};
use crate::services::booking::BookingService;

fn notify_later(notifier: NotificationService, recipient: Recipient, event: NotificationEvent) {
    tokio::spawn(async move {
        notifier.send(recipient, event).await;
    });
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden(
            "Only patients can book appointments".to_string(),
        ));
    }

    let patient_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::BadRequest("Invalid patient id".to_string()))?;

    let service = BookingService::new(&state);
    let appointment = service.book(patient_id, request, auth.token()).await?;

    // Tell both parties, best-effort.
    let notifier_state = state.clone();
    if let (Ok(patient), Ok(doctor)) = (
        service.contact(appointment.patient_id, auth.token()).await,
        service.contact(appointment.doctor_id, auth.token()).await,
    ) {
        notify_later(
            NotificationService::new(&notifier_state),
            Recipient::new(doctor.phone.clone(), doctor.email.clone()),
            NotificationEvent::AppointmentCreated {
                counterpart_name: patient.full_name(),
                date: appointment.date,
                start_time: appointment.start_time.to_string(),
            },
        );
        notify_later(
            NotificationService::new(&notifier_state),
            Recipient::new(patient.phone.clone(), patient.email.clone()),
            NotificationEvent::AppointmentCreated {
                counterpart_name: doctor.full_name(),
                date: appointment.date,
                start_time: appointment.start_time.to_string(),
            },
        );
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointments = service.list_for_user(&user, auth.token()).await?;

    let total = appointments.len();
    Ok(Json(json!({
        "appointments": appointments,
        "total": total,
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    let is_party = user.id == appointment.patient_id.to_string()
        || user.id == appointment.doctor_id.to_string();
    if !is_party && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.confirm(appointment_id, &user, auth.token()).await?;

    notify_party(&state, &service, &appointment, auth.token(), |appt| {
        NotificationEvent::AppointmentConfirmed {
            date: appt.date,
            start_time: appt.start_time.to_string(),
        }
    })
    .await;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service
        .cancel(appointment_id, &user, request.reason.clone(), auth.token())
        .await?;

    // The cancelling side already knows; tell the other party.
    let counterpart = if user.id == appointment.patient_id.to_string() {
        appointment.doctor_id
    } else {
        appointment.patient_id
    };
    if let Ok(contact) = service.contact(counterpart, auth.token()).await {
        notify_later(
            NotificationService::new(&state),
            Recipient::new(contact.phone, contact.email),
            NotificationEvent::AppointmentCancelled {
                date: appointment.date,
                start_time: appointment.start_time.to_string(),
                reason: request.reason,
            },
        );
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = BookingService::new(&state);
    let appointment = service.complete(appointment_id, &user, auth.token()).await?;

    notify_party(&state, &service, &appointment, auth.token(), |appt| {
        NotificationEvent::AppointmentCompleted { date: appt.date }
    })
    .await;

    Ok(Json(json!(appointment)))
}

/// Send an event about `appointment` to its patient, best-effort.
async fn notify_party<F>(
    state: &Arc<AppConfig>,
    service: &BookingService,
    appointment: &Appointment,
    auth_token: &str,
    build: F,
) where
    F: FnOnce(&Appointment) -> NotificationEvent,
{
    if let Ok(contact) = service.contact(appointment.patient_id, auth_token).await {
        notify_later(
            NotificationService::new(state),
            Recipient::new(contact.phone, contact.email),
            build(appointment),
        );
    }
}
