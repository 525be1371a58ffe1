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
use shared_database::postgrest::PostgrestClient;
use shared_models::account::AccountContact;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreatePaymentRequest, Payment, RefundPaymentRequest};
use crate::services::payment::PaymentService;

/// Tell both parties about a payment event, best-effort.
async fn notify_parties(
    state: &Arc<AppConfig>,
    payment: &Payment,
    build: impl Fn(&Payment) -> NotificationEvent,
) {
    let db = PostgrestClient::new(state);

    for account_id in [payment.patient_id, payment.doctor_id] {
        let path = format!("/rest/v1/accounts?id=eq.{}", account_id);
        let mut rows: Vec<AccountContact> =
            match db.select(&path, Some(&state.database_anon_key)).await {
                Ok(rows) => rows,
                Err(_) => continue,
            };
        let Some(contact) = rows.pop() else { continue };

        let notifier = NotificationService::new(state);
        let recipient = Recipient::new(contact.phone, contact.email);
        let event = build(payment);
        tokio::spawn(async move {
            notifier.send(recipient, event).await;
        });
    }
}

#[axum::debug_handler]
pub async fn create_payment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_patient() && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only patients can pay for appointments".to_string(),
        ));
    }

    let service = PaymentService::new(&state);
    let payment = service
        .create_payment(appointment_id, request, auth.token())
        .await?;

    notify_parties(&state, &payment, |p| NotificationEvent::PaymentReceived {
        amount: p.amount,
        currency: p.currency.to_string(),
    })
    .await;

    Ok(Json(json!(payment)))
}

#[axum::debug_handler]
pub async fn get_payment(
    State(state): State<Arc<AppConfig>>,
    Path(payment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state);
    let payment = service.get_payment(payment_id, &user, auth.token()).await?;

    Ok(Json(json!(payment)))
}

#[axum::debug_handler]
pub async fn payment_history(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state);
    let payments = service.history(&user, auth.token()).await?;

    let total = payments.len();
    Ok(Json(json!({
        "payments": payments,
        "total": total,
    })))
}

#[axum::debug_handler]
pub async fn refund_payment(
    State(state): State<Arc<AppConfig>>,
    Path(payment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RefundPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only administrators can refund payments".to_string(),
        ));
    }

    let service = PaymentService::new(&state);
    let payment = service.refund(payment_id, request, auth.token()).await?;

    notify_parties(&state, &payment, |p| NotificationEvent::PaymentRefunded {
        amount: p.amount,
        currency: p.currency.to_string(),
    })
    .await;

    Ok(Json(json!(payment)))
}
