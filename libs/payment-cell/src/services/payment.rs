use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentPaymentStatus};
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::auth::User;

use crate::models::{
    CreatePaymentRequest, Payment, PaymentError, PaymentStatus, RefundPaymentRequest,
};

pub struct PaymentService {
    db: PostgrestClient,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Record and "process" a payment for an appointment. Gateway
    /// integration is a stub: processing always succeeds and yields a
    /// generated transaction id.
    pub async fn create_payment(
        &self,
        appointment_id: Uuid,
        request: CreatePaymentRequest,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        debug!("Creating payment for appointment {}", appointment_id);

        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        let existing: Vec<Value> = self
            .db
            .select(
                &format!("/rest/v1/payments?appointment_id=eq.{}", appointment_id),
                Some(auth_token),
            )
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;
        if !existing.is_empty() {
            return Err(PaymentError::Conflict(
                "A payment already exists for this appointment".to_string(),
            ));
        }

        let amount = request
            .amount
            .or(appointment.payment_amount)
            .ok_or_else(|| PaymentError::Validation("No payment amount available".to_string()))?;
        if amount < 0.0 {
            return Err(PaymentError::Validation(
                "Amount cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        // Stub processing: the payment is completed on the spot.
        let transaction_id = format!("TRX-{}", Uuid::new_v4().simple());
        info!(
            "Processed payment of {} for appointment {} ({})",
            amount, appointment_id, transaction_id
        );

        let payment: Payment = self
            .db
            .insert_returning(
                "/rest/v1/payments",
                Some(auth_token),
                json!({
                    "id": Uuid::new_v4(),
                    "appointment_id": appointment_id,
                    "patient_id": appointment.patient_id,
                    "doctor_id": appointment.doctor_id,
                    "amount": amount,
                    "currency": request.currency.unwrap_or_default(),
                    "status": PaymentStatus::Completed,
                    "method": request.method,
                    "transaction_id": transaction_id,
                    "payment_date": now.to_rfc3339(),
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;

        self.set_appointment_payment_status(
            appointment_id,
            AppointmentPaymentStatus::Paid,
            auth_token,
        )
        .await?;

        Ok(payment)
    }

    /// Refund a completed payment inside the refund window.
    pub async fn refund(
        &self,
        payment_id: Uuid,
        request: RefundPaymentRequest,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        let payment = self.get_payment_row(payment_id, auth_token).await?;

        if !payment.can_be_refunded(Utc::now()) {
            return Err(PaymentError::Conflict(
                "This payment cannot be refunded".to_string(),
            ));
        }

        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let mut rows: Vec<Payment> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({
                    "status": PaymentStatus::Refunded,
                    "refund_date": Utc::now().to_rfc3339(),
                    "refund_reason": request.reason,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;

        let refunded = rows
            .pop()
            .ok_or_else(|| PaymentError::NotFound("Payment not found".to_string()))?;

        self.set_appointment_payment_status(
            refunded.appointment_id,
            AppointmentPaymentStatus::Refunded,
            auth_token,
        )
        .await?;

        Ok(refunded)
    }

    /// Fetch one payment, visible to its patient, its doctor, or an
    /// admin.
    pub async fn get_payment(
        &self,
        payment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        let payment = self.get_payment_row(payment_id, auth_token).await?;

        let is_party = user.id == payment.patient_id.to_string()
            || user.id == payment.doctor_id.to_string();
        if !is_party && !user.is_admin() {
            return Err(PaymentError::Forbidden(
                "Not authorized to view this payment".to_string(),
            ));
        }

        Ok(payment)
    }

    /// Payment history scoped by role.
    pub async fn history(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Payment>, PaymentError> {
        let filter = if user.is_doctor() {
            format!("doctor_id=eq.{}&", user.id)
        } else if user.is_patient() {
            format!("patient_id=eq.{}&", user.id)
        } else {
            String::new()
        };

        let path = format!("/rest/v1/payments?{}order=created_at.desc", filter);
        self.db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))
    }

    async fn get_payment_row(
        &self,
        payment_id: Uuid,
        auth_token: &str,
    ) -> Result<Payment, PaymentError> {
        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let mut rows: Vec<Payment> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| PaymentError::NotFound("Payment not found".to_string()))
    }

    async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, PaymentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows: Vec<Appointment> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| PaymentError::NotFound("Appointment not found".to_string()))
    }

    async fn set_appointment_payment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentPaymentStatus,
        auth_token: &str,
    ) -> Result<(), PaymentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let _: Vec<Value> = self
            .db
            .patch_returning(
                &path,
                Some(auth_token),
                json!({
                    "payment_status": status,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| PaymentError::Database(e.to_string()))?;
        Ok(())
    }
}
