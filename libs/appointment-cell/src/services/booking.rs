use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::models::DoctorSchedule;
use schedule_cell::services::availability::is_slot_available;
use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::account::AccountContact;
use shared_models::auth::User;

use crate::models::{
    Appointment, AppointmentError, AppointmentPaymentStatus, AppointmentStatus,
    BookAppointmentRequest,
};

pub struct BookingService {
    db: PostgrestClient,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Book a slot for a patient. The slot must pass the availability
    /// engine and must not collide with another active appointment.
    pub async fn book(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking {} {}-{} with doctor {}",
            request.date, request.start_time, request.end_time, request.doctor_id
        );

        if request.start_time >= request.end_time {
            return Err(AppointmentError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }

        // The doctor must exist and be approved.
        let profiles: Vec<Value> = self
            .db
            .select(
                &format!(
                    "/rest/v1/doctor_profiles?account_id=eq.{}&registration_status=eq.approved",
                    request.doctor_id
                ),
                Some(auth_token),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;
        let Some(profile) = profiles.first() else {
            return Err(AppointmentError::NotFound("Doctor not found".to_string()));
        };
        let consultation_fee = profile["consultation_fee"].as_f64();

        // The schedule decides whether the slot is bookable at all.
        let schedule = self.get_schedule(request.doctor_id, auth_token).await?;
        if !is_slot_available(&schedule, request.date, request.start_time, request.end_time) {
            return Err(AppointmentError::Conflict(
                "The requested slot is not available".to_string(),
            ));
        }

        // No double booking against other active appointments.
        let existing = self
            .appointments_on(request.doctor_id, request.date, auth_token)
            .await?;
        let collision = existing.iter().any(|appt| {
            appt.status.is_active() && appt.overlaps(request.start_time, request.end_time)
        });
        if collision {
            warn!(
                "Double booking attempt for doctor {} on {}",
                request.doctor_id, request.date
            );
            return Err(AppointmentError::Conflict(
                "This slot is already booked".to_string(),
            ));
        }

        let now = Utc::now();
        self.db
            .insert_returning(
                "/rest/v1/appointments",
                Some(auth_token),
                json!({
                    "id": Uuid::new_v4(),
                    "patient_id": patient_id,
                    "doctor_id": request.doctor_id,
                    "date": request.date,
                    "start_time": request.start_time,
                    "end_time": request.end_time,
                    "status": AppointmentStatus::Pending,
                    "kind": request.kind,
                    "reason": request.reason,
                    "notes": request.notes,
                    "payment_status": AppointmentPaymentStatus::Pending,
                    "payment_amount": consultation_fee,
                    "created_at": now.to_rfc3339(),
                    "updated_at": now.to_rfc3339(),
                }),
            )
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    /// Doctor accepts a pending appointment.
    pub async fn confirm(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if user.id != appointment.doctor_id.to_string() {
            return Err(AppointmentError::Forbidden(
                "Only the doctor can confirm this appointment".to_string(),
            ));
        }
        if appointment.status != AppointmentStatus::Pending {
            return Err(AppointmentError::Conflict(format!(
                "A {} appointment cannot be confirmed",
                appointment.status
            )));
        }

        self.set_fields(
            appointment_id,
            json!({
                "status": AppointmentStatus::Confirmed,
                "updated_at": Utc::now().to_rfc3339(),
            }),
            auth_token,
        )
        .await
    }

    /// Either party cancels, while the appointment is still active and
    /// far enough away.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        user: &User,
        reason: String,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        let is_party = user.id == appointment.patient_id.to_string()
            || user.id == appointment.doctor_id.to_string();
        if !is_party && !user.is_admin() {
            return Err(AppointmentError::Forbidden(
                "Not authorized to cancel this appointment".to_string(),
            ));
        }

        if !appointment.can_be_cancelled(Utc::now()) {
            return Err(AppointmentError::Conflict(
                "This appointment can no longer be cancelled".to_string(),
            ));
        }

        let cancelled_by = Uuid::parse_str(&user.id)
            .map_err(|_| AppointmentError::Validation("Invalid user id".to_string()))?;

        self.set_fields(
            appointment_id,
            json!({
                "status": AppointmentStatus::Cancelled,
                "cancellation_reason": reason,
                "cancelled_by": cancelled_by,
                "cancellation_date": Utc::now().to_rfc3339(),
                "updated_at": Utc::now().to_rfc3339(),
            }),
            auth_token,
        )
        .await
    }

    /// Doctor closes out a confirmed appointment.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if user.id != appointment.doctor_id.to_string() {
            return Err(AppointmentError::Forbidden(
                "Only the doctor can complete this appointment".to_string(),
            ));
        }
        if appointment.status != AppointmentStatus::Confirmed {
            return Err(AppointmentError::Conflict(format!(
                "A {} appointment cannot be completed",
                appointment.status
            )));
        }

        self.set_fields(
            appointment_id,
            json!({
                "status": AppointmentStatus::Completed,
                "updated_at": Utc::now().to_rfc3339(),
            }),
            auth_token,
        )
        .await
    }

    /// The caller's appointments: own bookings for patients, own agenda
    /// for doctors, everything for admins.
    pub async fn list_for_user(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = if user.is_doctor() {
            format!("doctor_id=eq.{}&", user.id)
        } else if user.is_patient() {
            format!("patient_id=eq.{}&", user.id)
        } else {
            String::new()
        };

        let path = format!(
            "/rest/v1/appointments?{}order=date.asc,start_time.asc",
            filter
        );
        self.db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows: Vec<Appointment> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| AppointmentError::NotFound("Appointment not found".to_string()))
    }

    pub async fn contact(
        &self,
        account_id: Uuid,
        auth_token: &str,
    ) -> Result<AccountContact, AppointmentError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", account_id);
        let mut rows: Vec<AccountContact> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| AppointmentError::NotFound("Account not found".to_string()))
    }

    async fn get_schedule(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorSchedule, AppointmentError> {
        let path = format!("/rest/v1/doctor_schedules?doctor_id=eq.{}", doctor_id);
        let mut rows: Vec<DoctorSchedule> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.pop().ok_or_else(|| {
            AppointmentError::Validation("This doctor has not published a schedule".to_string())
        })
    }

    async fn appointments_on(
        &self,
        doctor_id: Uuid,
        date: chrono::NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&order=start_time.asc",
            doctor_id, date
        );
        self.db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))
    }

    async fn set_fields(
        &self,
        appointment_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows: Vec<Appointment> = self
            .db
            .patch_returning(&path, Some(auth_token), body)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| AppointmentError::NotFound("Appointment not found".to_string()))
    }
}
