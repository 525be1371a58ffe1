use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;
use shared_models::account::AccountContact;

use crate::error::ScheduleError;
use crate::models::{
    DoctorSchedule, Holiday, RequestVacationRequest, ScheduleBreak, SetWorkingHoursRequest,
    UpsertScheduleRequest, Vacation, VacationDecision, VacationStatus,
};
use crate::services::availability::{can_request_vacation, AppointmentLookup};

/// Counts blocking appointments through the data API. The engine only
/// sees the `AppointmentLookup` trait; this is the production
/// implementation of it.
pub struct PostgrestAppointmentLookup<'a> {
    db: &'a PostgrestClient,
    auth_token: &'a str,
}

impl<'a> PostgrestAppointmentLookup<'a> {
    pub fn new(db: &'a PostgrestClient, auth_token: &'a str) -> Self {
        Self { db, auth_token }
    }
}

#[async_trait]
impl AppointmentLookup for PostgrestAppointmentLookup<'_> {
    async fn count_blocking(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=gte.{}&date=lte.{}&status=in.(pending,confirmed)",
            doctor_id, start_date, end_date
        );
        let rows: Vec<Value> = self.db.select(&path, Some(self.auth_token)).await?;
        Ok(rows.len())
    }
}

pub struct ScheduleService {
    db: PostgrestClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    pub fn db(&self) -> &PostgrestClient {
        &self.db
    }

    pub async fn get_schedule(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!("Fetching schedule for doctor {}", doctor_id);

        let path = format!("/rest/v1/doctor_schedules?doctor_id=eq.{}", doctor_id);
        let mut rows: Vec<DoctorSchedule> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        rows.pop().ok_or_else(|| {
            ScheduleError::NotFound(format!("No schedule found for doctor {}", doctor_id))
        })
    }

    /// Create a doctor's schedule, or replace its working hours, breaks
    /// and holidays. Vacations are never replaced wholesale; they only
    /// change through the request/resolve flow.
    pub async fn upsert_schedule(
        &self,
        doctor_id: Uuid,
        request: UpsertScheduleRequest,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        debug!("Upserting schedule for doctor {}", doctor_id);

        match self.get_schedule(doctor_id, auth_token).await {
            Ok(mut existing) => {
                let loaded_at = existing.updated_at;
                existing.working_hours = request.working_hours;
                existing.breaks = request.breaks;
                existing.holidays = request.holidays;
                if let Some(is_active) = request.is_active {
                    existing.is_active = is_active;
                }
                existing.validate()?;
                self.save(&existing, loaded_at, auth_token).await
            }
            Err(ScheduleError::NotFound(_)) => {
                let now = Utc::now();
                let schedule = DoctorSchedule {
                    doctor_id,
                    working_hours: request.working_hours,
                    breaks: request.breaks,
                    holidays: request.holidays,
                    vacations: Vec::new(),
                    is_active: request.is_active.unwrap_or(true),
                    created_at: now,
                    updated_at: now,
                };
                schedule.validate()?;

                let body = serde_json::to_value(&schedule)
                    .map_err(|e| ScheduleError::Database(e.to_string()))?;
                self.db
                    .insert_returning("/rest/v1/doctor_schedules", Some(auth_token), body)
                    .await
                    .map_err(|e| ScheduleError::Database(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn set_working_hours(
        &self,
        doctor_id: Uuid,
        request: SetWorkingHoursRequest,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        let mut schedule = self.get_schedule(doctor_id, auth_token).await?;
        let loaded_at = schedule.updated_at;

        schedule.working_hours.set(request.day, request.hours);
        // Removing or shrinking hours may orphan existing breaks.
        schedule.validate()?;

        self.save(&schedule, loaded_at, auth_token).await
    }

    pub async fn add_break(
        &self,
        doctor_id: Uuid,
        entry: ScheduleBreak,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        let mut schedule = self.get_schedule(doctor_id, auth_token).await?;
        let loaded_at = schedule.updated_at;

        entry.validate(&schedule.working_hours)?;
        schedule.breaks.push(entry);

        self.save(&schedule, loaded_at, auth_token).await
    }

    pub async fn add_holiday(
        &self,
        doctor_id: Uuid,
        holiday: Holiday,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        let mut schedule = self.get_schedule(doctor_id, auth_token).await?;
        let loaded_at = schedule.updated_at;

        schedule.holidays.push(holiday);

        self.save(&schedule, loaded_at, auth_token).await
    }

    /// Append a pending vacation, unless a pending or confirmed
    /// appointment already falls inside the requested range.
    pub async fn request_vacation(
        &self,
        doctor_id: Uuid,
        request: RequestVacationRequest,
        lookup: &dyn AppointmentLookup,
        auth_token: &str,
    ) -> Result<(DoctorSchedule, Vacation), ScheduleError> {
        let mut schedule = self.get_schedule(doctor_id, auth_token).await?;
        let loaded_at = schedule.updated_at;

        let vacation = Vacation {
            id: Uuid::new_v4(),
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
            status: VacationStatus::Pending,
            approved_by: None,
            approval_date: None,
        };
        vacation.validate()?;

        let allowed =
            can_request_vacation(lookup, doctor_id, request.start_date, request.end_date)
                .await
                .map_err(|e| ScheduleError::Database(e.to_string()))?;
        if !allowed {
            return Err(ScheduleError::Conflict(
                "Appointments already exist during the requested period".to_string(),
            ));
        }

        schedule.vacations.push(vacation.clone());
        let saved = self.save(&schedule, loaded_at, auth_token).await?;

        Ok((saved, vacation))
    }

    /// Transition a vacation out of `pending`, exactly once.
    pub async fn resolve_vacation(
        &self,
        doctor_id: Uuid,
        vacation_id: Uuid,
        decision: VacationDecision,
        admin_id: Uuid,
        auth_token: &str,
    ) -> Result<(DoctorSchedule, Vacation), ScheduleError> {
        let mut schedule = self.get_schedule(doctor_id, auth_token).await?;
        let loaded_at = schedule.updated_at;

        let vacation = schedule.vacation_mut(vacation_id).ok_or_else(|| {
            ScheduleError::NotFound(format!("No vacation request {}", vacation_id))
        })?;

        if vacation.is_resolved() {
            return Err(ScheduleError::Conflict(format!(
                "Vacation request {} is already {}",
                vacation_id, vacation.status
            )));
        }

        vacation.status = match decision {
            VacationDecision::Approved => VacationStatus::Approved,
            VacationDecision::Rejected => VacationStatus::Rejected,
        };
        vacation.approved_by = Some(admin_id);
        vacation.approval_date = Some(Utc::now());
        let resolved = vacation.clone();

        let saved = self.save(&schedule, loaded_at, auth_token).await?;

        Ok((saved, resolved))
    }

    /// Contact info for a schedule's doctor, used by the caller when it
    /// emits notifications.
    pub async fn doctor_contact(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<AccountContact, ScheduleError> {
        let path = format!("/rest/v1/accounts?id=eq.{}", doctor_id);
        let mut rows: Vec<AccountContact> = self
            .db
            .select(&path, Some(auth_token))
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        rows.pop()
            .ok_or_else(|| ScheduleError::NotFound(format!("No account for doctor {}", doctor_id)))
    }

    /// Compare-and-swap write: the PATCH is filtered on the `updated_at`
    /// value read at load time, so a concurrent writer makes this match
    /// zero rows and the caller sees a conflict instead of losing the
    /// other update.
    async fn save(
        &self,
        schedule: &DoctorSchedule,
        loaded_updated_at: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<DoctorSchedule, ScheduleError> {
        // The Z suffix keeps the filter value free of `+`, which would
        // decode as a space inside the query string.
        let path = format!(
            "/rest/v1/doctor_schedules?doctor_id=eq.{}&updated_at=eq.{}",
            schedule.doctor_id,
            loaded_updated_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        );

        let body = json!({
            "working_hours": schedule.working_hours,
            "breaks": schedule.breaks,
            "holidays": schedule.holidays,
            "vacations": schedule.vacations,
            "is_active": schedule.is_active,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut rows: Vec<DoctorSchedule> = self
            .db
            .patch_returning(&path, Some(auth_token), body)
            .await
            .map_err(|e| ScheduleError::Database(e.to_string()))?;

        rows.pop().ok_or_else(|| {
            ScheduleError::Conflict(
                "Schedule was modified concurrently, please retry".to_string(),
            )
        })
    }
}
