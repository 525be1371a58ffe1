use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::time::{DayOfWeek, TimeOfDay};

// ==============================================================================
// SCHEDULE ENTITY
// ==============================================================================

/// A single working interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl DayHours {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start >= self.end {
            return Err(ScheduleError::Validation(format!(
                "Start time must be before end time ({} >= {})",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, start: TimeOfDay, end: TimeOfDay) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Weekly working hours: at most one interval per weekday. A missing
/// entry means the doctor does not work that day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DayHours>,
}

impl WeekHours {
    pub fn get(&self, day: DayOfWeek) -> Option<&DayHours> {
        match day {
            DayOfWeek::Monday => self.monday.as_ref(),
            DayOfWeek::Tuesday => self.tuesday.as_ref(),
            DayOfWeek::Wednesday => self.wednesday.as_ref(),
            DayOfWeek::Thursday => self.thursday.as_ref(),
            DayOfWeek::Friday => self.friday.as_ref(),
            DayOfWeek::Saturday => self.saturday.as_ref(),
            DayOfWeek::Sunday => self.sunday.as_ref(),
        }
    }

    pub fn set(&mut self, day: DayOfWeek, hours: Option<DayHours>) {
        match day {
            DayOfWeek::Monday => self.monday = hours,
            DayOfWeek::Tuesday => self.tuesday = hours,
            DayOfWeek::Wednesday => self.wednesday = hours,
            DayOfWeek::Thursday => self.thursday = hours,
            DayOfWeek::Friday => self.friday = hours,
            DayOfWeek::Saturday => self.saturday = hours,
            DayOfWeek::Sunday => self.sunday = hours,
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for day in [
            DayOfWeek::Monday,
            DayOfWeek::Tuesday,
            DayOfWeek::Wednesday,
            DayOfWeek::Thursday,
            DayOfWeek::Friday,
            DayOfWeek::Saturday,
            DayOfWeek::Sunday,
        ] {
            if let Some(hours) = self.get(day) {
                hours.validate().map_err(|e| {
                    ScheduleError::Validation(format!("Working hours for {}: {}", day, e))
                })?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Lunch,
    Break,
    Other,
}

impl Default for BreakKind {
    fn default() -> Self {
        BreakKind::Break
    }
}

/// A break recurring weekly on `day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBreak {
    pub day: DayOfWeek,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub kind: BreakKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ScheduleBreak {
    /// A break must be a well-formed interval inside that weekday's
    /// working hours.
    pub fn validate(&self, working_hours: &WeekHours) -> Result<(), ScheduleError> {
        if self.start >= self.end {
            return Err(ScheduleError::Validation(format!(
                "Break start must be before break end ({} >= {})",
                self.start, self.end
            )));
        }

        match working_hours.get(self.day) {
            None => Err(ScheduleError::Validation(format!(
                "Cannot add a break on {}: no working hours defined for that day",
                self.day
            ))),
            Some(hours) if !hours.contains(self.start, self.end) => {
                Err(ScheduleError::Validation(format!(
                    "Break {}-{} falls outside working hours {}-{} on {}",
                    self.start, self.end, hours.start, hours.end, self.day
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

/// A day off. Non-recurring holidays match their exact calendar date;
/// recurring holidays match the same month and day every year (a
/// recurring Feb 29 entry only matches in leap years).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub is_recurring: bool,
}

impl Holiday {
    pub fn matches(&self, date: NaiveDate) -> bool {
        if self.is_recurring {
            self.date.month() == date.month() && self.date.day() == date.day()
        } else {
            self.date == date
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for VacationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VacationStatus::Pending => write!(f, "pending"),
            VacationStatus::Approved => write!(f, "approved"),
            VacationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A vacation request. Only `approved` vacations block availability;
/// `pending` and `rejected` ones never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vacation {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: VacationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_date: Option<DateTime<Utc>>,
}

impl Vacation {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.status == VacationStatus::Approved
            && self.start_date <= date
            && date <= self.end_date
    }

    pub fn is_resolved(&self) -> bool {
        self.status != VacationStatus::Pending
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.end_date < self.start_date {
            return Err(ScheduleError::Validation(format!(
                "Vacation end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

/// One schedule per doctor: working hours, recurring breaks, holidays
/// and vacation ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSchedule {
    pub doctor_id: Uuid,
    #[serde(default)]
    pub working_hours: WeekHours,
    #[serde(default)]
    pub breaks: Vec<ScheduleBreak>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub vacations: Vec<Vacation>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorSchedule {
    /// Check every structural invariant before the schedule is persisted.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.working_hours.validate()?;

        for entry in &self.breaks {
            entry.validate(&self.working_hours)?;
        }

        for vacation in &self.vacations {
            vacation.validate()?;
        }

        Ok(())
    }

    pub fn breaks_on(&self, day: DayOfWeek) -> impl Iterator<Item = &ScheduleBreak> {
        self.breaks.iter().filter(move |b| b.day == day)
    }

    pub fn vacation_mut(&mut self, vacation_id: Uuid) -> Option<&mut Vacation> {
        self.vacations.iter_mut().find(|v| v.id == vacation_id)
    }
}

/// A bookable slot, as produced by day availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertScheduleRequest {
    #[serde(default)]
    pub working_hours: WeekHours,
    #[serde(default)]
    pub breaks: Vec<ScheduleBreak>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWorkingHoursRequest {
    pub day: DayOfWeek,
    pub hours: Option<DayHours>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVacationRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacationDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveVacationRequest {
    pub status: VacationDecision,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotCheckQuery {
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

