//! The availability engine: pure computation over an in-memory
//! `DoctorSchedule` snapshot. No I/O happens here; the only external
//! dependency is the `AppointmentLookup` capability used by vacation
//! requests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{DoctorSchedule, Slot};
use crate::time::{intervals_overlap, DayOfWeek, TimeOfDay, DEFAULT_SLOT_MINUTES};

/// Capability for counting appointments that would block a vacation.
/// Implementations count appointments in `pending` or `confirmed` status
/// whose date falls inside the inclusive range.
#[async_trait]
pub trait AppointmentLookup: Send + Sync {
    async fn count_blocking(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<usize>;
}

/// True when the whole day is off: inactive schedule, a matching holiday,
/// or an approved vacation covering the date.
fn day_is_blocked(schedule: &DoctorSchedule, date: NaiveDate) -> bool {
    if !schedule.is_active {
        return true;
    }

    if schedule.holidays.iter().any(|h| h.matches(date)) {
        return true;
    }

    schedule.vacations.iter().any(|v| v.covers(date))
}

/// Decide whether the `[start, end)` interval on `date` is bookable.
///
/// Checks run in order and short-circuit: holiday, approved vacation,
/// working hours for the weekday, containment in working hours, and
/// overlap with any break recurring that weekday. "Not available" is a
/// normal `false`, never an error.
pub fn is_slot_available(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    start: TimeOfDay,
    end: TimeOfDay,
) -> bool {
    if day_is_blocked(schedule, date) {
        return false;
    }

    let day = DayOfWeek::from_date(date);

    let Some(hours) = schedule.working_hours.get(day) else {
        return false;
    };

    if !hours.contains(start, end) {
        return false;
    }

    !schedule
        .breaks_on(day)
        .any(|b| intervals_overlap(start, end, b.start, b.end))
}

/// All bookable slots of the default length for `date`, in order.
pub fn day_availability(schedule: &DoctorSchedule, date: NaiveDate) -> Vec<Slot> {
    day_availability_with(schedule, date, DEFAULT_SLOT_MINUTES)
}

/// All bookable `slot_minutes`-long slots for `date`.
///
/// If the day as a whole is off (holiday, approved vacation, inactive
/// schedule) or the weekday has no working hours, the result is empty.
/// Otherwise slots step from the start of working hours; a candidate is
/// kept when it fits before the end of working hours and overlaps no
/// break. The trailing partial slot is dropped.
pub fn day_availability_with(
    schedule: &DoctorSchedule,
    date: NaiveDate,
    slot_minutes: u16,
) -> Vec<Slot> {
    if slot_minutes == 0 || day_is_blocked(schedule, date) {
        return Vec::new();
    }

    let day = DayOfWeek::from_date(date);

    let Some(hours) = schedule.working_hours.get(day) else {
        return Vec::new();
    };

    let day_breaks: Vec<_> = schedule.breaks_on(day).collect();

    let mut slots = Vec::new();
    let mut cursor = hours.start;

    while let Some(slot_end) = cursor.add_minutes(slot_minutes) {
        if slot_end > hours.end {
            break;
        }

        let on_break = day_breaks
            .iter()
            .any(|b| intervals_overlap(cursor, slot_end, b.start, b.end));

        if !on_break {
            slots.push(Slot {
                start: cursor,
                end: slot_end,
            });
        }

        cursor = slot_end;
    }

    slots
}

/// Whether a vacation over the inclusive date range may be requested:
/// true iff no pending or confirmed appointment falls inside it.
pub async fn can_request_vacation(
    lookup: &dyn AppointmentLookup,
    doctor_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<bool> {
    let blocking = lookup
        .count_blocking(doctor_id, start_date, end_date)
        .await?;
    Ok(blocking == 0)
}
