pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod time;

pub use error::ScheduleError;
pub use models::*;
pub use services::availability::{
    can_request_vacation, day_availability, day_availability_with, is_slot_available,
    AppointmentLookup,
};
pub use time::{TimeOfDay, DEFAULT_SLOT_MINUTES};
