use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::Conflict(msg) => AppError::Conflict(msg),
            ScheduleError::Database(msg) => AppError::Database(msg),
        }
    }
}
