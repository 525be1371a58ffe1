pub mod models;
pub mod services;

pub use models::{EmailMessage, Message, NotificationEvent, Recipient};
pub use services::notification::NotificationService;
