use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a notification goes. SMS needs a phone number; email is sent
/// only when an address is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Recipient {
    pub fn sms_only(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            email: None,
        }
    }

    pub fn new(phone: impl Into<String>, email: Option<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            email,
        }
    }
}

/// Typed notification events. Each variant carries exactly the data its
/// templates need.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    PatientAccountCreation { otp: String },
    DoctorAccountCreation { temporary_password: String },
    AdminAccountCreation { otp: String },
    OtpVerification { otp: String },
    AppointmentCreated { counterpart_name: String, date: NaiveDate, start_time: String },
    AppointmentConfirmed { date: NaiveDate, start_time: String },
    AppointmentCancelled { date: NaiveDate, start_time: String, reason: String },
    AppointmentCompleted { date: NaiveDate },
    PaymentReceived { amount: f64, currency: String },
    PaymentFailed { amount: f64, currency: String },
    PaymentRefunded { amount: f64, currency: String },
    VacationRequest { doctor_name: String, start_date: NaiveDate, end_date: NaiveDate, reason: String },
    VacationResponse { approved: bool, start_date: NaiveDate, end_date: NaiveDate, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// A rendered notification: an SMS body, plus an optional email.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sms: String,
    pub email: Option<EmailMessage>,
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::PatientAccountCreation { .. } => "PATIENT_ACCOUNT_CREATION",
            NotificationEvent::DoctorAccountCreation { .. } => "DOCTOR_ACCOUNT_CREATION",
            NotificationEvent::AdminAccountCreation { .. } => "ADMIN_ACCOUNT_CREATION",
            NotificationEvent::OtpVerification { .. } => "OTP_VERIFICATION",
            NotificationEvent::AppointmentCreated { .. } => "APPOINTMENT_CREATED",
            NotificationEvent::AppointmentConfirmed { .. } => "APPOINTMENT_CONFIRMED",
            NotificationEvent::AppointmentCancelled { .. } => "APPOINTMENT_CANCELLED",
            NotificationEvent::AppointmentCompleted { .. } => "APPOINTMENT_COMPLETED",
            NotificationEvent::PaymentReceived { .. } => "PAYMENT_RECEIVED",
            NotificationEvent::PaymentFailed { .. } => "PAYMENT_FAILED",
            NotificationEvent::PaymentRefunded { .. } => "PAYMENT_REFUNDED",
            NotificationEvent::VacationRequest { .. } => "VACATION_REQUEST",
            NotificationEvent::VacationResponse { .. } => "VACATION_RESPONSE",
        }
    }

    /// Render the SMS and email bodies for this event.
    pub fn render(&self) -> Message {
        match self {
            NotificationEvent::PatientAccountCreation { otp } => Message {
                sms: format!(
                    "Welcome to CareLink! Your verification code is: {}. It expires in 10 minutes.",
                    otp
                ),
                email: Some(EmailMessage {
                    subject: "Welcome to CareLink - verify your account".to_string(),
                    body: format!(
                        "Welcome to CareLink!\n\nYour verification code is: {}\nIt expires in 10 minutes.",
                        otp
                    ),
                }),
            },
            NotificationEvent::DoctorAccountCreation { temporary_password } => Message {
                sms: format!(
                    "Welcome to CareLink! Your temporary password is: {}. Please change it at your first login.",
                    temporary_password
                ),
                email: Some(EmailMessage {
                    subject: "Welcome to CareLink - your doctor account".to_string(),
                    body: format!(
                        "Welcome to CareLink!\n\nYour doctor account has been created.\nTemporary password: {}\nPlease change it at your first login.",
                        temporary_password
                    ),
                }),
            },
            NotificationEvent::AdminAccountCreation { otp } => Message {
                sms: format!(
                    "Welcome to CareLink Admin! Your verification code is: {}. It expires in 10 minutes.",
                    otp
                ),
                email: Some(EmailMessage {
                    subject: "Welcome to CareLink Admin - verify your account".to_string(),
                    body: format!(
                        "Welcome to CareLink Admin!\n\nYour verification code is: {}\nIt expires in 10 minutes.",
                        otp
                    ),
                }),
            },
            NotificationEvent::OtpVerification { otp } => Message {
                sms: format!(
                    "Your CareLink verification code is: {}. It expires in 10 minutes.",
                    otp
                ),
                email: Some(EmailMessage {
                    subject: "Your CareLink verification code".to_string(),
                    body: format!("Your verification code is: {}\nIt expires in 10 minutes.", otp),
                }),
            },
            NotificationEvent::AppointmentCreated { counterpart_name, date, start_time } => {
                Message {
                    sms: format!(
                        "New CareLink appointment with {} on {} at {}.",
                        counterpart_name, date, start_time
                    ),
                    email: Some(EmailMessage {
                        subject: "New CareLink appointment".to_string(),
                        body: format!(
                            "A new appointment has been booked with {} on {} at {}.",
                            counterpart_name, date, start_time
                        ),
                    }),
                }
            }
            NotificationEvent::AppointmentConfirmed { date, start_time } => Message {
                sms: format!(
                    "Your CareLink appointment on {} at {} has been confirmed.",
                    date, start_time
                ),
                email: Some(EmailMessage {
                    subject: "Appointment confirmed - CareLink".to_string(),
                    body: format!(
                        "Your appointment on {} at {} has been confirmed.",
                        date, start_time
                    ),
                }),
            },
            NotificationEvent::AppointmentCancelled { date, start_time, reason } => Message {
                sms: format!(
                    "Your CareLink appointment on {} at {} was cancelled. Reason: {}",
                    date, start_time, reason
                ),
                email: Some(EmailMessage {
                    subject: "Appointment cancelled - CareLink".to_string(),
                    body: format!(
                        "Your appointment on {} at {} was cancelled.\nReason: {}",
                        date, start_time, reason
                    ),
                }),
            },
            NotificationEvent::AppointmentCompleted { date } => Message {
                sms: format!("Your CareLink appointment on {} is completed. Thank you!", date),
                email: None,
            },
            NotificationEvent::PaymentReceived { amount, currency } => Message {
                sms: format!("CareLink: payment of {:.2} {} received.", amount, currency),
                email: Some(EmailMessage {
                    subject: "Payment received - CareLink".to_string(),
                    body: format!("Your payment of {:.2} {} has been received.", amount, currency),
                }),
            },
            NotificationEvent::PaymentFailed { amount, currency } => Message {
                sms: format!("CareLink: payment of {:.2} {} failed. Please try again.", amount, currency),
                email: Some(EmailMessage {
                    subject: "Payment failed - CareLink".to_string(),
                    body: format!("Your payment of {:.2} {} could not be processed.", amount, currency),
                }),
            },
            NotificationEvent::PaymentRefunded { amount, currency } => Message {
                sms: format!("CareLink: {:.2} {} has been refunded to you.", amount, currency),
                email: Some(EmailMessage {
                    subject: "Payment refunded - CareLink".to_string(),
                    body: format!("A refund of {:.2} {} has been issued.", amount, currency),
                }),
            },
            NotificationEvent::VacationRequest { doctor_name, start_date, end_date, reason } => {
                Message {
                    sms: format!(
                        "New vacation request from Dr. {} from {} to {}. Reason: {}",
                        doctor_name, start_date, end_date, reason
                    ),
                    email: Some(EmailMessage {
                        subject: "New vacation request".to_string(),
                        body: format!(
                            "Dr. {} requested a vacation from {} to {}.\n\nReason: {}\n\nPlease handle this request in the admin panel.",
                            doctor_name, start_date, end_date, reason
                        ),
                    }),
                }
            }
            NotificationEvent::VacationResponse { approved, start_date, end_date, reason } => {
                let outcome = if *approved { "approved" } else { "rejected" };
                Message {
                    sms: format!(
                        "Your vacation request from {} to {} has been {}.",
                        start_date, end_date, outcome
                    ),
                    email: Some(EmailMessage {
                        subject: format!("Vacation request {}", outcome),
                        body: format!(
                            "Your vacation request from {} to {} has been {}.\n\nReason: {}",
                            start_date, end_date, outcome, reason
                        ),
                    }),
                }
            }
        }
    }
}
