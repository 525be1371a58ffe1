use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Pending => write!(f, "pending"),
            RegistrationStatus::Approved => write!(f, "approved"),
            RegistrationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Role payload for a doctor account. The base identity (phone, name,
/// password) lives on the account row; this carries the professional
/// profile and the admin approval state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub location: Option<DoctorLocation>,
    pub registration_status: RegistrationStatus,
    #[serde(default)]
    pub approved_by: Option<Uuid>,
    #[serde(default)]
    pub approval_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub password_changed: bool,
    #[serde(default)]
    pub rating_average: f32,
    #[serde(default)]
    pub rating_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub phone: String,
    #[serde(default = "default_country")]
    pub country_code: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub specialization: String,
    pub license_number: String,
    pub consultation_fee: f64,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub location: Option<DoctorLocation>,
}

fn default_country() -> String {
    "CD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationDecisionRequest {
    pub status: RegistrationStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub max_distance_km: Option<f64>,
    pub limit: Option<usize>,
}

/// Public listing entry: profile plus the account's display name, with
/// the distance filled in when the search carried coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub account_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub consultation_fee: f64,
    pub languages: Vec<String>,
    pub rating_average: f32,
    pub rating_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<DoctorLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl DoctorSummary {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
