use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_api_url: String,
    pub database_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            database_api_url: "http://localhost:54321".to_string(),
            database_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_api_url: self.database_api_url.clone(),
            database_anon_key: self.database_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            sms_api_url: String::new(),
            sms_api_token: String::new(),
            sms_from: "CareLink".to_string(),
            email_api_url: String::new(),
            email_api_token: String::new(),
            email_from: "no-reply@carelink.example".to_string(),
            admin_phone: "+243810000000".to_string(),
            admin_email: "admin@carelink.example".to_string(),
        }
    }

    pub fn with_database_url(url: &str) -> AppConfig {
        let mut config = Self::default().to_app_config();
        config.database_api_url = url.to_string();
        config
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub phone: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone: "+243810000001".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(phone: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(phone: &str) -> Self {
        Self::new(phone, "doctor")
    }

    pub fn patient(phone: &str) -> Self {
        Self::new(phone, "patient")
    }

    pub fn admin(phone: &str) -> Self {
        Self::new(phone, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            phone: Some(self.phone.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "phone": user.phone,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockApiResponses;

impl MockApiResponses {
    pub fn account_response(id: &str, phone: &str, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "phone": phone,
            "password_hash": "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHQ$hash",
            "role": role,
            "first_name": "Test",
            "last_name": "User",
            "email": "test@example.com",
            "is_verified": true,
            "is_active": true,
            "last_login": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_profile_response(account_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "account_id": account_id,
            "specialization": "General Medicine",
            "license_number": "MD123456",
            "consultation_fee": 25.0,
            "languages": ["French", "Lingala"],
            "location": {
                "lat": -4.325,
                "lng": 15.3222,
                "address": "Kinshasa"
            },
            "registration_status": "approved",
            "approved_by": null,
            "approval_date": null,
            "rejection_reason": null,
            "password_changed": true,
            "rating_average": 4.5,
            "rating_count": 12,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn schedule_response(doctor_id: &str) -> serde_json::Value {
        json!({
            "doctor_id": doctor_id,
            "working_hours": {
                "monday": { "start": "08:00", "end": "12:00" },
                "tuesday": { "start": "08:00", "end": "17:00" }
            },
            "breaks": [],
            "holidays": [],
            "vacations": [],
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(patient_id: &str, doctor_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": "2024-06-03",
            "start_time": "09:00",
            "end_time": "09:30",
            "status": "pending",
            "kind": "consultation",
            "reason": "Checkup",
            "notes": null,
            "cancellation_reason": null,
            "cancelled_by": null,
            "cancellation_date": null,
            "payment_status": "pending",
            "payment_amount": 25.0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}
