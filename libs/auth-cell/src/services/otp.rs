use anyhow::Result;
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::postgrest::PostgrestClient;

use crate::models::OtpCode;

const OTP_TTL_MINUTES: i64 = 10;

/// `+` must not reach the query string raw, it would decode as a space.
pub(crate) fn encode_phone(phone: &str) -> String {
    phone.replace('+', "%2B")
}

/// Issues and verifies the 6-digit codes used for phone verification.
/// Codes live 10 minutes and are single use.
pub struct OtpService {
    db: PostgrestClient,
}

impl OtpService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            db: PostgrestClient::new(config),
        }
    }

    /// Replace any previous code for this phone and return the new one.
    pub async fn issue(&self, phone: &str, auth_token: &str) -> Result<String> {
        debug!("Issuing OTP for {}", phone);

        let path = format!("/rest/v1/otp_codes?phone=eq.{}", encode_phone(phone));
        self.db.delete(&path, Some(auth_token)).await?;

        let code = rand::thread_rng().gen_range(100_000..1_000_000).to_string();
        let now = Utc::now();

        let _: OtpCode = self
            .db
            .insert_returning(
                "/rest/v1/otp_codes",
                Some(auth_token),
                json!({
                    "phone": phone,
                    "code": code,
                    "expires_at": (now + Duration::minutes(OTP_TTL_MINUTES)).to_rfc3339(),
                    "created_at": now.to_rfc3339(),
                }),
            )
            .await?;

        Ok(code)
    }

    /// Check a submitted code. The stored code is deleted on success and
    /// on expiry, so it can never be replayed.
    pub async fn verify(&self, phone: &str, code: &str, auth_token: &str) -> Result<bool> {
        let path = format!("/rest/v1/otp_codes?phone=eq.{}", encode_phone(phone));
        let mut rows: Vec<OtpCode> = self.db.select(&path, Some(auth_token)).await?;

        let Some(stored) = rows.pop() else {
            debug!("No OTP on file for {}", phone);
            return Ok(false);
        };

        if Utc::now() > stored.expires_at {
            debug!("OTP for {} expired", phone);
            self.db.delete(&path, Some(auth_token)).await?;
            return Ok(false);
        }

        if stored.code != code {
            return Ok(false);
        }

        self.db.delete(&path, Some(auth_token)).await?;
        Ok(true)
    }
}
