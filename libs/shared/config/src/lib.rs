use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_api_url: String,
    pub database_anon_key: String,
    pub jwt_secret: String,
    pub sms_api_url: String,
    pub sms_api_token: String,
    pub sms_from: String,
    pub email_api_url: String,
    pub email_api_token: String,
    pub email_from: String,
    pub admin_phone: String,
    pub admin_email: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            database_api_url: env::var("DATABASE_API_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_API_URL not set, using empty value");
                    String::new()
                }),
            database_anon_key: env::var("DATABASE_ANON_KEY")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_ANON_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            sms_api_url: env::var("SMS_API_URL")
                .unwrap_or_else(|_| {
                    warn!("SMS_API_URL not set, SMS delivery will be logged only");
                    String::new()
                }),
            sms_api_token: env::var("SMS_API_TOKEN").unwrap_or_default(),
            sms_from: env::var("SMS_FROM").unwrap_or_else(|_| "CareLink".to_string()),
            email_api_url: env::var("EMAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("EMAIL_API_URL not set, email delivery will be logged only");
                    String::new()
                }),
            email_api_token: env::var("EMAIL_API_TOKEN").unwrap_or_default(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@carelink.example".to_string()),
            admin_phone: env::var("ADMIN_PHONE").unwrap_or_default(),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_api_url.is_empty()
            && !self.database_anon_key.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn is_sms_configured(&self) -> bool {
        !self.sms_api_url.is_empty() && !self.sms_api_token.is_empty()
    }

    pub fn is_email_configured(&self) -> bool {
        !self.email_api_url.is_empty() && !self.email_api_token.is_empty()
    }
}
