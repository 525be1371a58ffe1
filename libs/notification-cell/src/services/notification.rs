use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{NotificationEvent, Recipient};

/// Best-effort SMS/email dispatch. `send` never returns an error: a
/// failed delivery is logged and swallowed so business mutations are
/// never rolled back by a gateway outage. Callers that do not want to
/// wait spawn it onto the runtime.
pub struct NotificationService {
    client: Client,
    sms_api_url: String,
    sms_api_token: String,
    sms_from: String,
    email_api_url: String,
    email_api_token: String,
    email_from: String,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            sms_api_url: config.sms_api_url.clone(),
            sms_api_token: config.sms_api_token.clone(),
            sms_from: config.sms_from.clone(),
            email_api_url: config.email_api_url.clone(),
            email_api_token: config.email_api_token.clone(),
            email_from: config.email_from.clone(),
        }
    }

    pub async fn send(&self, recipient: Recipient, event: NotificationEvent) {
        let message = event.render();

        if let Some(phone) = recipient.phone.as_deref() {
            self.send_sms(phone, &message.sms, event.kind()).await;
        }

        if let (Some(email), Some(body)) = (recipient.email.as_deref(), message.email.as_ref()) {
            self.send_email(email, &body.subject, &body.body, event.kind())
                .await;
        }
    }

    async fn send_sms(&self, to: &str, body: &str, kind: &str) {
        if self.sms_api_url.is_empty() {
            info!("SMS gateway not configured, would send {} to {}: {}", kind, to, body);
            return;
        }

        debug!("Sending {} SMS to {}", kind, to);

        let result = self
            .client
            .post(&self.sms_api_url)
            .bearer_auth(&self.sms_api_token)
            .json(&json!({
                "to": to,
                "from": self.sms_from,
                "body": body,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("{} SMS delivered to {}", kind, to);
            }
            Ok(response) => {
                warn!("SMS gateway rejected {} to {}: {}", kind, to, response.status());
            }
            Err(e) => {
                warn!("Failed to send {} SMS to {}: {}", kind, to, e);
            }
        }
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str, kind: &str) {
        if self.email_api_url.is_empty() {
            info!("Email relay not configured, would send {} to {}: {}", kind, to, subject);
            return;
        }

        debug!("Sending {} email to {}", kind, to);

        let result = self
            .client
            .post(&self.email_api_url)
            .bearer_auth(&self.email_api_token)
            .json(&json!({
                "to": to,
                "from": self.email_from,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("{} email delivered to {}", kind, to);
            }
            Ok(response) => {
                warn!("Email relay rejected {} to {}: {}", kind, to, response.status());
            }
            Err(e) => {
                warn!("Failed to send {} email to {}: {}", kind, to, e);
            }
        }
    }
}
