use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::{NotificationEvent, NotificationService, Recipient};
use shared_config::AppConfig;

fn config_with_sms_gateway(url: &str) -> AppConfig {
    AppConfig {
        database_api_url: String::new(),
        database_anon_key: String::new(),
        jwt_secret: String::new(),
        sms_api_url: format!("{}/messages", url),
        sms_api_token: "test-sms-token".to_string(),
        sms_from: "CareLink".to_string(),
        email_api_url: String::new(),
        email_api_token: String::new(),
        email_from: "no-reply@carelink.example".to_string(),
        admin_phone: "+243810000000".to_string(),
        admin_email: "admin@carelink.example".to_string(),
    }
}

#[tokio::test]
async fn sends_sms_through_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(serde_json::json!({
            "to": "+243810000001",
            "from": "CareLink"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = NotificationService::new(&config_with_sms_gateway(&mock_server.uri()));
    service
        .send(
            Recipient::sms_only("+243810000001"),
            NotificationEvent::OtpVerification {
                otp: "123456".to_string(),
            },
        )
        .await;
}

#[tokio::test]
async fn gateway_failure_is_swallowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = NotificationService::new(&config_with_sms_gateway(&mock_server.uri()));

    // Delivery failures must never surface to the caller.
    service
        .send(
            Recipient::sms_only("+243810000001"),
            NotificationEvent::PaymentReceived {
                amount: 25.0,
                currency: "USD".to_string(),
            },
        )
        .await;
}

#[tokio::test]
async fn unconfigured_gateway_logs_only() {
    let mut config = config_with_sms_gateway("http://unused.example");
    config.sms_api_url = String::new();

    let service = NotificationService::new(&config);
    service
        .send(
            Recipient::sms_only("+243810000001"),
            NotificationEvent::AppointmentCompleted {
                date: chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            },
        )
        .await;
}
