use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::router::payment_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    payment_routes(Arc::new(config))
}

fn appointment_row(id: &str, patient_id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "patient_id": patient_id,
        "doctor_id": Uuid::new_v4(),
        "date": "2024-06-10",
        "start_time": "09:00",
        "end_time": "09:30",
        "status": "confirmed",
        "kind": "consultation",
        "reason": "Checkup",
        "payment_status": "pending",
        "payment_amount": 25.0,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

fn payment_row(
    id: &str,
    patient_id: &str,
    status: &str,
    paid_at: chrono::DateTime<Utc>,
) -> serde_json::Value {
    json!({
        "id": id,
        "appointment_id": Uuid::new_v4(),
        "patient_id": patient_id,
        "doctor_id": Uuid::new_v4(),
        "amount": 25.0,
        "currency": "USD",
        "status": status,
        "method": "mobile_money",
        "transaction_id": "TRX-abc123",
        "payment_date": paid_at.to_rfc3339(),
        "refund_date": null,
        "refund_reason": null,
        "created_at": paid_at.to_rfc3339(),
        "updated_at": paid_at.to_rfc3339()
    })
}

#[tokio::test]
async fn paying_for_an_appointment_completes_and_marks_it_paid() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let patient = TestUser::patient("+243810000001");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&appointment_id.to_string(), &patient.id)
        ])))
        .mount(&mock_server)
        .await;

    // No payment exists yet.
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            payment_row(&Uuid::new_v4().to_string(), &patient.id, "completed", Utc::now())
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&appointment_id.to_string(), &patient.id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/appointments/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "method": "mobile_money" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["status"], "completed");
    assert!(json_response["transaction_id"].as_str().unwrap().starts_with("TRX-"));
}

#[tokio::test]
async fn second_payment_for_the_same_appointment_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let patient = TestUser::patient("+243810000002");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));
    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            appointment_row(&appointment_id.to_string(), &patient.id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            payment_row(&Uuid::new_v4().to_string(), &patient.id, "completed", Utc::now())
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/appointments/{}", appointment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "method": "cash" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn refund_outside_the_window_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let admin = TestUser::admin("+243810000003");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let payment_id = Uuid::new_v4();

    // Paid 45 days ago: past the 30-day window.
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            payment_row(
                &payment_id.to_string(),
                &Uuid::new_v4().to_string(),
                "completed",
                Utc::now() - Duration::days(45)
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/refund", payment_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "reason": "Service not delivered" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn refunds_are_admin_only() {
    let config = TestConfig::default().to_app_config();

    let patient = TestUser::patient("+243810000004");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/refund", Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "reason": "Please" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn strangers_cannot_read_other_payments() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let stranger = TestUser::patient("+243810000005");
    let token = JwtTestUtils::create_test_token(&stranger, &config.jwt_secret, Some(24));
    let payment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            payment_row(
                &payment_id.to_string(),
                &Uuid::new_v4().to_string(),
                "completed",
                Utc::now()
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}", payment_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
