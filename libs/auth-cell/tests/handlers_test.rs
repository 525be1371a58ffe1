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

use auth_cell::router::auth_routes;
use shared_config::AppConfig;
use shared_utils::password::hash_password;
use shared_utils::test_utils::TestConfig;

fn create_test_app(config: AppConfig) -> Router {
    auth_routes(Arc::new(config))
}

fn account_row(phone: &str, password_hash: &str, verified: bool, active: bool) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "phone": phone,
        "password_hash": password_hash,
        "role": "patient",
        "first_name": "Test",
        "last_name": "Patient",
        "email": null,
        "is_verified": verified,
        "is_active": active,
        "last_login": null,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

async fn mount_otp_mocks(mock_server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(204))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "phone": "+243810000001",
            "code": "123456",
            "expires_at": (Utc::now() + Duration::minutes(10)).to_rfc3339(),
            "created_at": Utc::now().to_rfc3339()
        }])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn patient_registration_creates_inactive_account() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            account_row("+243810000001", "$argon2$fake", false, false)
        ])))
        .mount(&mock_server)
        .await;

    mount_otp_mocks(&mock_server).await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "secret99" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json_response["account"]["is_verified"], false);
    assert_eq!(json_response["account"]["is_active"], false);
    // The hash must never leak.
    assert!(json_response["account"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_phone_registration_conflicts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", "$argon2$fake", true, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "secret99" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "abc" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn otp_verification_activates_the_account() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "phone": "+243810000001",
            "code": "123456",
            "expires_at": (Utc::now() + Duration::minutes(5)).to_rfc3339(),
            "created_at": Utc::now().to_rfc3339()
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", "$argon2$fake", true, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/verify-otp")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "otp": "123456" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["account"]["is_verified"], true);
}

#[tokio::test]
async fn wrong_otp_code_fails() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "phone": "+243810000001",
            "code": "123456",
            "expires_at": (Utc::now() + Duration::minutes(5)).to_rfc3339(),
            "created_at": Utc::now().to_rfc3339()
        }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/verify-otp")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "otp": "000000" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_otp_code_fails() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "phone": "+243810000001",
            "code": "123456",
            "expires_at": (Utc::now() - Duration::minutes(1)).to_rfc3339(),
            "created_at": (Utc::now() - Duration::minutes(11)).to_rfc3339()
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/otp_codes"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/verify-otp")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "otp": "123456" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_returns_a_token_for_verified_accounts() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let password_hash = hash_password("secret99").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", &password_hash, true, true)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", &password_hash, true, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "secret99" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert!(json_response["token"].as_str().unwrap().split('.').count() == 3);
    assert_eq!(json_response["must_change_password"], false);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let password_hash = hash_password("secret99").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", &password_hash, true, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "not-it" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unverified_accounts_cannot_log_in() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let password_hash = hash_password("secret99").unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000001", &password_hash, false, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "phone": "+243810000001", "password": "secret99" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bootstrap_admin_refuses_when_one_exists() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            account_row("+243810000000", "$argon2$fake", true, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri("/bootstrap-admin")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "phone": "+243810000009",
                "password": "secret99",
                "first_name": "Root",
                "last_name": "Admin"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let config = TestConfig::default().to_app_config();

    for (verb, uri) in [
        ("GET", "/me"),
        ("POST", "/change-password"),
        ("POST", "/reset-password"),
    ] {
        let app = create_test_app(config.clone());
        let request = Request::builder()
            .method(verb)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", verb, uri);
    }
}
