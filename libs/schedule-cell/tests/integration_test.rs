use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use schedule_cell::router::schedule_routes;
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(config: AppConfig) -> Router {
    // Mirror how the api binary mounts the cell.
    Router::new().nest("/doctors/{doctor_id}/schedule", schedule_routes(Arc::new(config)))
}

fn schedule_row(doctor_id: &str, vacations: serde_json::Value) -> serde_json::Value {
    json!({
        "doctor_id": doctor_id,
        "working_hours": {
            "monday": { "start": "08:00", "end": "12:00" }
        },
        "breaks": [],
        "holidays": [],
        "vacations": vacations,
        "is_active": true,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn day_availability_is_public_and_returns_slots() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor_id.to_string(), json!([]))
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("GET")
        .uri(format!("/doctors/{}/schedule/availability?date=2024-06-10", doctor_id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // Monday 08:00-12:00 in 30-minute steps.
    assert_eq!(json_response["total_slots"], 8);
    assert_eq!(json_response["slots"][0]["start"], "08:00");
    assert_eq!(json_response["slots"][7]["end"], "12:00");
}

#[tokio::test]
async fn slot_check_reports_unavailable_as_false_not_error() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor_id.to_string(), json!([]))
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    // 07:00-08:00 is before working hours: a 200 with available=false.
    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/doctors/{}/schedule/check?date=2024-06-10&start=07:00&end=08:00",
            doctor_id
        ))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["available"], false);
}

#[tokio::test]
async fn malformed_slot_check_is_a_validation_error() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());
    let doctor_id = Uuid::new_v4();

    let app = create_test_app(config);
    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/doctors/{}/schedule/check?date=2024-06-10&start=10:00&end=09:00",
            doctor_id
        ))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schedule_mutations_require_authentication() {
    let config = TestConfig::default().to_app_config();
    let doctor_id = Uuid::new_v4();

    let protected = vec![
        ("PUT", format!("/doctors/{}/schedule", doctor_id)),
        ("POST", format!("/doctors/{}/schedule/breaks", doctor_id)),
        ("POST", format!("/doctors/{}/schedule/holidays", doctor_id)),
        ("POST", format!("/doctors/{}/schedule/vacations", doctor_id)),
    ];

    for (verb, uri) in protected {
        let app = create_test_app(config.clone());
        let request = Request::builder()
            .method(verb)
            .uri(&uri)
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", verb, uri);
    }
}

#[tokio::test]
async fn another_doctor_cannot_touch_the_schedule() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let intruder = TestUser::doctor("+243810000009");
    let token = JwtTestUtils::create_test_token(&intruder, &config.jwt_secret, Some(24));
    let victim_id = Uuid::new_v4();

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedule/breaks", victim_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "day": "monday", "start": "10:00", "end": "10:30" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn break_outside_working_hours_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let doctor = TestUser::doctor("+243810000002");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor.id, json!([]))
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    // Monday hours end at 12:00; the break starts after.
    let request = Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedule/breaks", doctor.id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "day": "monday", "start": "12:30", "end": "13:00", "kind": "lunch" })
                .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_schedule_write_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let doctor = TestUser::doctor("+243810000003");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor.id, json!([]))
        ])))
        .mount(&mock_server)
        .await;

    // The CAS filter matched nothing: someone else wrote first.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedule/breaks", doctor.id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "day": "monday", "start": "10:00", "end": "10:30" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn vacation_request_with_booked_appointments_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let doctor = TestUser::doctor("+243810000004");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor.id, json!([]))
        ])))
        .mount(&mock_server)
        .await;

    // One confirmed appointment inside the requested range.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4(), "status": "confirmed", "date": "2024-06-12" }
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedule/vacations", doctor.id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "start_date": "2024-06-10",
                "end_date": "2024-06-14",
                "reason": "Annual leave"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn vacation_request_without_conflicts_is_stored_pending() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let doctor = TestUser::doctor("+243810000005");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(&doctor.id, json!([]))
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "first_name": "Grace",
            "last_name": "Okito",
            "phone": "+243810000005",
            "email": "grace@example.com"
        }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(
                &doctor.id,
                json!([{
                    "id": Uuid::new_v4(),
                    "start_date": "2024-06-10",
                    "end_date": "2024-06-14",
                    "reason": "Annual leave",
                    "status": "pending"
                }])
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/doctors/{}/schedule/vacations", doctor.id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "start_date": "2024-06-10",
                "end_date": "2024-06-14",
                "reason": "Annual leave"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json_response: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json_response["vacation"]["status"], "pending");
}

#[tokio::test]
async fn resolving_a_resolved_vacation_is_a_conflict() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let admin = TestUser::admin("+243810000006");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));
    let doctor_id = Uuid::new_v4();
    let vacation_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            schedule_row(
                &doctor_id.to_string(),
                json!([{
                    "id": vacation_id,
                    "start_date": "2024-06-10",
                    "end_date": "2024-06-14",
                    "reason": "Annual leave",
                    "status": "approved"
                }])
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config);
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/doctors/{}/schedule/vacations/{}", doctor_id, vacation_id))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "approved" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn only_admins_resolve_vacations() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_database_url(&mock_server.uri());

    let doctor = TestUser::doctor("+243810000007");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, Some(24));

    let app = create_test_app(config);
    let request = Request::builder()
        .method("PATCH")
        .uri(format!(
            "/doctors/{}/schedule/vacations/{}",
            doctor.id,
            Uuid::new_v4()
        ))
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "rejected" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
