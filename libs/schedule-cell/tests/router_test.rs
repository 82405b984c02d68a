use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use schedule_cell::{schedule_routes, InMemoryScheduleStore, ScheduleState};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn app(config: &TestConfig) -> Router {
    let state = ScheduleState::new(config.to_arc(), Arc::new(InMemoryScheduleStore::new()));
    Router::new().nest("/schedule", schedule_routes(state))
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json");

    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_professional_can_save_and_read_schedule() {
    let config = TestConfig::default();
    let app = app(&config);
    let professional = TestUser::professional("pro@example.com");
    let token = JwtTestUtils::create_test_token(&professional, &config.jwt_secret, None);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/schedule/me",
            &token,
            Some(json!([
                { "dayOfWeek": 1, "startTime": "08:00", "endTime": "12:00" },
                { "dayOfWeek": 3, "startTime": "13:00", "endTime": "17:00", "isAvailable": false }
            ])),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved.as_array().unwrap().len(), 2);
    assert_eq!(saved[0]["professionalId"], professional.id.to_string());

    let response = app
        .oneshot(request("GET", "/schedule/me", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert_eq!(listed[1]["dayOfWeek"], 3);
    assert_eq!(listed[1]["isAvailable"], false);
}

#[tokio::test]
async fn test_invalid_batch_is_bad_request() {
    let config = TestConfig::default();
    let professional = TestUser::professional("pro@example.com");
    let token = JwtTestUtils::create_test_token(&professional, &config.jwt_secret, None);

    let response = app(&config)
        .oneshot(request(
            "POST",
            "/schedule/me",
            &token,
            Some(json!([{ "dayOfWeek": 9, "startTime": "08:00", "endTime": "12:00" }])),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn test_client_role_is_forbidden() {
    let config = TestConfig::default();
    let client = TestUser::client("client@example.com");
    let token = JwtTestUtils::create_test_token(&client, &config.jwt_secret, None);

    let response = app(&config)
        .oneshot(request("GET", "/schedule/me", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let config = TestConfig::default();
    let professional = TestUser::professional("pro@example.com");
    let token = JwtTestUtils::create_expired_token(&professional, &config.jwt_secret);

    let response = app(&config)
        .oneshot(request("GET", "/schedule/me", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_foreign_block_is_forbidden() {
    let config = TestConfig::default();
    let app = app(&config);
    let owner = TestUser::professional("owner@example.com");
    let other = TestUser::professional("other@example.com");
    let owner_token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, None);
    let other_token = JwtTestUtils::create_test_token(&other, &config.jwt_secret, None);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/schedule/me",
            &owner_token,
            Some(json!([{ "dayOfWeek": 2, "startTime": "08:00", "endTime": "12:00" }])),
        ))
        .await
        .unwrap();
    let block_id = json_body(response).await[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request("DELETE", &format!("/schedule/{}", block_id), &other_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request("DELETE", &format!("/schedule/{}", block_id), &owner_token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
