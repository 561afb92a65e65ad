mod support;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use safepass::{
    api, backend::MemoryBackend, config::Config, models::Role, state::AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use support::{student, RecordingFunctions};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    functions: Arc<RecordingFunctions>,
}

async fn test_app(demo_logins: bool) -> TestApp {
    let config = Config {
        demo_logins,
        ..Config::default()
    };
    let backend = Arc::new(MemoryBackend::with_students(vec![
        student("STU001", "Sam Lee", &["Peanuts"]),
        student("STU002", "Ana Cruz", &[]),
    ]));
    let functions = Arc::new(RecordingFunctions::default());
    let state = AppState::new(config, backend, functions.clone());
    state.cache.refresh().await.unwrap();
    TestApp {
        router: api::router(state),
        functions,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(String::from);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn login(router: &Router, username: &str, password: &str) -> String {
    let (status, cookie, _) = send(
        router,
        post_json(
            "/auth/login",
            None,
            json!({"email": username, "password": password}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    cookie.expect("session cookie")
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app(false).await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let app = test_app(false).await;
    let (status, _, body) = send(
        &app.router,
        Request::builder().uri("/students").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn session_cookie_carries_the_ttl() {
    let app = test_app(true).await;
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({"username": "teacher", "password": "password"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("safepass_session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains(&format!("Max-Age={}", 12 * 3600)));
}

#[tokio::test]
async fn demo_logins_are_off_by_default() {
    let app = test_app(false).await;
    let (status, cookie, _) = send(
        &app.router,
        post_json("/auth/login", None, json!({"username": "admin", "password": "password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(cookie.is_none());
}

#[tokio::test]
async fn pending_accounts_see_the_approval_notice() {
    let app = test_app(false).await;
    let (status, _, body) = send(
        &app.router,
        post_json(
            "/auth/signup",
            None,
            json!({
                "name": "Nina Nurse",
                "email": "nina@school.org",
                "password": "bandage1",
                "role": "nurse",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["status"], "pending");
    assert!(body["user"].get("password_hash").is_none());

    let cookie = login(&app.router, "nina@school.org", "bandage1").await;

    let (status, _, me) = send(&app.router, get("/auth/me", &cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "nurse");

    let (status, _, body) = send(&app.router, get("/students", &cookie)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Your account is pending admin approval");
}

#[tokio::test]
async fn admin_approves_and_user_gets_in() {
    let app = test_app(true).await;
    let (_, _, body) = send(
        &app.router,
        post_json(
            "/auth/signup",
            None,
            json!({
                "name": "Tom Teacher",
                "email": "tom@school.org",
                "password": "chalk123",
                "role": "teacher",
            }),
        ),
    )
    .await;
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let admin = login(&app.router, "admin", "password").await;
    let (status, _, approved) = send(
        &app.router,
        post_json(&format!("/users/{}/approve", user_id), Some(&admin), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let teacher = login(&app.router, "tom@school.org", "chalk123").await;
    let (status, _, students) = send(&app.router, get("/students", &teacher)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(students.as_array().unwrap().len(), 2);

    let (status, _, _) = send(&app.router, get("/users", &teacher)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn scanning_over_http_raises_the_allergy_alert() {
    let app = test_app(true).await;
    let driver = login(&app.router, "driver", "password").await;

    let (status, _, outcome) = send(
        &app.router,
        post_json(
            "/scans",
            Some(&driver),
            json!({"student_id": "STU001", "location": "Bus #1", "action": "in"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(outcome["event"]["scanned_by"], "Driver User");
    assert_eq!(outcome["allergy_alert"]["allergies"], json!(["Peanuts"]));
    assert_eq!(outcome["nurse_notified"], true);
    assert_eq!(app.functions.allergy_calls().len(), 1);

    let (status, _, active) = send(&app.router, get("/alerts/allergy", &driver)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);

    let (status, _, body) = send(
        &app.router,
        post_json(
            "/scans",
            Some(&driver),
            json!({"student_id": "STU001", "location": "Gym", "action": "in"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Gym"));
}

#[tokio::test]
async fn settings_are_admin_only_and_validated() {
    let app = test_app(true).await;
    let nurse = login(&app.router, "nurse", "password").await;
    let (status, _, _) = send(&app.router, get("/settings", &nurse)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = login(&app.router, "admin", "password").await;
    let (status, _, settings) = send(&app.router, get("/settings", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["alert_thresholds"]["unscanned_minutes"], 30);
    assert_eq!(
        settings["student_profile_fields"],
        json!(["name", "student_id", "grade"])
    );

    let (status, _, fields) = send(
        &app.router,
        post_json("/settings/profile-fields", Some(&admin), json!({"name": "Bus Route"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(fields["student_profile_fields"][3], "bus_route");

    let (status, _, _) = send(
        &app.router,
        post_json("/settings/profile-fields", Some(&admin), json!({"name": "bus route"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_can_create_users_directly() {
    let app = test_app(true).await;
    let admin = login(&app.router, "admin", "password").await;
    let (status, _, created) = send(
        &app.router,
        post_json(
            "/users",
            Some(&admin),
            json!({
                "name": "Mo Monitor",
                "email": "mo@school.org",
                "password": "hallway1",
                "role": Role::Monitor,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "approved");

    let monitor = login(&app.router, "mo@school.org", "hallway1").await;
    let (status, _, board) = send(&app.router, get("/tracker?grade=all", &monitor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["unaccounted"].as_array().unwrap().len(), 2);
}
