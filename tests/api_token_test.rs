use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use connect_sim::clock::ManualClock;
use connect_sim::config::Config;
use connect_sim::engine::Simulator;
use connect_sim::web::{AppState, build_router};
use http_body_util::BodyExt as _;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const P: &str = "/api/fordconnect/vehicles/v1";

fn app() -> (axum::Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2021, 3, 4, 12, 0, 0).unwrap(),
    ));
    let mut config = Config::default();
    config.auth.code = Some("TestCode".to_string());
    let sim = Simulator::new(&config, clock.clone());
    (build_router(AppState::new(sim, "images")), clock)
}

async fn token_request(router: &axum::Router, form: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/oauth2/v2.0/token")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn list_vehicles(router: &axum::Router, token: &str) -> StatusCode {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(P)
                .header("Application-Id", "afdc085b-377a-4351-b23e-5e1d35fb3700")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

const CODE_GRANT: &str = "client_id=30990062-9618-40e1-a27b-7c6bcb23658a&client_secret=T_Wk41dx2U9v22R5sQD4Z_E1u-l2B-jXHE&grant_type=authorization_code&redirect_uri=http%3A%2F%2Flocalhost%3A3000&code=TestCode";

#[tokio::test]
async fn authorization_code_grant_issues_working_tokens() {
    let (router, _) = app();
    let (status, body) = token_request(&router, CODE_GRANT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 1200);
    assert_eq!(body["refresh_token_expires_in"], 7_776_000);

    let access = body["access_token"].as_str().unwrap();
    assert!(access.starts_with("ACCESS-"));
    assert_eq!(list_vehicles(&router, access).await, StatusCode::OK);
}

#[tokio::test]
async fn refresh_grant_issues_new_pair() {
    let (router, _) = app();
    let (_, first) = token_request(&router, CODE_GRANT).await;
    let refresh = first["refresh_token"].as_str().unwrap();

    let form = format!(
        "client_id=3abc&client_secret=Tsecret&grant_type=refresh_token&refresh_token={}",
        refresh
    );
    let (status, second) = token_request(&router, &form).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["access_token"], first["access_token"]);

    let (status, body) = token_request(
        &router,
        "client_id=3abc&client_secret=Tsecret&grant_type=refresh_token&refresh_token=bogus",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "invalid request");
    assert_eq!(body["error_description"], "ERROR: Refresh token not expected value.");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn bad_credentials_are_rejected_in_order() {
    let (router, _) = app();
    let (status, body) = token_request(&router, "client_id=9abc&client_secret=Tsecret").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "invalid request");
    assert_eq!(body["error_description"], "ERROR: client_id not expected value.");

    let (_, body) = token_request(&router, "client_id=3abc&client_secret=Xsecret").await;
    assert_eq!(body["error_description"], "ERROR: client_secret not expected value.");

    let (_, body) = token_request(
        &router,
        "client_id=3abc&client_secret=Tsecret&grant_type=password",
    )
    .await;
    assert_eq!(body["error_description"], "ERROR: grant_type not expected value.");

    let (_, body) = token_request(
        &router,
        "client_id=3abc&client_secret=Tsecret&grant_type=authorization_code&redirect_uri=ftp%3A%2F%2Fx&code=TestCode",
    )
    .await;
    assert_eq!(body["error_description"], "ERROR: invalid redirect_uri.");
}

#[tokio::test]
async fn authorization_code_expires() {
    let (router, clock) = app();
    clock.advance_ms(1_200_000);
    let (status, body) = token_request(&router, CODE_GRANT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "invalid request");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn access_token_expires() {
    let (router, clock) = app();
    let (_, body) = token_request(&router, CODE_GRANT).await;
    let access = body["access_token"].as_str().unwrap().to_string();

    clock.advance_ms(1_199_000);
    assert_eq!(list_vehicles(&router, &access).await, StatusCode::OK);
    clock.advance_ms(1_000);
    assert_eq!(list_vehicles(&router, &access).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_bearer_is_reported_by_placeholder() {
    let (router, _) = app();
    let response = router
        .oneshot(
            Request::builder()
                .uri(P)
                .header("Application-Id", "afdc085b")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "invalid_token");
    assert_eq!(
        body["error_description"],
        "Access token expired: AUTH-BEARER-NOT-PROVIDED"
    );
}
