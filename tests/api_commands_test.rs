use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use connect_sim::clock::ManualClock;
use connect_sim::config::Config;
use connect_sim::engine::Simulator;
use connect_sim::vehicle::{EV1_VEHICLE_ID, ICE1_VEHICLE_ID, ICE2_VEHICLE_ID};
use connect_sim::web::{AppState, build_router};
use http_body_util::BodyExt as _;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const P: &str = "/api/fordconnect/vehicles/v1";
const TOKEN: &str = "TestToken";
const UNKNOWN_ID: &str = "99999999999999999999999999999999";

fn app() -> (axum::Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2021, 3, 4, 12, 0, 0).unwrap(),
    ));
    let mut config = Config::default();
    config.auth.token = Some(TOKEN.to_string());
    let sim = Simulator::new(&config, clock.clone());
    (build_router(AppState::new(sim, "images")), clock)
}

struct Reply {
    status: StatusCode,
    vehicle_id: Option<String>,
    body: Value,
}

async fn call(router: &axum::Router, method: &str, uri: &str) -> Reply {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Application-Id", "afdc085b")
                .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let vehicle_id = response
        .headers()
        .get("vehicleid")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply {
        status,
        vehicle_id,
        body,
    }
}

#[tokio::test]
async fn command_moves_from_pending_to_completed() {
    let (router, clock) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/unlock")).await;
    assert_eq!(created.status, StatusCode::ACCEPTED);
    assert_eq!(created.body["status"], "SUCCESS");
    assert_eq!(created.body["commandStatus"], "COMPLETED");
    assert_eq!(created.vehicle_id.as_deref(), Some(ICE1_VEHICLE_ID));
    let id = created.body["commandId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 36);

    let poll = call(&router, "GET", &format!("{P}/{ICE1_VEHICLE_ID}/unlock/{id}")).await;
    assert_eq!(poll.status, StatusCode::OK);
    assert_eq!(poll.body["commandStatus"], "PENDINGRESPONSE");
    assert_eq!(poll.body["commandId"], id.as_str());

    clock.advance_ms(5_000);
    let poll = call(&router, "GET", &format!("{P}/{ICE1_VEHICLE_ID}/unlock/{id}")).await;
    assert_eq!(poll.body["commandStatus"], "COMPLETED");
}

#[tokio::test]
async fn poll_works_across_command_routes() {
    let (router, _) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/wake")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();

    let poll = call(&router, "GET", &format!("{P}/{ICE1_VEHICLE_ID}/stopEngine/{id}")).await;
    assert_eq!(poll.status, StatusCode::OK);

    let upper = ICE1_VEHICLE_ID.to_uppercase();
    let poll = call(&router, "GET", &format!("{P}/{upper}/lock/{}", id.to_uppercase())).await;
    assert_eq!(poll.status, StatusCode::OK);
}

#[tokio::test]
async fn expired_command_is_unauthorized() {
    let (router, clock) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/lock")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();

    clock.advance_ms(121_000);
    let poll = call(&router, "GET", &format!("{P}/{ICE1_VEHICLE_ID}/lock/{id}")).await;
    assert_eq!(poll.status, StatusCode::UNAUTHORIZED);
    assert_eq!(poll.body["error"]["code"], 3000);
    assert_eq!(poll.body["commandStatus"], "FAILED");
    assert_eq!(poll.body["commandId"], id.as_str());
}

#[tokio::test]
async fn pending_window_ends_at_four_seconds() {
    let (router, clock) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/wake")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();
    let uri = format!("{P}/{ICE1_VEHICLE_ID}/wake/{id}");

    clock.advance_ms(3_999);
    let poll = call(&router, "GET", &uri).await;
    assert_eq!(poll.status, StatusCode::OK);
    assert_eq!(poll.body["status"], "SUCCESS");
    assert_eq!(poll.body["commandStatus"], "PENDINGRESPONSE");

    clock.advance_ms(2);
    let poll = call(&router, "GET", &uri).await;
    assert_eq!(poll.status, StatusCode::OK);
    assert_eq!(poll.body["status"], "SUCCESS");
    assert_eq!(poll.body["commandStatus"], "COMPLETED");
}

#[tokio::test]
async fn command_expiry_boundary_is_inclusive() {
    let (router, clock) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/lock")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();
    let uri = format!("{P}/{ICE1_VEHICLE_ID}/lock/{id}");

    clock.advance_ms(120_000);
    let poll = call(&router, "GET", &uri).await;
    assert_eq!(poll.status, StatusCode::OK);
    assert_eq!(poll.body["commandStatus"], "COMPLETED");

    clock.advance_ms(1);
    let poll = call(&router, "GET", &uri).await;
    assert_eq!(poll.status, StatusCode::UNAUTHORIZED);
    assert_eq!(poll.body["commandStatus"], "FAILED");
    assert_eq!(poll.body["commandId"], id.as_str());
}

#[tokio::test]
async fn command_id_is_scoped_to_vehicle() {
    let (router, _) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/unlock")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();

    let poll = call(&router, "GET", &format!("{P}/{EV1_VEHICLE_ID}/unlock/{id}")).await;
    assert_eq!(poll.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_refresh_reports_locks_and_alarm() {
    let (router, clock) = app();
    let created = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/unlock")).await;
    let id = created.body["commandId"].as_str().unwrap().to_string();
    clock.advance_ms(4_000);

    let refresh = call(&router, "GET", &format!("{P}/{ICE1_VEHICLE_ID}/statusrefresh/{id}")).await;
    assert_eq!(refresh.status, StatusCode::OK);
    assert_eq!(refresh.body["commandStatus"], "COMPLETED");
    assert_eq!(refresh.body["vehicleStatus"]["lockStatus"]["value"], "UNLOCKED");
    assert_eq!(refresh.body["vehicleStatus"]["alarm"]["value"], "NOTSET");
}

#[tokio::test]
async fn charge_commands_are_ev_only() {
    let (router, _) = app();
    let reply = call(&router, "POST", &format!("{P}/{ICE1_VEHICLE_ID}/startCharge")).await;
    assert_eq!(reply.status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(reply.body["error"]["code"], 4006);
    assert_eq!(reply.body["commandStatus"], "FAILED");

    let reply = call(&router, "POST", &format!("{P}/{EV1_VEHICLE_ID}/startCharge")).await;
    assert_eq!(reply.status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn unknown_vehicle_bodies_depend_on_route() {
    let (router, _) = app();

    let reply = call(&router, "POST", &format!("{P}/{UNKNOWN_ID}/stopCharge")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["commandStatus"], "FAILED");
    assert_eq!(reply.vehicle_id.as_deref(), Some(UNKNOWN_ID));

    let reply = call(&router, "POST", &format!("{P}/{UNKNOWN_ID}/startEngine")).await;
    assert_eq!(reply.body["commandStatus"], "EMPTY");

    let reply = call(&router, "GET", &format!("{P}/{UNKNOWN_ID}/unlock/abc")).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["commandStatus"], "EMPTY");

    let reply = call(&router, "GET", &format!("{P}/{UNKNOWN_ID}")).await;
    assert_eq!(reply.body["error"]["statusCode"], "NOT_FOUND");
    assert!(reply.body.get("commandStatus").is_none());
}

#[tokio::test]
async fn bad_vehicle_id_length() {
    let (router, _) = app();
    let reply = call(&router, "POST", &format!("{P}/1234/unlock")).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["errorCode"], "400");
    assert!(
        reply.body["errorMessage"]
            .as_str()
            .unwrap()
            .contains("size must be between 32 and 32")
    );
    assert!(reply.vehicle_id.is_none());
}

#[tokio::test]
async fn unauthorized_vehicle() {
    let (router, _) = app();
    let reply = call(&router, "POST", &format!("{P}/{ICE2_VEHICLE_ID}/unlock")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"]["title"], "Unauthorized user");
    assert!(reply.body.get("commandId").is_none());

    let reply = call(&router, "GET", &format!("{P}/{ICE2_VEHICLE_ID}/unlock/abc")).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["commandStatus"], "FAILED");
    assert!(reply.body.get("commandId").is_none());
}

#[tokio::test]
async fn application_id_is_checked_first() {
    let (router, _) = app();
    let uri = format!("{P}/{ICE1_VEHICLE_ID}/unlock");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].as_str().unwrap().contains("missing subscription key"));

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .header("Application-Id", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["statusCode"], 401);
    assert!(body["message"].as_str().unwrap().contains("invalid subscription key"));
}

#[tokio::test]
async fn unsupported_route_falls_back() {
    let (router, _) = app();
    let response = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/nothing/here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(
        String::from_utf8_lossy(&bytes).starts_with("The route you requested is not supported")
    );
}
