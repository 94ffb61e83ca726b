//! Axum-based HTTP surface of the simulated connected-vehicle API

pub mod params;
pub mod reply;
pub mod sim;

use crate::command::CommandKind;
use crate::engine::{ImageKind, ImageQuery, Simulator};
use crate::error::Result;
use crate::token::{TokenRequest, bearer_from_header};
use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, Query, Request, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use reply::{ApiRoute, RouteContext, error_response, token_error, with_vehicle_id};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Route prefix of the vehicle API
pub const API_PREFIX: &str = "/api/fordconnect/vehicles/v1";
pub const TOKEN_PATH: &str = "/oauth2/v2.0/token";

const NOT_SUPPORTED: &str =
    "The route you requested is not supported by this simulator. Verify GET/POST usage and path.";

pub type SharedSimulator = Arc<Mutex<Simulator>>;

#[derive(Clone)]
pub struct AppState {
    pub simulator: SharedSimulator,
    pub images_dir: PathBuf,
}

impl AppState {
    pub fn new(simulator: Simulator, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            simulator: Arc::new(Mutex::new(simulator)),
            images_dir: images_dir.into(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Application-Id gate followed by the bearer check
fn authorize(sim: &Simulator, headers: &HeaderMap) -> Result<()> {
    sim.check_application_id(header(headers, "application-id"))?;
    sim.authenticate(bearer_from_header(header(headers, "authorization")))
}

fn respond(ctx: &RouteContext, result: Result<Response>) -> Response {
    result.unwrap_or_else(|err| error_response(&err, ctx))
}

pub async fn not_supported() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_SUPPORTED)
}

async fn token(
    State(state): State<AppState>,
    form: std::result::Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            crate::logging::get_logger("web")
                .warn(&format!("Unreadable token request body: {}", rejection));
            TokenRequest::default()
        }
    };
    let mut sim = state.simulator.lock().await;
    match sim.request_token(&request) {
        Ok(response) => Json(response).into_response(),
        Err(err) => token_error(&err),
    }
}

async fn list_vehicles(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let ctx = RouteContext::new(ApiRoute::Vehicles);
    let sim = state.simulator.lock().await;
    respond(
        &ctx,
        authorize(&sim, &headers).map(|_| {
            Json(json!({ "status": "SUCCESS", "vehicles": sim.list_vehicles() })).into_response()
        }),
    )
}

async fn vehicle_info(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::VehicleInfo).vehicle(&vehicle_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.vehicle(&vehicle_id))
        .map(|record| {
            let body = json!({ "status": "SUCCESS", "vehicle": record.view() });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

async fn create_command(
    state: AppState,
    vehicle_id: String,
    headers: HeaderMap,
    kind: CommandKind,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::CommandPost(kind)).vehicle(&vehicle_id);
    let mut sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.create_command(&vehicle_id, kind))
        .map(|command| {
            let body = json!({
                "status": "SUCCESS",
                "commandStatus": "COMPLETED",
                "commandId": command.command_id,
            });
            with_vehicle_id((StatusCode::ACCEPTED, Json(body)), &vehicle_id)
        });
    respond(&ctx, result)
}

fn command_route(kind: CommandKind) -> MethodRouter<AppState> {
    post(
        move |State(state): State<AppState>, Path(vehicle_id): Path<String>, headers: HeaderMap| {
            create_command(state, vehicle_id, headers, kind)
        },
    )
}

async fn poll_command(
    state: AppState,
    vehicle_id: String,
    command_id: String,
    headers: HeaderMap,
    kind: CommandKind,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::CommandPoll(kind))
        .vehicle(&vehicle_id)
        .command(&command_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.poll_command(&vehicle_id, &command_id))
        .map(|poll| {
            let body = json!({
                "status": "SUCCESS",
                "commandStatus": poll.status,
                "commandId": poll.command_id,
            });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

fn poll_route(kind: CommandKind) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>,
              Path((vehicle_id, command_id)): Path<(String, String)>,
              headers: HeaderMap| { poll_command(state, vehicle_id, command_id, headers, kind) },
    )
}

async fn status_refresh(
    State(state): State<AppState>,
    Path((vehicle_id, command_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::StatusRefresh)
        .vehicle(&vehicle_id)
        .command(&command_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.status_refresh(&vehicle_id, &command_id))
        .map(|(poll, snapshot)| {
            let body = json!({
                "status": "SUCCESS",
                "commandStatus": poll.status,
                "commandId": poll.command_id,
                "vehicleStatus": snapshot,
            });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

async fn location(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::Location).vehicle(&vehicle_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.location(&vehicle_id))
        .map(|loc| {
            let body = json!({ "status": "SUCCESS", "vehicleLocation": loc });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

async fn charge_schedules(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::ChargeSchedules).vehicle(&vehicle_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.charge_schedules(&vehicle_id))
        .map(|schedules| {
            let body = json!({ "status": "SUCCESS", "chargeSchedules": schedules });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

async fn departure_times(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::DepartureTimes).vehicle(&vehicle_id);
    let sim = state.simulator.lock().await;
    let result = authorize(&sim, &headers)
        .and_then(|_| sim.departure_times(&vehicle_id))
        .map(|next| {
            let body = json!({ "status": "SUCCESS", "departureTimes": next });
            with_vehicle_id(Json(body), &vehicle_id)
        });
    respond(&ctx, result)
}

async fn image(
    state: AppState,
    vehicle_id: String,
    query: ImageQuery,
    headers: HeaderMap,
    kind: ImageKind,
    request: Request,
) -> Response {
    let ctx = RouteContext::new(ApiRoute::Image).vehicle(&vehicle_id);
    let file_name = {
        let sim = state.simulator.lock().await;
        match authorize(&sim, &headers).and_then(|_| sim.image(&vehicle_id, &query, kind)) {
            Ok(name) => name,
            Err(err) => return error_response(&err, &ctx),
        }
    };

    let path = state.images_dir.join(file_name);
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => with_vehicle_id(response.map(Body::new), &vehicle_id),
        Err(never) => match never {},
    }
}

fn image_route(kind: ImageKind) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>,
              Path(vehicle_id): Path<String>,
              Query(query): Query<ImageQuery>,
              headers: HeaderMap,
              request: Request| { image(state, vehicle_id, query, headers, kind, request) },
    )
}

pub fn build_router(state: AppState) -> Router {
    let vehicle = |suffix: &str| format!("{}/{{vehicle_id}}{}", API_PREFIX, suffix);

    let mut router = Router::new()
        .route(TOKEN_PATH, post(token))
        .route(API_PREFIX, get(list_vehicles))
        .route(&vehicle(""), get(vehicle_info))
        .route(&vehicle("/location"), get(location).merge(command_route(CommandKind::Location)))
        .route(&vehicle("/chargeSchedules"), get(charge_schedules))
        .route(&vehicle("/departureTimes"), get(departure_times))
        .route(
            &vehicle("/statusrefresh/{command_id}"),
            get(status_refresh),
        )
        .route(&vehicle("/images/full"), image_route(ImageKind::Full))
        .route(&vehicle("/images/thumbnail"), image_route(ImageKind::Thumbnail))
        .route("/sim/today", post(sim::set_today))
        .route("/sim/{control}/{vehicle_id}", post(sim::set_control));

    for kind in [
        CommandKind::Unlock,
        CommandKind::Lock,
        CommandKind::StartEngine,
        CommandKind::StopEngine,
        CommandKind::Wake,
        CommandKind::Status,
        CommandKind::StartCharge,
        CommandKind::StopCharge,
    ] {
        router = router.route(&vehicle(&format!("/{}", kind)), command_route(kind));
    }
    for kind in [
        CommandKind::Unlock,
        CommandKind::Lock,
        CommandKind::StartEngine,
        CommandKind::StopEngine,
    ] {
        router = router.route(&vehicle(&format!("/{}/{{command_id}}", kind)), poll_route(kind));
    }

    router
        .fallback(not_supported)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let (addr, parsed_ok): (SocketAddr, bool) = match host.parse::<IpAddr>() {
        Ok(ip) => (SocketAddr::new(ip, port), true),
        Err(_) => (([127, 0, 0, 1], port).into(), false),
    };
    if !parsed_ok {
        logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Simulator listening at http://{}:{} (token {}, API {})",
        local_addr.ip(),
        local_addr.port(),
        TOKEN_PATH,
        API_PREFIX
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
