//! Error bodies of the simulated API
//!
//! The remote service answers each failure with a fixed status and JSON shape,
//! and some shapes vary with the route (a 404 on a charge command carries
//! `commandStatus: FAILED`, on other commands `EMPTY`, on the chargeSchedules
//! query `chargeSchedules: null`). [`RouteContext`] carries what is needed to
//! pick the right variant.

use crate::command::CommandKind;
use crate::error::SimError;
use crate::logging::get_logger;
use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

pub const VEHICLE_ID_HEADER: HeaderName = HeaderName::from_static("vehicleid");

const MISSING_KEY: &str = "Access denied due to missing subscription key. Make sure to include subscription key when making requests to an API.";
const INVALID_KEY: &str = "Access denied due to invalid subscription key. Make sure to provide a valid key for an active subscription.";
const BAD_VEHICLE_ID: &str = "getVehicleV3.vehicleId: Invalid vehicleId, getVehicleV3.vehicleId: size must be between 32 and 32";

/// Route families whose error bodies differ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRoute {
    Vehicles,
    VehicleInfo,
    CommandPost(CommandKind),
    CommandPoll(CommandKind),
    StatusRefresh,
    Location,
    ChargeSchedules,
    DepartureTimes,
    Image,
    Simulation,
}

#[derive(Debug, Clone)]
pub struct RouteContext {
    pub route: ApiRoute,
    pub vehicle_id: Option<String>,
    pub command_id: Option<String>,
}

impl RouteContext {
    pub fn new(route: ApiRoute) -> Self {
        Self {
            route,
            vehicle_id: None,
            command_id: None,
        }
    }

    pub fn vehicle(mut self, vehicle_id: &str) -> Self {
        self.vehicle_id = Some(vehicle_id.to_string());
        self
    }

    pub fn command(mut self, command_id: &str) -> Self {
        self.command_id = Some(command_id.to_string());
        self
    }
}

/// Echo the requested vehicle id in the `Vehicleid` header
pub fn with_vehicle_id(response: impl IntoResponse, vehicle_id: &str) -> Response {
    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(vehicle_id) {
        response.headers_mut().insert(VEHICLE_ID_HEADER, value);
    }
    response
}

fn unauthorized_user(command_id: Option<&str>) -> Value {
    let mut body = json!({
        "error": {
            "code": 3000,
            "title": "Unauthorized user",
            "details": "The user is unauthorized.",
            "statusCode": "UNAUTHORIZED",
        },
        "status": "FAILED",
        "commandStatus": "FAILED",
    });
    if let Some(id) = command_id {
        body["commandId"] = json!(id);
    }
    body
}

fn not_found(route: ApiRoute) -> Value {
    let mut body = json!({
        "error": {
            "code": 4002,
            "title": "Resource not found",
            "details": "The resource was not found.",
            "statusCode": "NOT_FOUND",
        },
        "status": "FAILED",
    });
    match route {
        ApiRoute::CommandPost(kind) if kind.requires_ev() => {
            body["commandStatus"] = json!("FAILED");
        }
        ApiRoute::CommandPost(_) | ApiRoute::CommandPoll(_) | ApiRoute::Simulation => {
            body["commandStatus"] = json!("EMPTY");
        }
        ApiRoute::ChargeSchedules => body["chargeSchedules"] = Value::Null,
        ApiRoute::DepartureTimes => body["departureTimes"] = Value::Null,
        _ => {}
    }
    body
}

fn not_acceptable(route: ApiRoute) -> Value {
    let mut body = json!({
        "error": {
            "code": 4006,
            "title": "Not Acceptable",
            "details": "Not acceptable",
            "statusCode": "NOT_ACCEPTABLE",
        },
        "status": "FAILED",
    });
    if route == ApiRoute::DepartureTimes {
        body["departureTimes"] = Value::Null;
    }
    body
}

fn unsupported_vehicle() -> Value {
    json!({
        "error": {
            "code": 4006,
            "title": "Vehicle not supported for this command",
            "details": "Vehicle not supported for this command",
            "statusCode": "NOT_ACCEPTABLE",
        },
        "status": "FAILED",
        "commandStatus": "FAILED",
    })
}

/// Body of a failed simulation control
pub fn sim_error(message: &str) -> Value {
    json!({ "status": "ERROR", "msg": message })
}

/// Message a client sees for a parameter-level failure
fn client_message(err: &SimError) -> String {
    match err {
        SimError::BadParameter { message, .. } | SimError::InvalidGrant { message } => {
            message.clone()
        }
        SimError::VehicleNotAcceptable { .. } => {
            "vehicleId has no simulated vehicle status.".to_string()
        }
        other => other.to_string(),
    }
}

/// Map an error to the status and body the remote service would send
pub fn error_response(err: &SimError, ctx: &RouteContext) -> Response {
    let (status, body) = match err {
        SimError::MissingApplicationId => (
            StatusCode::UNAUTHORIZED,
            json!({ "statusCode": 401, "message": MISSING_KEY }),
        ),
        SimError::InvalidApplicationId => (
            StatusCode::UNAUTHORIZED,
            json!({ "statusCode": 401, "message": INVALID_KEY }),
        ),
        SimError::TokenUnknown { token } | SimError::TokenExpired { token } => (
            StatusCode::UNAUTHORIZED,
            json!({
                "error": "invalid_token",
                "error_description": format!("Access token expired: {}", token),
            }),
        ),
        SimError::BadVehicleIdLength { .. } => {
            let body = json!({ "errorCode": "400", "errorMessage": BAD_VEHICLE_ID });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
        SimError::VehicleNotFound { .. } => (StatusCode::NOT_FOUND, not_found(ctx.route)),
        SimError::VehicleUnauthorized { .. } => {
            (StatusCode::UNAUTHORIZED, unauthorized_user(None))
        }
        SimError::CommandNotFoundOrExpired { .. } => (
            StatusCode::UNAUTHORIZED,
            unauthorized_user(ctx.command_id.as_deref()),
        ),
        SimError::VehicleUnsupportedForCommand { .. } => {
            (StatusCode::NOT_ACCEPTABLE, unsupported_vehicle())
        }
        SimError::VehicleNotAcceptable { .. } if ctx.route != ApiRoute::Simulation => {
            (StatusCode::NOT_ACCEPTABLE, not_acceptable(ctx.route))
        }
        SimError::ImageParameterMissing { .. } => (
            StatusCode::NOT_FOUND,
            json!({ "statusCode": 404, "message": "Resource not found" }),
        ),
        SimError::BadParameter { .. }
        | SimError::NotAnEv { .. }
        | SimError::VehicleNotAcceptable { .. }
        | SimError::InvalidGrant { .. }
        | SimError::AuthorizationCodeInvalidOrExpired => {
            let message = client_message(err);
            let body = if ctx.route == ApiRoute::Simulation {
                sim_error(&message)
            } else {
                json!({ "errorCode": "400", "errorMessage": message })
            };
            (StatusCode::BAD_REQUEST, body)
        }
        SimError::Config { .. }
        | SimError::Io { .. }
        | SimError::Serialization { .. }
        | SimError::Internal { .. } => {
            get_logger("web").error(&format!("Request failed: {}", err));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "status": "FAILED", "error": err.to_string() }),
            )
        }
    };

    match ctx.vehicle_id.as_deref() {
        Some(id) => with_vehicle_id((status, Json(body)), id),
        None => (status, Json(body)).into_response(),
    }
}

/// Token endpoint failures are reported in a 200 body
pub fn token_error(err: &SimError) -> Response {
    let body = json!({
        "error": "invalid request",
        "error_description": format!("ERROR: {}", client_message(err)),
    });
    (StatusCode::OK, Json(body)).into_response()
}
