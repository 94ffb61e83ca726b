//! Simulation controls under `/sim`
//!
//! These routes mutate the fleet directly and skip the token check.

use super::params::{self, Params};
use super::reply::{ApiRoute, RouteContext, error_response, sim_error, with_vehicle_id};
use super::{AppState, not_supported};
use crate::engine::Simulator;
use crate::error::{Result, SimError};
use crate::logging::{LogContext, StructuredLogger};
use crate::state::{AlarmState, LockState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Settable aspects of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimControl {
    Psi,
    Modem,
    DeepSleep,
    Firmware,
    Plug,
    Alarm,
    Locks,
    Door,
    Battery,
    Fuel,
    Location,
}

impl SimControl {
    pub fn from_segment(segment: &str) -> Option<Self> {
        Some(match segment {
            "psi" => SimControl::Psi,
            "modem" => SimControl::Modem,
            "deepsleep" => SimControl::DeepSleep,
            "firmware" => SimControl::Firmware,
            "plug" => SimControl::Plug,
            "alarm" => SimControl::Alarm,
            "locks" => SimControl::Locks,
            "door" => SimControl::Door,
            "battery" => SimControl::Battery,
            "fuel" => SimControl::Fuel,
            "location" => SimControl::Location,
            _ => return None,
        })
    }
}

fn success(msg: &str) -> Json<serde_json::Value> {
    Json(json!({ "status": "SUCCESS", "msg": msg }))
}

pub async fn set_today(State(state): State<AppState>, Query(query): Query<Params>) -> Response {
    let mut sim = state.simulator.lock().await;
    match sim.set_today(
        query.get("day").map(String::as_str),
        query.get("time").map(String::as_str),
    ) {
        Ok(_) => success("Date set successfully.").into_response(),
        Err(SimError::BadParameter { message, .. }) => {
            (StatusCode::BAD_REQUEST, Json(sim_error(&message))).into_response()
        }
        Err(err) => (StatusCode::BAD_REQUEST, Json(sim_error(&err.to_string()))).into_response(),
    }
}

pub async fn set_control(
    State(state): State<AppState>,
    Path((control, vehicle_id)): Path<(String, String)>,
    Query(query): Query<Params>,
) -> Response {
    let Some(kind) = SimControl::from_segment(&control) else {
        return not_supported().await.into_response();
    };
    let ctx = RouteContext::new(ApiRoute::Simulation).vehicle(&vehicle_id);
    let logger = StructuredLogger::new(
        LogContext::new("sim")
            .with_vehicle_id(&vehicle_id)
            .with_field("control", control),
    );
    let mut sim = state.simulator.lock().await;
    match apply(&mut sim, kind, &vehicle_id, &query) {
        Ok(msg) => {
            logger.info(&msg);
            with_vehicle_id(success(&msg), &vehicle_id)
        }
        Err(err) => {
            logger.warn(&format!("Control rejected: {}", err));
            error_response(&err, &ctx)
        }
    }
}

/// Apply one control; the vehicle is resolved before parameters are read
pub fn apply(
    sim: &mut Simulator,
    control: SimControl,
    vehicle_id: &str,
    query: &Params,
) -> Result<String> {
    let now = sim.now();
    let record = sim.vehicle_mut(vehicle_id)?;

    let msg = match control {
        SimControl::Psi => {
            let warning = params::boolean(query, "warning")?;
            record.set_tire_pressure_warning(warning)?;
            format!("PSI warning set to {} successfully.", warning)
        }
        SimControl::Modem => {
            let enabled = params::boolean(query, "enabled")?;
            record.set_modem_enabled(enabled);
            format!("Modem enabled set to {} successfully.", enabled)
        }
        SimControl::DeepSleep => {
            let sleep = params::boolean(query, "sleep")?;
            record.set_deep_sleep(sleep)?;
            format!("Deep sleep set to {} successfully.", sleep)
        }
        SimControl::Firmware => {
            let upgrade = params::boolean(query, "upgrade")?;
            record.set_firmware_upgrade(upgrade)?;
            format!("Firmware upgrade in progress set to {} successfully.", upgrade)
        }
        SimControl::Plug => {
            if !record.is_ev() {
                return Err(SimError::NotAnEv {
                    vehicle_id: vehicle_id.to_string(),
                });
            }
            let connected = params::boolean(query, "connected")?;
            record.set_plug_connected(connected, now)?;
            format!("Plug status set to {} successfully.", connected)
        }
        SimControl::Alarm => {
            let state = alarm_state(query)?;
            record.set_alarm(state, now);
            format!("Alarm set to {} successfully.", state.as_str())
        }
        SimControl::Locks => {
            let state = match params::keyword(query, "state").as_deref() {
                Some("locked") => LockState::Locked,
                Some("unlocked") => LockState::Unlocked,
                Some("error") => LockState::Error,
                _ => {
                    return Err(SimError::bad_parameter(
                        "state",
                        "parameter 'state' must be (locked, unlocked, error).",
                    ));
                }
            };
            record.set_locks(state, now);
            format!("Locks set to {} successfully.", state.as_str())
        }
        SimControl::Door => {
            let door = query
                .get("door")
                .and_then(|v| params::to_door(v))
                .ok_or_else(|| {
                    SimError::bad_parameter(
                        "door",
                        "parameter 'door' must be (front, hood, tailgate, inner tailgate, rear left, rear right).",
                    )
                })?;
            let role = match query.get("role") {
                None => None,
                Some(raw) => Some(params::to_role(raw).ok_or_else(|| {
                    SimError::bad_parameter(
                        "role",
                        "parameter 'role' must be (driver, passenger, not applicable).",
                    )
                })?),
            };
            let state = query
                .get("state")
                .and_then(|v| params::to_door_state(v))
                .ok_or_else(|| {
                    SimError::bad_parameter("state", "parameter 'state' must be (open or closed).")
                })?;
            record.set_door(door, role, state, now)?;
            format!("Door {} set to {} successfully.", door, state)
        }
        SimControl::Battery => {
            let (level, distance) = level_and_distance(query)?;
            record.set_battery(level, distance, now)?;
            format!("Battery level set to {} successfully.", level)
        }
        SimControl::Fuel => {
            let (level, distance) = level_and_distance(query)?;
            record.set_fuel(level, distance, now)?;
            format!("Fuel level set to {} successfully.", level)
        }
        SimControl::Location => {
            let lat = params::required_number(
                query,
                "lat",
                "parameter 'lat' must be a number between -90 and 90.",
            )?;
            let long = params::required_number(
                query,
                "long",
                "parameter 'long' must be a number between -180 and 180.",
            )?;
            let speed = params::number(
                query,
                "speed",
                "parameter 'speed' must be a number greater than or equal to 0.",
            )?;
            let direction = query.get("direction").map(String::as_str);
            record.set_location(lat, long, speed, direction, now)?;
            format!("Location set to {:.6}, {:.6} successfully.", lat, long)
        }
    };
    Ok(msg)
}

fn alarm_state(query: &Params) -> Result<AlarmState> {
    let triggered = params::optional_boolean(query, "triggered")?.unwrap_or(false);
    let enabled = params::keyword(query, "enabled");
    if enabled.as_deref() == Some("error") {
        return Ok(AlarmState::Error);
    }
    match enabled.as_deref().and_then(params::to_boolean) {
        Some(true) if triggered => Ok(AlarmState::Triggered),
        Some(true) => Ok(AlarmState::Enabled),
        Some(false) => Ok(AlarmState::Disabled),
        None => Err(SimError::bad_parameter(
            "enabled",
            "parameter 'enabled' must be (true or false or error).",
        )),
    }
}

fn level_and_distance(query: &Params) -> Result<(f64, Option<f64>)> {
    let level = params::required_number(
        query,
        "level",
        "parameter 'level' must be a number between 0 and 100.",
    )?;
    let distance = params::number(
        query,
        "distance",
        "parameter 'distance' must be a number greater than or equal to 0.",
    )?;
    Ok((level, distance))
}
