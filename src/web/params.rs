//! Query-string coercion for the simulation controls

use crate::error::{Result, SimError};
use std::collections::HashMap;

pub type Params = HashMap<String, String>;

/// Lowercase a value, folding the dotted and dotless i variants to `i`
fn fold(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| *c != '\u{307}')
        .map(|c| if c == 'ı' { 'i' } else { c })
        .collect()
}

pub fn to_boolean(value: &str) -> Option<bool> {
    match fold(value.trim()).as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Door name as reported in `doorStatus`
pub fn to_door(value: &str) -> Option<&'static str> {
    let value = fold(value.trim());
    if value.contains("front") {
        Some("UNSPECIFIED_FRONT")
    } else if value.contains("hood") {
        Some("HOOD_DOOR")
    } else if value.contains("tailgate") {
        if value.contains("inner") {
            Some("INNER_TAILGATE")
        } else if value == "tailgate" {
            Some("TAILGATE")
        } else {
            None
        }
    } else if value.contains("rear") {
        if value.contains("left") {
            Some("REAR_LEFT")
        } else if value.contains("right") {
            Some("REAR_RIGHT")
        } else {
            None
        }
    } else {
        None
    }
}

pub fn to_role(value: &str) -> Option<&'static str> {
    match fold(value.trim()).as_str() {
        "driver" => Some("DRIVER"),
        "passenger" => Some("PASSENGER"),
        v if v.starts_with('n') => Some("NOT_APPLICABLE"),
        _ => None,
    }
}

pub fn to_door_state(value: &str) -> Option<&'static str> {
    match fold(value.trim()).as_str() {
        "open" => Some("OPEN"),
        "closed" => Some("CLOSED"),
        _ => None,
    }
}

/// Required boolean parameter
pub fn boolean(params: &Params, name: &str) -> Result<bool> {
    params
        .get(name)
        .and_then(|v| to_boolean(v))
        .ok_or_else(|| {
            SimError::bad_parameter(name, format!("parameter '{}' must be (true or false).", name))
        })
}

/// Optional boolean parameter; present but unrecognised is an error
pub fn optional_boolean(params: &Params, name: &str) -> Result<Option<bool>> {
    match params.get(name) {
        None => Ok(None),
        Some(_) => boolean(params, name).map(Some),
    }
}

/// Lowercased keyword parameter
pub fn keyword(params: &Params, name: &str) -> Option<String> {
    params.get(name).map(|v| fold(v.trim()))
}

/// Optional numeric parameter; `message` names the accepted range
pub fn number(params: &Params, name: &str, message: &str) -> Result<Option<f64>> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| SimError::bad_parameter(name, message)),
    }
}

pub fn required_number(params: &Params, name: &str, message: &str) -> Result<f64> {
    number(params, name, message)?.ok_or_else(|| SimError::bad_parameter(name, message))
}
