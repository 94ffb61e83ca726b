//! Error types and handling for connect-sim
//!
//! Every condition the simulated API reports to a client is a variant here.
//! The web layer maps each variant to one fixed status code and body shape, so
//! none of these are "unexpected" failures. `Config`, `Io`, `Serialization`
//! and `Internal` are the only variants that end up as a 500.

use thiserror::Error;

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Main error type for connect-sim
#[derive(Debug, Error)]
pub enum SimError {
    /// Bearer token was never issued
    #[error("Token unknown: {token}")]
    TokenUnknown { token: String },

    /// Bearer token was issued but is past its expiry
    #[error("Token expired: {token}")]
    TokenExpired { token: String },

    /// Authorization code does not match or is past its expiry
    #[error("Authorization code invalid or expired")]
    AuthorizationCodeInvalidOrExpired,

    /// Token endpoint rejected the request for another reason
    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    /// Application-Id header absent
    #[error("Application-Id header missing")]
    MissingApplicationId,

    /// Application-Id header present but not recognized
    #[error("Application-Id header invalid")]
    InvalidApplicationId,

    /// Vehicle id is not exactly 32 characters
    #[error("Invalid vehicleId length: {vehicle_id}")]
    BadVehicleIdLength { vehicle_id: String },

    /// No vehicle with this id
    #[error("Vehicle not found: {vehicle_id}")]
    VehicleNotFound { vehicle_id: String },

    /// Vehicle exists but its authorization indicator is not set
    #[error("Vehicle not authorized: {vehicle_id}")]
    VehicleUnauthorized { vehicle_id: String },

    /// Vehicle cannot run this command (EV-only command on an ICE vehicle)
    #[error("Vehicle {vehicle_id} not supported for this command")]
    VehicleUnsupportedForCommand { vehicle_id: String },

    /// Vehicle has no data for the requested resource
    #[error("Vehicle {vehicle_id} not acceptable for this request")]
    VehicleNotAcceptable { vehicle_id: String },

    /// Simulation control targeted a non-EV vehicle with an EV-only setting
    #[error("vehicleId is not an EV vehicle.")]
    NotAnEv { vehicle_id: String },

    /// Command id unknown for this vehicle, or past the command timeout
    #[error("Command not found or expired: {command_id}")]
    CommandNotFoundOrExpired { command_id: String },

    /// Required image query parameter absent
    #[error("Image parameter missing: {name}")]
    ImageParameterMissing { name: String },

    /// Out-of-range or unparseable input
    #[error("Bad parameter: {name} - {message}")]
    BadParameter { name: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Malformed internal state
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SimError {
    pub fn token_unknown<S: Into<String>>(token: S) -> Self {
        SimError::TokenUnknown {
            token: token.into(),
        }
    }

    pub fn token_expired<S: Into<String>>(token: S) -> Self {
        SimError::TokenExpired {
            token: token.into(),
        }
    }

    pub fn invalid_grant<S: Into<String>>(message: S) -> Self {
        SimError::InvalidGrant {
            message: message.into(),
        }
    }

    pub fn vehicle_not_found<S: Into<String>>(vehicle_id: S) -> Self {
        SimError::VehicleNotFound {
            vehicle_id: vehicle_id.into(),
        }
    }

    pub fn command_not_found<S: Into<String>>(command_id: S) -> Self {
        SimError::CommandNotFoundOrExpired {
            command_id: command_id.into(),
        }
    }

    /// Create a new bad-parameter error
    pub fn bad_parameter<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        SimError::BadParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SimError::Config {
            message: message.into(),
        }
    }

    /// Configuration field failed validation
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        SimError::Config {
            message: format!("{}: {}", field.into(), message.into()),
        }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        SimError::Io {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        SimError::Internal {
            message: message.into(),
        }
    }

    /// True for both flavors of bearer-token failure
    pub fn is_token_failure(&self) -> bool {
        matches!(
            self,
            SimError::TokenUnknown { .. } | SimError::TokenExpired { .. }
        )
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SimError {
    fn from(err: serde_yaml::Error) -> Self {
        SimError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SimError::config("test config error");
        assert!(matches!(err, SimError::Config { .. }));

        let err = SimError::bad_parameter("time", "must be hh:mm");
        assert!(matches!(err, SimError::BadParameter { .. }));

        assert!(SimError::token_unknown("x").is_token_failure());
        assert!(SimError::token_expired("x").is_token_failure());
        assert!(!SimError::command_not_found("x").is_token_failure());
    }

    #[test]
    fn test_error_display() {
        let err = SimError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = SimError::bad_parameter("day", "unknown day");
        assert_eq!(format!("{}", err), "Bad parameter: day - unknown day");
    }
}
