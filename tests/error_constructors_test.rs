use connect_sim::error::SimError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        SimError::token_unknown("x"),
        SimError::TokenUnknown { .. }
    ));
    assert!(matches!(
        SimError::token_expired("x"),
        SimError::TokenExpired { .. }
    ));
    assert!(matches!(
        SimError::invalid_grant("x"),
        SimError::InvalidGrant { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(
        SimError::vehicle_not_found("x"),
        SimError::VehicleNotFound { .. }
    ));
    assert!(matches!(
        SimError::command_not_found("x"),
        SimError::CommandNotFoundOrExpired { .. }
    ));
    assert!(matches!(
        SimError::bad_parameter("level", "m"),
        SimError::BadParameter { .. }
    ));
}

#[test]
fn error_constructors_group_3() {
    assert!(matches!(SimError::config("x"), SimError::Config { .. }));
    assert!(matches!(
        SimError::validation("f", "m"),
        SimError::Config { .. }
    ));
    assert!(matches!(SimError::io("x"), SimError::Io { .. }));
    assert!(matches!(SimError::internal("x"), SimError::Internal { .. }));
}

#[test]
fn io_and_json_errors_convert() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(SimError::from(io), SimError::Io { .. }));

    let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(SimError::from(json), SimError::Serialization { .. }));
}
