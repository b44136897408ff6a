use helios::error::HeliosError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        HeliosError::config("x"),
        HeliosError::Config { .. }
    ));
    assert!(matches!(
        HeliosError::remote("x"),
        HeliosError::Remote { .. }
    ));
    assert!(matches!(
        HeliosError::missing_field("x"),
        HeliosError::MissingField { .. }
    ));
    assert!(matches!(HeliosError::io("x"), HeliosError::Io { .. }));
}

#[test]
fn error_constructors_group_2() {
    assert!(matches!(HeliosError::auth("x"), HeliosError::Auth { .. }));
    assert!(matches!(
        HeliosError::validation("f", "m"),
        HeliosError::Validation { .. }
    ));
    assert!(matches!(
        HeliosError::timeout("x"),
        HeliosError::Timeout { .. }
    ));
}

#[test]
fn display_messages() {
    let e = HeliosError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = HeliosError::missing_field("charger_voltage");
    assert_eq!(e.to_string(), "Missing field: charger_voltage");
}

#[test]
fn json_errors_convert_to_serialization() {
    let err: HeliosError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(err, HeliosError::Serialization { .. }));
    assert!(!err.is_retryable());
}
