//! Error message quality tests
//!
//! Tests that verify error messages are helpful and distinguishable.

use kibana_exporter::error::ExporterError;

#[test]
fn test_config_error_message_clarity() {
    // Given: A configuration error
    let error = ExporterError::Config("config must have the field name set".to_string());

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Message should clearly indicate configuration issue
    assert!(message.contains("Configuration error"));
    assert!(message.contains("name"));
}

#[test]
fn test_invalid_field_names_target_field_and_value() {
    // Given: An invalid field error
    let error = ExporterError::invalid_field("production", "skip-tls", "perhaps");

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Target, field and value are all reported
    assert!(message.starts_with("Configuration error"));
    assert!(message.contains("production"));
    assert!(message.contains("'skip-tls'"));
    assert!(message.contains("perhaps"));
}

#[test]
fn test_transport_error_keeps_status_line() {
    let error =
        ExporterError::Transport("invalid response from Kibana status: 401 Unauthorized".to_string());

    let message = format!("{}", error);

    assert!(message.starts_with("Transport error"));
    assert!(message.contains("401 Unauthorized"));
}

#[test]
fn test_decode_error_carries_raw_body() {
    // Given: A JSON decoding error and the body that caused it
    let source = serde_json::from_str::<serde_json::Value>("{\"status\":").unwrap_err();
    let error = ExporterError::Decode {
        source,
        body: "{\"status\":".to_string(),
    };

    // When: Converting to string
    let message = format!("{}", error);

    // Then: Both the cause and the problematic content are shown
    assert!(message.starts_with("Decode error"));
    assert!(message.contains("Problematic content"));
    assert!(message.contains("{\"status\":"));
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_error_messages_are_distinguishable() {
    // Given: Different error types
    let config_err = format!("{}", ExporterError::Config("test".to_string()));
    let transport_err = format!("{}", ExporterError::Transport("test".to_string()));
    let decode_err = format!(
        "{}",
        ExporterError::Decode {
            source: serde_json::from_str::<serde_json::Value>("x").unwrap_err(),
            body: "test".to_string(),
        }
    );

    // Then: Each should have a unique prefix
    assert!(config_err.starts_with("Configuration error"));
    assert!(transport_err.starts_with("Transport error"));
    assert!(decode_err.starts_with("Decode error"));

    assert_ne!(config_err, transport_err);
    assert_ne!(transport_err, decode_err);
}

#[test]
fn test_prometheus_error_conversion() {
    let error: ExporterError = prometheus::Error::Msg("bad metric name".to_string()).into();

    assert!(format!("{}", error).starts_with("Prometheus error"));
}

#[test]
fn test_error_debug_format() {
    let error = ExporterError::Transport("connection refused".to_string());

    let debug_message = format!("{:?}", error);

    assert!(debug_message.contains("Transport"));
    assert!(debug_message.contains("connection refused"));
}
