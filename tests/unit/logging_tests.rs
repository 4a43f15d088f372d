// Logging tests
//
// The subscriber is process-global: whichever test installs it first wins
// and every later installation reports an error.

use proofstamp::logging::{init_subscriber, LogFormat};

// Test: Can initialize tracing subscriber and log through it
#[test]
fn test_can_initialize_tracing_subscriber() {
    let _ = init_subscriber(LogFormat::Json);
    tracing::info!(width = 1920, height = 1080, "Structured event after init");
}

// Test: Second initialization surfaces the already-installed error
#[test]
fn test_reinitialization_is_reported() {
    let _ = init_subscriber(LogFormat::Text);
    let result = init_subscriber(LogFormat::Json);
    assert!(result.is_err(), "A second global subscriber must be rejected");
}

// Test: Log format names round-trip through FromStr and Display
#[test]
fn test_log_format_names() {
    for format in [LogFormat::Text, LogFormat::Json] {
        assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
    }
    assert_eq!(LogFormat::default(), LogFormat::Text);
}
