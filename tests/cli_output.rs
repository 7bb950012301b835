//! Tests for CLI output formatting.
//!
//! - JSON output with --json flag
//! - Pretty-print output as default

use axum::http::StatusCode;
use http_doubles::{Double, DoubleRow, PrettyPrint, Server, ServerConfig};
use tabled::Table;

// ============================================================================
// JSON Output Tests
// ============================================================================

#[test]
fn test_json_output_round_trips_through_config() {
    // `check --json` prints the doubles; that output must load back as config
    let config = ServerConfig::from_path("tests/fixtures/doubles.json").unwrap();
    let doubles = config.doubles.clone().unwrap();
    let json_output = serde_json::to_string_pretty(&doubles).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json_output).unwrap();
    assert!(parsed.is_array());
    assert_eq!(parsed.as_array().unwrap().len(), 3);

    let reloaded = ServerConfig::from_value(serde_json::json!({ "doubles": parsed })).unwrap();
    assert_eq!(reloaded.doubles, config.doubles);
}

#[test]
fn test_json_output_uses_wire_field_names() {
    let double = Double::get("http://localhost:8001/redirect-from")
        .unwrap()
        .with_redirect(StatusCode::FOUND, "http://google.com")
        .with_attachment("tests/resources/bundle.js");

    let parsed = serde_json::to_value(&double).unwrap();

    assert_eq!(parsed["request"]["method"], "GET");
    assert_eq!(parsed["response"]["redirectURL"], "http://google.com");
    assert_eq!(parsed["response"]["status"], 302);
    assert_eq!(parsed["attachment"]["pathToFile"], "tests/resources/bundle.js");
}

// ============================================================================
// Pretty-Print Tests
// ============================================================================

#[test]
fn test_default_output_is_not_json() {
    let double = make_test_double();
    let pretty_output = double.pretty_print();

    let parse_result: Result<serde_json::Value, _> = serde_json::from_str(&pretty_output);
    assert!(
        parse_result.is_err(),
        "Default output should NOT be valid JSON"
    );
}

#[test]
fn test_double_pretty_print_shows_key_fields() {
    let output = make_test_double().pretty_print();

    assert!(
        output.contains("POST http://localhost:8001/some-example"),
        "Should show method and url"
    );
    assert!(output.contains("Route"), "Should have Route label");
    assert!(output.contains("201"), "Should show status");
    assert!(output.contains("\"name\":\"Test\""), "Should show data");
}

#[tokio::test]
async fn test_response_pretty_print_shows_status_and_body() {
    let server = Server::builder()
        .double(Double::get("http://localhost:8001/plain").unwrap().with_data("plainTextPayload"))
        .build();

    let output = server
        .request("GET", "http://localhost:8001/plain")
        .await
        .unwrap()
        .pretty_print();

    assert!(output.contains("200 OK"), "Should show status");
    assert!(output.contains("text/html; charset=utf-8"), "Should show content type");
    assert!(output.ends_with("plainTextPayload"), "Should end with the body");
}

#[test]
fn test_check_listing_is_table_of_doubles() {
    // `check` prints one `DoubleRow` per double with `tabled`
    let config = ServerConfig::from_path("tests/fixtures/doubles.json").unwrap();
    let rows: Vec<DoubleRow> = config
        .doubles
        .unwrap()
        .iter()
        .map(DoubleRow::from)
        .collect();

    let kinds: Vec<&str> = rows.iter().map(|row| row.response.as_str()).collect();
    assert_eq!(
        kinds,
        [
            "json",
            "fixture arbitraryFixture.json",
            "redirect to http://google.com"
        ]
    );

    let table_output = Table::new(rows).to_string();

    assert!(table_output.contains("method"), "Should have column headers");
    assert!(table_output.contains("response"), "Should have column headers");
    assert!(table_output.contains("http://localhost:8001/some-example"));
    assert!(table_output.contains("201"));
}

// ============================================================================
// Test Helpers
// ============================================================================

fn make_test_double() -> Double {
    Double::from_value(serde_json::json!({
        "request": { "method": "POST", "url": "http://localhost:8001/some-example" },
        "response": { "status": 201, "data": { "name": "Test" } }
    }))
    .unwrap()
}
