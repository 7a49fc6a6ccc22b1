// crates/plan-review-cli/src/tests.rs
// ============================================================================
// Module: CLI Library Tests
// Description: Unit tests for input limits, exit codes and port wiring.
// Purpose: Ensure bounded reads fail closed and optional ports stay optional.
// Dependencies: plan-review-cli, plan-review-config, tempfile
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use plan_review_config::AccessToken;
use plan_review_config::PlanReviewConfig;
use plan_review_core::ErrorClass;
use serde_json::Value;

use crate::EXIT_INPUT;
use crate::EXIT_TRANSIENT;
use crate::exit_code_for;
use crate::input::InputError;
use crate::input::read_bytes_with_limit;
use crate::input::read_json_input;
use crate::input::read_limited;
use crate::ports;
use crate::ports::SetupError;

// ============================================================================
// SECTION: Input
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.json");
    fs::write(&path, b"ok").unwrap();
    assert_eq!(read_bytes_with_limit(&path, 16).unwrap(), b"ok");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.json");
    fs::write(&path, vec![0_u8; 9]).unwrap();
    let err = read_bytes_with_limit(&path, 8).unwrap_err();
    assert!(matches!(err, InputError::TooLarge { size: 9, limit: 8 }));
}

#[test]
fn read_limited_rejects_long_streams() {
    let err = read_limited(&[1_u8; 32][..], 31).unwrap_err();
    assert!(matches!(err, InputError::TooLarge { limit: 31, .. }));
    assert_eq!(read_limited(&[1_u8; 4][..], 4).unwrap().len(), 4);
}

#[test]
fn read_json_input_parses_file() {
    let dir = tempfile::tempdir().unwrap();
    let path: PathBuf = dir.path().join("input.json");
    fs::write(&path, br#"{"bucket":"b","key":"k"}"#).unwrap();
    let value: Value = read_json_input(Some(&path)).unwrap();
    assert_eq!(value["bucket"], "b");

    fs::write(&path, b"{not json").unwrap();
    let err = read_json_input::<Value>(Some(&path)).unwrap_err();
    assert!(matches!(err, InputError::Json(_)));
}

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

#[test]
fn exit_codes_follow_error_class() {
    assert_eq!(exit_code_for(ErrorClass::Input), EXIT_INPUT);
    assert_eq!(exit_code_for(ErrorClass::Transient), EXIT_TRANSIENT);
}

// ============================================================================
// SECTION: Ports
// ============================================================================

#[test]
fn pull_request_source_is_optional() {
    let mut config = PlanReviewConfig::default();
    assert!(ports::pull_request_source(&config).unwrap().is_none());
    config.pr_gate.token = Some(AccessToken::new("token".to_string()));
    assert!(ports::pull_request_source(&config).unwrap().is_some());
}

#[test]
fn notifier_requires_webhook() {
    let mut config = PlanReviewConfig::default();
    let err = ports::notifier(&config).err().expect("webhook required");
    assert!(matches!(err, SetupError::Notifier(message) if message.contains("SLACK_WEBHOOK_URL")));
    config.notifier.webhook_url = Some("https://hooks.example.com/services/x".to_string());
    assert!(ports::notifier(&config).is_ok());
}
