//! Config load validation tests for plan-review-config.
// crates/plan-review-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config resolution, parsing and fail-closed checks.
// Purpose: Ensure config input handling is strict and defaults are safe.
// =============================================================================

#![allow(clippy::use_debug, reason = "Failure messages include debug renderings.")]

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use plan_review_config::ClaimBackend;
use plan_review_config::ConfigError;
use plan_review_config::PlanReviewConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn no_env(_: &str) -> Option<String> {
    None
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

fn assert_invalid(result: Result<PlanReviewConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn full_config_parses() -> TestResult {
    let file = write_config(
        r#"
[object_store]
region = "ap-northeast-2"
endpoint = "https://s3.example.test"
force_path_style = true

[links]
expiry_seconds = 900

[idempotency]
table = "plan-review-claims"
backend = "sqlite"
path = "/var/lib/plan-review/claims.db"

[notifier]
webhook_url = "https://hooks.example.test/services/T000"
timeout_ms = 2000

[pr_gate]
api_base_url = "https://github.example.test/api/v3"
"#,
    )?;
    let config =
        PlanReviewConfig::load_with_env(Some(file.path()), no_env).map_err(|e| e.to_string())?;
    if config.links.expiry() != Duration::from_secs(900) {
        return Err("expiry not parsed".to_string());
    }
    if config.idempotency.backend != ClaimBackend::Sqlite || !config.idempotency.is_enabled() {
        return Err("idempotency not parsed".to_string());
    }
    if config.notifier.timeout() != Duration::from_millis(2000) {
        return Err("notifier timeout not parsed".to_string());
    }
    if config.pr_gate.timeout() != Duration::from_secs(5) || config.pr_gate.is_enabled() {
        return Err("pr gate defaults wrong".to_string());
    }
    Ok(())
}

#[test]
fn env_config_path_is_used() -> TestResult {
    let file = write_config("[links]\nexpiry_seconds = 60\n")?;
    let path = file.path().to_string_lossy().to_string();
    let config = PlanReviewConfig::load_with_env(None, |name| {
        (name == "PLAN_REVIEW_CONFIG").then(|| path.clone())
    })
    .map_err(|err| err.to_string())?;
    if config.links.expiry_seconds != 60 {
        return Err("env config path ignored".to_string());
    }
    Ok(())
}

#[test]
fn missing_explicit_file_is_io_error() -> TestResult {
    match PlanReviewConfig::load_with_env(Some(Path::new("/nonexistent/plan-review.toml")), no_env)
    {
        Err(ConfigError::Io(_)) => Ok(()),
        other => Err(format!("expected io error, got {other:?}")),
    }
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&vec![b'#'; 1_048_577]).map_err(|err| err.to_string())?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(file.path()), no_env),
        "config file exceeds size limit",
    )
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(file.path()), no_env),
        "config file must be utf-8",
    )
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    let file = write_config("[links]\nexpiry = 60\n")?;
    match PlanReviewConfig::load_with_env(Some(file.path()), no_env) {
        Err(ConfigError::Parse(_)) => Ok(()),
        other => Err(format!("expected parse error, got {other:?}")),
    }
}

#[test]
fn expiry_out_of_range_is_rejected() -> TestResult {
    let zero = write_config("[links]\nexpiry_seconds = 0\n")?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(zero.path()), no_env),
        "links.expiry_seconds",
    )?;
    let week_plus = write_config("[links]\nexpiry_seconds = 604801\n")?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(week_plus.path()), no_env),
        "links.expiry_seconds",
    )
}

#[test]
fn sqlite_backend_requires_path() -> TestResult {
    let file = write_config("[idempotency]\ntable = \"claims\"\n")?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(file.path()), no_env),
        "idempotency.path is required",
    )
}

#[test]
fn table_name_charset_is_enforced() -> TestResult {
    let file = write_config(
        "[idempotency]\ntable = \"claims; drop\"\nbackend = \"object_store\"\n",
    )?;
    assert_invalid(PlanReviewConfig::load_with_env(Some(file.path()), no_env), "idempotency.table")
}

#[test]
fn plain_http_endpoint_requires_opt_in() -> TestResult {
    let denied = write_config("[object_store]\nendpoint = \"http://localhost:9000\"\n")?;
    assert_invalid(
        PlanReviewConfig::load_with_env(Some(denied.path()), no_env),
        "without allow_http",
    )?;
    let allowed = write_config(
        "[object_store]\nendpoint = \"http://localhost:9000\"\nallow_http = true\n",
    )?;
    PlanReviewConfig::load_with_env(Some(allowed.path()), no_env)
        .map(|_| ())
        .map_err(|err| err.to_string())
}

#[test]
fn invalid_webhook_url_is_rejected() -> TestResult {
    let file = write_config("[notifier]\nwebhook_url = \"not a url\"\n")?;
    assert_invalid(PlanReviewConfig::load_with_env(Some(file.path()), no_env), "webhook_url")
}

#[test]
fn overrides_replace_file_values() -> TestResult {
    let file = write_config(
        "[links]\nexpiry_seconds = 60\n[notifier]\nwebhook_url = \"https://a.example.test\"\n",
    )?;
    let env: BTreeMap<&str, &str> = BTreeMap::from([
        ("SLACK_WEBHOOK_URL", "https://b.example.test/hook"),
        ("PRESIGN_TTL_SECONDS", "1200"),
    ]);
    let config = PlanReviewConfig::load_with_env(Some(file.path()), |name| {
        env.get(name).map(ToString::to_string)
    })
    .map_err(|err| err.to_string())?;
    if config.links.expiry_seconds != 1200 {
        return Err("ttl override ignored".to_string());
    }
    if config.notifier.webhook_url.as_deref() != Some("https://b.example.test/hook") {
        return Err("webhook override ignored".to_string());
    }
    Ok(())
}
