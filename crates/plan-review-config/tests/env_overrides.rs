//! Environment override tests for plan-review-config.
// crates/plan-review-config/tests/env_overrides.rs
// =============================================================================
// Module: Environment Override Tests
// Description: Validate the recognised environment options.
// Purpose: Ensure overrides are parsed strictly and secrets stay redacted.
// =============================================================================

#![allow(clippy::use_debug, reason = "Failure messages include debug renderings.")]

use std::collections::BTreeMap;

use plan_review_config::ConfigError;
use plan_review_config::PlanReviewConfig;

type TestResult = Result<(), String>;

fn apply(pairs: &[(&str, &str)]) -> Result<PlanReviewConfig, ConfigError> {
    let env: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    let mut config = PlanReviewConfig::default();
    config.apply_env_overrides(|name| env.get(name).cloned())?;
    config.validate()?;
    Ok(config)
}

#[test]
fn defaults_disable_optional_features() -> TestResult {
    let config = apply(&[]).map_err(|err| err.to_string())?;
    if config.idempotency.is_enabled() || config.pr_gate.is_enabled() {
        return Err("optional features enabled by default".to_string());
    }
    if config.links.expiry_seconds != 3600 || config.notifier.webhook_url.is_some() {
        return Err("unexpected defaults".to_string());
    }
    Ok(())
}

#[test]
fn idempotency_table_enables_guard() -> TestResult {
    let config = apply(&[("IDEMPOTENCY_TABLE", "plan-review-claims")]);
    match config {
        Err(ConfigError::Invalid(message)) if message.contains("idempotency.path") => Ok(()),
        other => Err(format!("sqlite backend without path should fail, got {other:?}")),
    }?;
    let mut config = PlanReviewConfig::default();
    config.idempotency.path = Some("claims.db".into());
    config
        .apply_env_overrides(|name| {
            (name == "IDEMPOTENCY_TABLE").then(|| "plan-review-claims".to_string())
        })
        .map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.idempotency.table.as_deref() != Some("plan-review-claims") {
        return Err("table override ignored".to_string());
    }
    Ok(())
}

#[test]
fn empty_values_are_unset() -> TestResult {
    let config = apply(&[("IDEMPOTENCY_TABLE", ""), ("GITHUB_TOKEN", "  ")])
        .map_err(|err| err.to_string())?;
    if config.idempotency.is_enabled() || config.pr_gate.is_enabled() {
        return Err("empty override enabled a feature".to_string());
    }
    Ok(())
}

#[test]
fn non_numeric_ttl_is_rejected() -> TestResult {
    match apply(&[("PRESIGN_TTL_SECONDS", "one hour")]) {
        Err(ConfigError::Invalid(message)) if message.contains("PRESIGN_TTL_SECONDS") => Ok(()),
        other => Err(format!("expected invalid ttl, got {other:?}")),
    }
}

#[test]
fn token_is_redacted_in_debug_output() -> TestResult {
    let config = apply(&[("GITHUB_TOKEN", "ghp_secretvalue")]).map_err(|err| err.to_string())?;
    let token = config.pr_gate.token.as_ref().ok_or("token missing")?;
    if token.expose() != "ghp_secretvalue" {
        return Err("token value changed".to_string());
    }
    let rendered = format!("{config:?}");
    if rendered.contains("ghp_secretvalue") {
        return Err("token leaked into debug output".to_string());
    }
    Ok(())
}
