// crates/plan-review-core/tests/resolver_unit.rs
// ============================================================================
// Module: Manifest Resolver Unit Tests
// Description: Trigger payload shapes, manifest parsing and key derivation.
// Purpose: Validate accepted inputs and fatal input errors.
// ============================================================================

//! ## Overview
//! Resolves manifests from direct pointers and storage events and checks the
//! error class of every rejected input.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use plan_review_core::ErrorClass;
use plan_review_core::ManifestAction;
use plan_review_core::ManifestResolver;
use plan_review_core::PipelineError;
use plan_review_core::runtime::InMemoryPlanStore;
use serde_json::json;

const MANIFEST_KEY: &str = "acme/infra/42/network/manifest.json";

fn resolver_with(manifest: &str) -> ManifestResolver {
    let store = InMemoryPlanStore::new();
    store.insert("artifacts", MANIFEST_KEY, manifest.to_string()).unwrap();
    ManifestResolver::new(Arc::new(store))
}

fn plan_manifest() -> String {
    json!({
        "repo": "acme/infra", "pr": 42, "project": "network", "action": "plan",
        "commit": "abc123", "has_changes": true
    })
    .to_string()
}

#[test]
fn direct_pointer_resolves_sibling_keys() {
    let resolver = resolver_with(&plan_manifest());
    let resolved = resolver.resolve(&json!({"bucket": "artifacts", "key": MANIFEST_KEY})).unwrap();
    assert_eq!(resolved.bucket, "artifacts");
    assert_eq!(resolved.key_prefix, "acme/infra/42/network");
    assert_eq!(resolved.plan_json_key, "acme/infra/42/network/tfplan.json");
    assert_eq!(resolved.plan_text_key, "acme/infra/42/network/plan.txt");
    assert_eq!(resolved.apply_text_key, "acme/infra/42/network/apply.txt");
    assert_eq!(resolved.manifest.repository, "acme/infra");
    assert_eq!(resolved.manifest.pull_request_number, 42);
    assert_eq!(resolved.manifest.action, ManifestAction::Plan);
    assert_eq!(resolved.manifest.has_changes, Some(true));
}

#[test]
fn storage_event_envelope_resolves() {
    let resolver = resolver_with(&plan_manifest());
    let event = json!({
        "source": "aws.s3",
        "detail-type": "Object Created",
        "detail": {"bucket": {"name": "artifacts"}, "object": {"key": MANIFEST_KEY}}
    });
    let resolved = resolver.resolve(&event).unwrap();
    assert_eq!(resolved.key_prefix, "acme/infra/42/network");
}

#[test]
fn descriptive_field_names_are_accepted() {
    let manifest = json!({
        "repository": "acme/infra", "pullRequestNumber": 7, "project": "app",
        "action": "apply", "status": "failure", "commitSha": "def456"
    })
    .to_string();
    let resolved = resolver_with(&manifest)
        .resolve(&json!({"bucket": "artifacts", "key": MANIFEST_KEY}))
        .unwrap();
    assert!(resolved.manifest.is_apply());
    assert_eq!(resolved.manifest.commit_sha, "def456");
}

#[test]
fn unsupported_shapes_are_input_errors() {
    let resolver = resolver_with(&plan_manifest());
    for payload in [
        json!({"bucket": "artifacts"}),
        json!({"detail": {"bucket": {"name": "artifacts"}}}),
        json!({"bucket": "", "key": MANIFEST_KEY}),
        json!({"bucket": "artifacts", "key": "manifest.json"}),
        json!([1, 2, 3]),
    ] {
        let err = resolver.resolve(&payload).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedInputShape(_)), "{payload}");
        assert_eq!(err.class(), ErrorClass::Input);
    }
}

#[test]
fn schema_mismatch_is_a_manifest_parse_error() {
    let resolver = resolver_with(r#"{"repo": "acme/infra", "action": "destroy"}"#);
    let err = resolver.resolve(&json!({"bucket": "artifacts", "key": MANIFEST_KEY})).unwrap_err();
    assert!(matches!(err, PipelineError::ManifestParse(_)));
    assert!(!err.is_retryable());
}

#[test]
fn missing_manifest_is_transient() {
    let resolver = resolver_with(&plan_manifest());
    let err = resolver
        .resolve(&json!({"bucket": "artifacts", "key": "acme/other/manifest.json"}))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
}
