// crates/plan-review-core/tests/summarizer_unit.rs
// ============================================================================
// Module: Change Summarizer Unit Tests
// Description: Counting, ranking, persistence and claim gating.
// Purpose: Validate replace semantics, top-N truncation and skip behavior.
// ============================================================================

//! ## Overview
//! Runs the summarizer over in-memory ports:
//! - replace counts once as create and once as delete
//! - per-type table is ranked, stable on ties and capped at ten entries
//! - the summary object is written next to the plan
//! - a second invocation for the same plan version is skipped
//! - a failure after the claim releases it so the retry can summarize

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use plan_review_core::ChangeSummarizer;
use plan_review_core::Fingerprint;
use plan_review_core::IdempotencyGuard;
use plan_review_core::ObjectLocation;
use plan_review_core::ObjectStoreError;
use plan_review_core::ObjectVersion;
use plan_review_core::PipelineError;
use plan_review_core::PlanInput;
use plan_review_core::PlanStore;
use plan_review_core::TypeTally;
use plan_review_core::runtime::InMemoryClaimStore;
use plan_review_core::runtime::InMemoryPlanStore;
use serde_json::Value;
use serde_json::json;

const BUCKET: &str = "artifacts";
const PREFIX: &str = "acme/infra/42/network";

fn plan_input() -> PlanInput {
    PlanInput {
        bucket: BUCKET.to_string(),
        plan_json_key: format!("{PREFIX}/tfplan.json"),
        key_prefix: PREFIX.to_string(),
    }
}

fn change(resource_type: &str, address: &str, actions: &[&str]) -> Value {
    json!({
        "type": resource_type,
        "address": address,
        "change": {"actions": actions, "after": {}},
    })
}

fn store_with_plan(changes: Vec<Value>) -> InMemoryPlanStore {
    let store = InMemoryPlanStore::new();
    let plan = json!({"resource_changes": changes});
    store.insert(BUCKET, &format!("{PREFIX}/tfplan.json"), plan.to_string()).unwrap();
    store
}

/// Store whose first write is rejected by the backend.
struct FirstPutFails {
    /// Backing store.
    inner: InMemoryPlanStore,
    /// Set once the failing write happened.
    tripped: AtomicBool,
}

impl PlanStore for FirstPutFails {
    fn get(&self, location: &ObjectLocation, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        self.inner.get(location, max_bytes)
    }

    fn put(
        &self,
        location: &ObjectLocation,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(ObjectStoreError::Backend("503 SlowDown".to_string()));
        }
        self.inner.put(location, bytes, content_type)
    }

    fn head(&self, location: &ObjectLocation) -> Result<Option<ObjectVersion>, ObjectStoreError> {
        self.inner.head(location)
    }
}

fn plan_fingerprint(store: &InMemoryPlanStore) -> Fingerprint {
    let location = plan_input().plan_json();
    let version = store.head(&location).unwrap().unwrap();
    Fingerprint::new(&location, version.token().unwrap())
}

fn summarizer(store: &InMemoryPlanStore, claims: Option<&InMemoryClaimStore>) -> ChangeSummarizer {
    let guard = claims.map(|claims| IdempotencyGuard::new(Arc::new(claims.clone())));
    ChangeSummarizer::new(Arc::new(store.clone()), guard)
}

#[test]
fn replace_counts_as_create_and_delete() {
    let store = store_with_plan(vec![change("aws_instance", "aws_instance.web", &[
        "delete", "create",
    ])]);
    let output = summarizer(&store, None).summarize(&plan_input()).unwrap();
    let summary = output.summary.unwrap();
    assert_eq!((summary.creates, summary.updates, summary.deletes), (1, 0, 1));
    assert_eq!(summary.by_type, vec![TypeTally::new("aws_instance", 1, 0, 1)]);
}

#[test]
fn no_op_and_read_verbs_are_not_counted() {
    let store = store_with_plan(vec![
        change("aws_vpc", "aws_vpc.main", &["no-op"]),
        change("aws_ami", "data.aws_ami.ubuntu", &["read"]),
        change("aws_subnet", "aws_subnet.a", &["update"]),
    ]);
    let summary = summarizer(&store, None).summarize(&plan_input()).unwrap().summary.unwrap();
    assert_eq!((summary.creates, summary.updates, summary.deletes), (0, 1, 0));
    assert_eq!(summary.by_type, vec![TypeTally::new("aws_subnet", 0, 1, 0)]);
}

#[test]
fn by_type_is_ranked_with_stable_ties() {
    let store = store_with_plan(vec![
        change("aws_route", "aws_route.a", &["create"]),
        change("aws_subnet", "aws_subnet.a", &["create"]),
        change("aws_subnet", "aws_subnet.b", &["update"]),
        change("aws_eip", "aws_eip.a", &["delete"]),
    ]);
    let summary = summarizer(&store, None).summarize(&plan_input()).unwrap().summary.unwrap();
    let order: Vec<&str> =
        summary.by_type.iter().map(|tally| tally.resource_type.as_str()).collect();
    assert_eq!(order, vec!["aws_subnet", "aws_route", "aws_eip"]);
}

#[test]
fn eleven_types_truncate_to_ten() {
    let changes = (0..11)
        .map(|index| change(&format!("aws_type_{index:02}"), &format!("r.{index}"), &["create"]))
        .collect();
    let store = store_with_plan(changes);
    let summary = summarizer(&store, None).summarize(&plan_input()).unwrap().summary.unwrap();
    assert_eq!(summary.by_type.len(), 10);
    assert_eq!(summary.creates, 11);
    assert_eq!(summary.by_type[0].resource_type, "aws_type_00");
    assert_eq!(summary.by_type[9].resource_type, "aws_type_09");
}

#[test]
fn empty_plan_yields_zero_summary() {
    let store = store_with_plan(Vec::new());
    let summary = summarizer(&store, None).summarize(&plan_input()).unwrap().summary.unwrap();
    assert!(summary.is_empty());
    assert!(summary.by_type.is_empty());
}

#[test]
fn summary_object_uses_wire_shape() {
    let store = store_with_plan(vec![change("aws_instance", "aws_instance.a", &["create"])]);
    let output = summarizer(&store, None).summarize(&plan_input()).unwrap();
    let key = format!("{PREFIX}/summary.json");
    assert_eq!(output.summary_key.as_deref(), Some(key.as_str()));
    let stored: Value = serde_json::from_slice(&store.object(BUCKET, &key).unwrap()).unwrap();
    assert_eq!(
        stored,
        json!({
            "adds": 1, "mods": 0, "dels": 0,
            "byType": [{"type": "aws_instance", "create": 1, "update": 0, "delete": 0}],
            "s3": {"bucket": BUCKET, "key": format!("{PREFIX}/tfplan.json")},
        })
    );
}

#[test]
fn second_invocation_for_same_version_is_skipped() {
    let store = store_with_plan(vec![change("aws_instance", "aws_instance.a", &["create"])]);
    let claims = InMemoryClaimStore::new();
    let stage = summarizer(&store, Some(&claims));
    let first = stage.summarize(&plan_input()).unwrap();
    assert!(!first.skipped);
    let second = stage.summarize(&plan_input()).unwrap();
    assert!(second.skipped);
    assert_eq!(second.reason.as_deref(), Some("already-processed"));
    assert!(second.summary.is_none());
    let rendered = serde_json::to_value(&second).unwrap();
    assert_eq!(rendered, json!({"skipped": true, "reason": "already-processed"}));
}

#[test]
fn new_plan_version_is_processed_again() {
    let store = store_with_plan(vec![change("aws_instance", "aws_instance.a", &["create"])]);
    let claims = InMemoryClaimStore::new();
    let stage = summarizer(&store, Some(&claims));
    assert!(!stage.summarize(&plan_input()).unwrap().skipped);
    let replan = json!({"resource_changes": [change("aws_instance", "aws_instance.a", &["update"])]});
    store.insert(BUCKET, &format!("{PREFIX}/tfplan.json"), replan.to_string()).unwrap();
    let output = stage.summarize(&plan_input()).unwrap();
    assert!(!output.skipped);
    assert_eq!(output.summary.unwrap().updates, 1);
}

#[test]
fn unversioned_store_falls_back_to_content_hash() {
    let store = InMemoryPlanStore::unversioned();
    let plan = json!({"resource_changes": []}).to_string();
    store.insert(BUCKET, &format!("{PREFIX}/tfplan.json"), plan).unwrap();
    let claims = InMemoryClaimStore::new();
    let stage = summarizer(&store, Some(&claims));
    assert!(!stage.summarize(&plan_input()).unwrap().skipped);
    assert!(stage.summarize(&plan_input()).unwrap().skipped);
}

#[test]
fn missing_plan_is_an_object_store_error() {
    let store = InMemoryPlanStore::new();
    let claims = InMemoryClaimStore::new();
    let err = summarizer(&store, Some(&claims)).summarize(&plan_input()).unwrap_err();
    assert!(matches!(err, PipelineError::ObjectStore(ObjectStoreError::NotFound(_))));
    assert!(err.is_retryable());
}

#[test]
fn malformed_plan_is_an_input_error() {
    let store = InMemoryPlanStore::new();
    store
        .insert(BUCKET, &format!("{PREFIX}/tfplan.json"), r#"{"resource_changes": {}}"#)
        .unwrap();
    let err = summarizer(&store, None).summarize(&plan_input()).unwrap_err();
    assert!(matches!(err, PipelineError::PlanParse(_)));
    assert!(!err.is_retryable());
}

#[test]
fn failed_summary_write_releases_claim_for_retry() {
    let inner = store_with_plan(vec![change("aws_instance", "aws_instance.a", &["create"])]);
    let claims = InMemoryClaimStore::new();
    let store = Arc::new(FirstPutFails {
        inner: inner.clone(),
        tripped: AtomicBool::new(false),
    });
    let stage = ChangeSummarizer::new(store, Some(IdempotencyGuard::new(Arc::new(claims.clone()))));

    let err = stage.summarize(&plan_input()).unwrap_err();
    assert!(matches!(err, PipelineError::ObjectStore(ObjectStoreError::Backend(_))));
    assert!(err.is_retryable());
    assert!(!claims.contains(&plan_fingerprint(&inner)));

    let retry = stage.summarize(&plan_input()).unwrap();
    assert!(!retry.skipped);
    assert!(inner.object(BUCKET, &format!("{PREFIX}/summary.json")).is_some());
    assert!(claims.contains(&plan_fingerprint(&inner)));
    assert!(stage.summarize(&plan_input()).unwrap().skipped);
}

#[test]
fn malformed_plan_does_not_keep_the_claim() {
    let store = InMemoryPlanStore::new();
    store
        .insert(BUCKET, &format!("{PREFIX}/tfplan.json"), r#"{"resource_changes": {}}"#)
        .unwrap();
    let claims = InMemoryClaimStore::new();
    let err = summarizer(&store, Some(&claims)).summarize(&plan_input()).unwrap_err();
    assert!(matches!(err, PipelineError::PlanParse(_)));
    assert!(!claims.contains(&plan_fingerprint(&store)));
}
