// crates/plan-review-core/tests/pipeline_end_to_end.rs
// ============================================================================
// Module: Pipeline End-to-End Tests
// Description: Full chain runs over in-memory ports.
// Purpose: Validate stage ordering, short circuits and the reference scenario.
// ============================================================================

//! ## Overview
//! Drives [`Pipeline::run`] from a storage event to a delivered message:
//! - the mixed create/update/delete plan with one open ingress rule
//! - duplicate events are skipped before notification
//! - a merged pull request halts the chain
//! - apply manifests skip summarization and policy evaluation
//! - a failed delivery releases the plan claim so the retry notifies

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use plan_review_core::ClaimStore;
use plan_review_core::PipelineError;
use plan_review_core::Pipeline;
use plan_review_core::PipelinePorts;
use plan_review_core::PullRequestSource;
use plan_review_core::RunOutcome;
use plan_review_core::TypeTally;
use plan_review_core::runtime::DEFAULT_LINK_EXPIRY;
use plan_review_core::runtime::InMemoryClaimStore;
use plan_review_core::runtime::InMemoryLinkSigner;
use plan_review_core::runtime::InMemoryPlanStore;
use plan_review_core::runtime::RecordingNotifier;
use plan_review_core::runtime::StaticPullRequestSource;
use serde_json::Value;
use serde_json::json;

const BUCKET: &str = "artifacts";
const PREFIX: &str = "acme/infra/42/network";

struct Harness {
    store: InMemoryPlanStore,
    notifier: RecordingNotifier,
    pipeline: Pipeline,
}

fn harness(action: &str, pull_requests: Option<StaticPullRequestSource>) -> Harness {
    let store = InMemoryPlanStore::new();
    let manifest = json!({
        "repo": "acme/infra", "pr": 42, "project": "network", "action": action,
        "status": "success", "commit": "abc123", "has_changes": true
    });
    store.insert(BUCKET, &format!("{PREFIX}/manifest.json"), manifest.to_string()).unwrap();
    store.insert(BUCKET, &format!("{PREFIX}/tfplan.json"), reference_plan().to_string()).unwrap();
    let notifier = RecordingNotifier::new();
    let claims: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
    let pipeline = Pipeline::new(PipelinePorts {
        store: Arc::new(store.clone()),
        links: Arc::new(InMemoryLinkSigner),
        notifier: Arc::new(notifier.clone()),
        claims: Some(claims),
        pull_requests: pull_requests
            .map(|source| Arc::new(source) as Arc<dyn PullRequestSource>),
        link_expiry: DEFAULT_LINK_EXPIRY,
    });
    Harness {
        store,
        notifier,
        pipeline,
    }
}

fn reference_plan() -> Value {
    json!({"resource_changes": [
        {"type": "aws_instance", "address": "aws_instance.a",
         "change": {"actions": ["create"], "after": {"instance_type": "t3.micro"}}},
        {"type": "aws_instance", "address": "aws_instance.b",
         "change": {"actions": ["create"], "after": {"instance_type": "t3.micro"}}},
        {"type": "aws_security_group", "address": "aws_security_group.web",
         "change": {"actions": ["update"], "after": {"ingress": [
             {"cidr_blocks": ["0.0.0.0/0"], "from_port": 22, "to_port": 22, "protocol": "tcp"}
         ]}}},
        {"type": "aws_s3_bucket", "address": "aws_s3_bucket.old",
         "change": {"actions": ["delete"], "after": null}}
    ]})
}

fn event() -> Value {
    json!({"detail": {"bucket": {"name": BUCKET},
                      "object": {"key": format!("{PREFIX}/manifest.json")}}})
}

#[test]
fn reference_plan_summarizes_evaluates_and_notifies() {
    let harness = harness("plan", None);
    let report = harness.pipeline.run(&event()).unwrap();
    assert_eq!(report.outcome, RunOutcome::Notified);

    let summary = report.summary.as_ref().and_then(|output| output.summary.clone()).unwrap();
    assert_eq!((summary.creates, summary.updates, summary.deletes), (2, 1, 1));
    assert_eq!(summary.by_type, vec![
        TypeTally::new("aws_instance", 2, 0, 0),
        TypeTally::new("aws_security_group", 0, 1, 0),
        TypeTally::new("aws_s3_bucket", 0, 0, 1),
    ]);

    let policy = report.policy.as_ref().unwrap();
    let counts = (
        policy.policy_report.high_count(),
        policy.policy_report.medium_count(),
        policy.policy_report.info_count(),
    );
    assert_eq!(counts, (1, 0, 0));
    assert_eq!(policy.policy_report.findings()[0].code, "SG_OPEN_INGRESS");

    assert!(harness.store.object(BUCKET, &format!("{PREFIX}/summary.json")).is_some());
    assert!(harness.store.object(BUCKET, &format!("{PREFIX}/policy.json")).is_some());

    let messages = harness.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("- create:2 update:1 delete:1\n"));
    assert!(messages[0].contains("- risk: HIGH:1 MEDIUM:0 INFO:0\n"));
    assert!(messages[0].contains("[HIGH] SG_OPEN_INGRESS"));
}

#[test]
fn duplicate_event_is_skipped_before_notification() {
    let harness = harness("plan", None);
    harness.pipeline.run(&event()).unwrap();
    let second = harness.pipeline.run(&event()).unwrap();
    assert_eq!(second.outcome, RunOutcome::AlreadyProcessed);
    assert!(second.policy.is_none());
    assert_eq!(harness.notifier.messages().len(), 1);
}

#[test]
fn merged_pull_request_halts_before_policy() {
    let harness = harness("plan", Some(StaticPullRequestSource::state("closed", true)));
    let report = harness.pipeline.run(&event()).unwrap();
    assert_eq!(report.outcome, RunOutcome::PullRequestClosed);
    assert_eq!(report.pr_check.as_ref().map(|check| check.reason.as_str()), Some(
        "pr-closed-or-merged"
    ));
    assert!(report.policy.is_none());
    assert!(harness.notifier.messages().is_empty());
}

#[test]
fn apply_manifest_only_notifies() {
    let harness = harness("apply", None);
    harness.store.insert(BUCKET, &format!("{PREFIX}/apply.txt"), "Apply complete!").unwrap();
    let report = harness.pipeline.run(&event()).unwrap();
    assert_eq!(report.outcome, RunOutcome::Notified);
    assert!(report.summary.is_none());
    assert!(report.policy.is_none());
    let messages = harness.notifier.messages();
    assert!(messages[0].starts_with("*Terraform apply* | acme/infra #42 (network)\n"));
    assert!(messages[0].contains("- result: success\n"));
    assert!(messages[0].contains("|apply.txt>"));
}

#[test]
fn report_serializes_outcome_label() {
    let harness = harness("plan", None);
    let report = harness.pipeline.run(&event()).unwrap();
    let rendered = serde_json::to_value(&report).unwrap();
    assert_eq!(rendered["outcome"], json!("notified"));
    assert_eq!(rendered["prCheck"], json!({"proceed": true, "reason": "ok"}));
    assert_eq!(rendered["resolved"]["planJsonKey"], json!(format!("{PREFIX}/tfplan.json")));
}

#[test]
fn failed_delivery_releases_claim_so_retry_notifies() {
    let harness = harness("plan", None);
    let claims: Arc<dyn ClaimStore> = Arc::new(InMemoryClaimStore::new());
    let pipeline_with = |notifier: &RecordingNotifier| {
        Pipeline::new(PipelinePorts {
            store: Arc::new(harness.store.clone()),
            links: Arc::new(InMemoryLinkSigner),
            notifier: Arc::new(notifier.clone()),
            claims: Some(Arc::clone(&claims)),
            pull_requests: None,
            link_expiry: DEFAULT_LINK_EXPIRY,
        })
    };

    let failing = RecordingNotifier::failing("webhook 503");
    let err = pipeline_with(&failing).run(&event()).unwrap_err();
    assert!(matches!(err, PipelineError::Delivery(_)));
    assert!(err.is_retryable());

    let working = RecordingNotifier::new();
    let retry = pipeline_with(&working).run(&event()).unwrap();
    assert_eq!(retry.outcome, RunOutcome::Notified);
    assert_eq!(working.messages().len(), 1);

    let duplicate = pipeline_with(&working).run(&event()).unwrap();
    assert_eq!(duplicate.outcome, RunOutcome::AlreadyProcessed);
    assert_eq!(working.messages().len(), 1);
}

#[test]
fn halted_run_keeps_the_claim() {
    let harness = harness("plan", Some(StaticPullRequestSource::state("closed", false)));
    assert_eq!(harness.pipeline.run(&event()).unwrap().outcome, RunOutcome::PullRequestClosed);
    assert_eq!(harness.pipeline.run(&event()).unwrap().outcome, RunOutcome::AlreadyProcessed);
}
