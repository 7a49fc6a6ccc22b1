// crates/plan-review-core/tests/notify_unit.rs
// ============================================================================
// Module: Notification Renderer Unit Tests
// Description: Message layout, link resolution and delivery failures.
// Purpose: Validate plan/apply messages and the finding cap.
// ============================================================================

//! ## Overview
//! Renders plan and apply notifications against in-memory ports and checks
//! the exact message text, the apply-log link rule and error surfacing.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use plan_review_core::ApplyStatus;
use plan_review_core::ChangeSummary;
use plan_review_core::Manifest;
use plan_review_core::ManifestAction;
use plan_review_core::NotificationRenderer;
use plan_review_core::NotifyInput;
use plan_review_core::NotifierError;
use plan_review_core::ObjectLocation;
use plan_review_core::PipelineError;
use plan_review_core::PolicyFinding;
use plan_review_core::PolicyReport;
use plan_review_core::ResolvedManifest;
use plan_review_core::Severity;
use plan_review_core::TypeTally;
use plan_review_core::runtime::InMemoryLinkSigner;
use plan_review_core::runtime::InMemoryPlanStore;
use plan_review_core::runtime::MessageLinks;
use plan_review_core::runtime::RecordingNotifier;
use plan_review_core::runtime::render_message;

const PREFIX: &str = "acme/infra/42/network";

fn manifest(action: ManifestAction) -> Manifest {
    Manifest {
        repository: "acme/infra".to_string(),
        pull_request_number: 42,
        project: "network".to_string(),
        action,
        status: (action == ManifestAction::Apply).then_some(ApplyStatus::Success),
        commit_sha: "abc123".to_string(),
        has_changes: (action == ManifestAction::Plan).then_some(true),
    }
}

fn resolved(action: ManifestAction) -> ResolvedManifest {
    ResolvedManifest {
        bucket: "artifacts".to_string(),
        key_prefix: PREFIX.to_string(),
        manifest: manifest(action),
        plan_json_key: format!("{PREFIX}/tfplan.json"),
        plan_text_key: format!("{PREFIX}/plan.txt"),
        apply_text_key: format!("{PREFIX}/apply.txt"),
    }
}

fn links() -> MessageLinks {
    MessageLinks {
        plan_json: "https://l/json".to_string(),
        plan_text: "https://l/txt".to_string(),
        apply_text: None,
    }
}

fn finding(index: usize) -> PolicyFinding {
    PolicyFinding {
        severity: Severity::Medium,
        code: "IAM_WILDCARD".to_string(),
        message: "IAM policy may contain wildcards".to_string(),
        resource: format!("aws_iam_policy.p{index}"),
    }
}

fn renderer(store: &InMemoryPlanStore, notifier: &RecordingNotifier) -> NotificationRenderer {
    NotificationRenderer::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryLinkSigner),
        Arc::new(notifier.clone()),
        Duration::from_secs(900),
    )
}

#[test]
fn plan_message_layout() {
    let summary = ChangeSummary {
        creates: 2,
        updates: 1,
        deletes: 0,
        by_type: vec![TypeTally::new("aws_instance", 2, 0, 0)],
        source_location: ObjectLocation::new("artifacts", format!("{PREFIX}/tfplan.json")),
    };
    let text = render_message(&manifest(ManifestAction::Plan), &links(), Some(&summary), None);
    assert_eq!(
        text,
        "*Terraform plan* | acme/infra #42 (network)\n\
         - changes detected: yes\n\
         - create:2 update:1 delete:0\n\
         - plan: <https://l/json|json> · <https://l/txt|txt>\n"
    );
}

#[test]
fn plan_without_summary_reports_zero_counts() {
    let mut plan = manifest(ManifestAction::Plan);
    plan.has_changes = None;
    let text = render_message(&plan, &links(), None, None);
    assert!(text.contains("- changes detected: no\n"));
    assert!(text.contains("- create:0 update:0 delete:0\n"));
}

#[test]
fn apply_message_layout() {
    let mut apply = manifest(ManifestAction::Apply);
    apply.status = Some(ApplyStatus::Failure);
    let mut with_log = links();
    with_log.apply_text = Some("https://l/apply".to_string());
    let text = render_message(&apply, &with_log, None, None);
    assert_eq!(
        text,
        "*Terraform apply* | acme/infra #42 (network)\n\
         - result: failure\n\
         - apply log: <https://l/apply|apply.txt>\n\
         - plan: <https://l/json|json> · <https://l/txt|txt>\n"
    );
}

#[test]
fn findings_are_capped_at_five() {
    let report = PolicyReport::from_findings((0..7).map(finding).collect());
    let text = render_message(&manifest(ManifestAction::Plan), &links(), None, Some(&report));
    assert!(text.contains("- risk: HIGH:0 MEDIUM:7 INFO:0\n"));
    assert!(text.contains(
        "  • [MEDIUM] IAM_WILDCARD IAM policy may contain wildcards (aws_iam_policy.p4)\n"
    ));
    assert!(!text.contains("aws_iam_policy.p5"));
    assert!(text.ends_with("  • ...and 2 more\n"));
}

#[test]
fn five_findings_have_no_suffix() {
    let report = PolicyReport::from_findings((0..5).map(finding).collect());
    let text = render_message(&manifest(ManifestAction::Plan), &links(), None, Some(&report));
    assert!(!text.contains("more"));
}

#[test]
fn apply_log_link_requires_existing_object() {
    let store = InMemoryPlanStore::new();
    let notifier = RecordingNotifier::new();
    let stage = renderer(&store, &notifier);

    let without_log = stage.links_for(&resolved(ManifestAction::Apply)).unwrap();
    assert_eq!(without_log.apply_text, None);

    store.insert("artifacts", &format!("{PREFIX}/apply.txt"), "Apply complete!").unwrap();
    let with_log = stage.links_for(&resolved(ManifestAction::Apply)).unwrap();
    assert_eq!(
        with_log.apply_text.as_deref(),
        Some("memory://artifacts/acme/infra/42/network/apply.txt?expires=900")
    );

    let plan_links = stage.links_for(&resolved(ManifestAction::Plan)).unwrap();
    assert_eq!(plan_links.apply_text, None);
}

#[test]
fn notify_delivers_rendered_text() {
    let store = InMemoryPlanStore::new();
    let notifier = RecordingNotifier::new();
    let output = renderer(&store, &notifier)
        .notify(&NotifyInput {
            resolved: resolved(ManifestAction::Plan),
            summary: None,
            policy_report: None,
        })
        .unwrap();
    assert!(output.delivered);
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("*Terraform plan* | acme/infra #42 (network)\n"));
    assert!(messages[0].contains("memory://artifacts/acme/infra/42/network/plan.txt?expires=900"));
}

#[test]
fn delivery_failure_surfaces() {
    let store = InMemoryPlanStore::new();
    let notifier = RecordingNotifier::failing("webhook returned 500");
    let err = renderer(&store, &notifier)
        .notify(&NotifyInput {
            resolved: resolved(ManifestAction::Plan),
            summary: None,
            policy_report: None,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Delivery(NotifierError::DeliveryFailed(ref cause)) if cause == "webhook returned 500"
    ));
    assert!(err.is_retryable());
}

#[test]
fn zero_expiry_is_a_link_error() {
    let store = InMemoryPlanStore::new();
    let stage = NotificationRenderer::new(
        Arc::new(store),
        Arc::new(InMemoryLinkSigner),
        Arc::new(RecordingNotifier::new()),
        Duration::ZERO,
    );
    let err = stage.links_for(&resolved(ManifestAction::Plan)).unwrap_err();
    assert!(matches!(err, PipelineError::LinkSigning(_)));
}
