// crates/plan-review-core/src/runtime/notify.rs
// ============================================================================
// Module: Notification Renderer
// Description: Chat message composition and delivery.
// Purpose: Report plan/apply results with time-limited artifact links.
// Dependencies: crate::{core, interfaces, runtime::resolver}, serde, tracing
// ============================================================================

//! ## Overview
//! Rendering is a pure function of the manifest, the resolved links, the
//! optional change summary and the optional policy report. The renderer signs
//! the links, checks whether an apply log exists, renders, and delivers the
//! text through a [`Notifier`]. Link and delivery failures always surface.
//!
//! Only the first [`MAX_LISTED_FINDINGS`] findings are listed; the full report
//! stays in the persisted policy artifact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::core::ApplyStatus;
use crate::core::ChangeSummary;
use crate::core::Manifest;
use crate::core::ManifestAction;
use crate::core::PolicyReport;
use crate::interfaces::LinkSigner;
use crate::interfaces::Notifier;
use crate::interfaces::PlanStore;
use crate::runtime::error::PipelineError;
use crate::runtime::resolver::ResolvedManifest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Findings listed in a message before truncation.
pub const MAX_LISTED_FINDINGS: usize = 5;
/// Default link lifetime.
pub const DEFAULT_LINK_EXPIRY: Duration = Duration::from_secs(3600);

// ============================================================================
// SECTION: Types
// ============================================================================

/// Notification stage input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyInput {
    /// Resolved manifest and artifact keys.
    pub resolved: ResolvedManifest,
    /// Change summary; absent for apply notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChangeSummary>,
    /// Policy report, when evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_report: Option<PolicyReport>,
}

/// Notification stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOutput {
    /// True once the notifier accepted the message.
    pub delivered: bool,
}

/// Signed artifact links embedded in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLinks {
    /// Plan JSON link.
    pub plan_json: String,
    /// Plan text link.
    pub plan_text: String,
    /// Apply log link, when the log exists.
    pub apply_text: Option<String>,
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders the chat message text.
#[must_use]
pub fn render_message(
    manifest: &Manifest,
    links: &MessageLinks,
    summary: Option<&ChangeSummary>,
    report: Option<&PolicyReport>,
) -> String {
    let mut lines = vec![format!(
        "*Terraform {}* | {} #{} ({})",
        manifest.action, manifest.repository, manifest.pull_request_number, manifest.project
    )];
    match manifest.action {
        ManifestAction::Apply => {
            let result = match manifest.status {
                Some(ApplyStatus::Success) => "success",
                _ => "failure",
            };
            lines.push(format!("- result: {result}"));
            if let Some(apply_link) = &links.apply_text {
                lines.push(format!("- apply log: <{apply_link}|apply.txt>"));
            }
        }
        ManifestAction::Plan => {
            let detected = if manifest.has_changes == Some(true) { "yes" } else { "no" };
            let (creates, updates, deletes) =
                summary.map_or((0, 0, 0), |summary| (summary.creates, summary.updates, summary.deletes));
            lines.push(format!("- changes detected: {detected}"));
            lines.push(format!("- create:{creates} update:{updates} delete:{deletes}"));
        }
    }
    lines.push(format!("- plan: <{}|json> · <{}|txt>", links.plan_json, links.plan_text));
    if let Some(report) = report {
        lines.push(format!(
            "- risk: HIGH:{} MEDIUM:{} INFO:{}",
            report.high_count(),
            report.medium_count(),
            report.info_count()
        ));
        for finding in report.findings().iter().take(MAX_LISTED_FINDINGS) {
            lines.push(format!(
                "  • [{}] {} {} ({})",
                finding.severity, finding.code, finding.message, finding.resource
            ));
        }
        let hidden = report.findings().len().saturating_sub(MAX_LISTED_FINDINGS);
        if hidden > 0 {
            lines.push(format!("  • ...and {hidden} more"));
        }
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Signs links, renders and delivers notifications.
pub struct NotificationRenderer {
    /// Artifact store, used to check for the apply log.
    store: Arc<dyn PlanStore>,
    /// Link signer.
    links: Arc<dyn LinkSigner>,
    /// Delivery channel.
    notifier: Arc<dyn Notifier>,
    /// Link lifetime.
    expiry: Duration,
}

impl NotificationRenderer {
    /// Creates a renderer.
    #[must_use]
    pub fn new(
        store: Arc<dyn PlanStore>,
        links: Arc<dyn LinkSigner>,
        notifier: Arc<dyn Notifier>,
        expiry: Duration,
    ) -> Self {
        Self {
            store,
            links,
            notifier,
            expiry,
        }
    }

    /// Resolves the links for `resolved`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when a link cannot be signed or the apply log
    /// lookup fails.
    pub fn links_for(&self, resolved: &ResolvedManifest) -> Result<MessageLinks, PipelineError> {
        let plan_json = self.links.signed_link(&resolved.plan_json(), self.expiry)?;
        let plan_text = self.links.signed_link(&resolved.plan_text(), self.expiry)?;
        let apply_text = if resolved.manifest.is_apply() {
            let location = resolved.apply_text();
            match self.store.head(&location)? {
                Some(_) => Some(self.links.signed_link(&location, self.expiry)?),
                None => None,
            }
        } else {
            None
        };
        Ok(MessageLinks {
            plan_json,
            plan_text,
            apply_text,
        })
    }

    /// Renders and delivers the notification for `input`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when links cannot be resolved or delivery
    /// fails.
    pub fn notify(&self, input: &NotifyInput) -> Result<NotifyOutput, PipelineError> {
        let links = self.links_for(&input.resolved)?;
        let text = render_message(
            &input.resolved.manifest,
            &links,
            input.summary.as_ref(),
            input.policy_report.as_ref(),
        );
        self.notifier.deliver(&text)?;
        info!(
            repository = %input.resolved.manifest.repository,
            pr = input.resolved.manifest.pull_request_number,
            action = %input.resolved.manifest.action,
            "notification delivered"
        );
        Ok(NotifyOutput {
            delivered: true,
        })
    }
}
