// crates/plan-review-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Review Pipeline
// Description: Single-invocation chain of every review stage.
// Purpose: Run resolve, summarize, gate, policy and notify in order.
// Dependencies: crate::{interfaces, runtime}, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! The pipeline wires the stages over one set of ports. Plan actions are
//! summarized and evaluated; apply actions only notify. A skipped summary or a
//! halting gate stops the chain before notification and is reported as an
//! outcome, not an error. The summarizer's claim covers the whole run: when a
//! later stage fails it is released so a retry delivers the notification.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::interfaces::ClaimStore;
use crate::interfaces::LinkSigner;
use crate::interfaces::Notifier;
use crate::interfaces::PlanStore;
use crate::interfaces::PullRequestSource;
use crate::runtime::error::PipelineError;
use crate::runtime::guard::IdempotencyGuard;
use crate::runtime::notify::NotificationRenderer;
use crate::runtime::notify::NotifyInput;
use crate::runtime::policy::PolicyEngine;
use crate::runtime::policy::PolicyOutput;
use crate::runtime::pr_gate::PrCheckOutput;
use crate::runtime::pr_gate::PrGate;
use crate::runtime::resolver::ManifestResolver;
use crate::runtime::resolver::ResolvedManifest;
use crate::runtime::summarizer::ChangeSummarizer;
use crate::runtime::summarizer::PlanInput;
use crate::runtime::summarizer::SummarizeOutput;

// ============================================================================
// SECTION: Ports
// ============================================================================

/// External collaborators used by one pipeline.
#[derive(Clone)]
pub struct PipelinePorts {
    /// Artifact store.
    pub store: Arc<dyn PlanStore>,
    /// Link signer.
    pub links: Arc<dyn LinkSigner>,
    /// Notification channel.
    pub notifier: Arc<dyn Notifier>,
    /// Claim store; `None` disables the idempotency guard.
    pub claims: Option<Arc<dyn ClaimStore>>,
    /// Pull request lookup; `None` disables the live gate check.
    pub pull_requests: Option<Arc<dyn PullRequestSource>>,
    /// Link lifetime.
    pub link_expiry: Duration,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The notification was delivered.
    Notified,
    /// The plan version was already processed.
    AlreadyProcessed,
    /// The pull request is closed or merged.
    PullRequestClosed,
}

/// Record of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Terminal state.
    pub outcome: RunOutcome,
    /// Resolved manifest.
    pub resolved: ResolvedManifest,
    /// Summarizer output (plan actions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummarizeOutput>,
    /// Gate decision, when the gate ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_check: Option<PrCheckOutput>,
    /// Policy output (plan actions only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyOutput>,
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Stage chain over one set of ports.
pub struct Pipeline {
    /// Manifest resolver.
    resolver: ManifestResolver,
    /// Change summarizer.
    summarizer: ChangeSummarizer,
    /// Pull request gate.
    gate: PrGate,
    /// Policy stage.
    policy: PolicyEngine,
    /// Notification renderer.
    renderer: NotificationRenderer,
}

impl Pipeline {
    /// Builds every stage over `ports`.
    #[must_use]
    pub fn new(ports: PipelinePorts) -> Self {
        let guard = ports.claims.map(IdempotencyGuard::new);
        Self {
            resolver: ManifestResolver::new(Arc::clone(&ports.store)),
            summarizer: ChangeSummarizer::new(Arc::clone(&ports.store), guard),
            gate: PrGate::new(ports.pull_requests),
            policy: PolicyEngine::new(Arc::clone(&ports.store)),
            renderer: NotificationRenderer::new(
                ports.store,
                ports.links,
                ports.notifier,
                ports.link_expiry,
            ),
        }
    }

    /// Runs the chain for one trigger payload.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] from the first failing stage; the plan claim
    /// is released before the error is returned.
    pub fn run(&self, payload: &Value) -> Result<PipelineReport, PipelineError> {
        let resolved = self.resolver.resolve(payload)?;
        let plan_input = PlanInput {
            bucket: resolved.bucket.clone(),
            plan_json_key: resolved.plan_json_key.clone(),
            key_prefix: resolved.key_prefix.clone(),
        };
        let mut report = PipelineReport {
            outcome: RunOutcome::Notified,
            resolved,
            summary: None,
            pr_check: None,
            policy: None,
        };

        let is_plan = !report.resolved.manifest.is_apply();
        let mut held = None;
        if is_plan {
            let (summary, claim) = self.summarizer.summarize_claimed(&plan_input)?;
            held = claim;
            let skipped = summary.skipped;
            report.summary = Some(summary);
            if skipped {
                info!(key_prefix = %plan_input.key_prefix, "run stopped: already processed");
                report.outcome = RunOutcome::AlreadyProcessed;
                return Ok(report);
            }
        }

        let result = self.review_and_notify(report, &plan_input, is_plan);
        match &held {
            Some(claim) => claim.release_on_error(result),
            None => result,
        }
    }

    /// Runs the gate, policy and notification stages after summarization.
    fn review_and_notify(
        &self,
        mut report: PipelineReport,
        plan_input: &PlanInput,
        is_plan: bool,
    ) -> Result<PipelineReport, PipelineError> {
        let gate = self.gate.check(&report.resolved.manifest);
        report.pr_check = Some(gate.to_output());
        if !gate.proceed() {
            info!(key_prefix = %plan_input.key_prefix, "run stopped: pull request closed");
            report.outcome = RunOutcome::PullRequestClosed;
            return Ok(report);
        }

        if is_plan {
            report.policy = Some(self.policy.evaluate_plan(plan_input)?);
        }

        let notify_input = NotifyInput {
            resolved: report.resolved.clone(),
            summary: report.summary.as_ref().and_then(|output| output.summary.clone()),
            policy_report: report.policy.as_ref().map(|output| output.policy_report.clone()),
        };
        self.renderer.notify(&notify_input)?;
        Ok(report)
    }
}
