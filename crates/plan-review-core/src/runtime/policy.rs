// crates/plan-review-core/src/runtime/policy.rs
// ============================================================================
// Module: Policy Engine
// Description: Rule evaluation over plan resource changes.
// Purpose: Produce a severity-classified finding report for one plan.
// Dependencies: crate::{core, interfaces, runtime::rules}, serde_json, tracing
// ============================================================================

//! ## Overview
//! Evaluation walks the change list in plan order and, for each change with an
//! `after` state, runs the applicable rules in table order. Every match
//! appends exactly one finding. The stage variant reads the plan from the
//! object store and persists the full report next to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::core::POLICY_REPORT_FILE;
use crate::core::PlanDocument;
use crate::core::PolicyFinding;
use crate::core::PolicyReport;
use crate::core::ResourceChange;
use crate::interfaces::PlanStore;
use crate::runtime::error::PipelineError;
use crate::runtime::rules::AfterView;
use crate::runtime::rules::rules_for;
use crate::runtime::summarizer::MAX_PLAN_BYTES;
use crate::runtime::summarizer::PlanInput;

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates every rule against `changes`.
#[must_use]
pub fn evaluate(changes: &[ResourceChange]) -> PolicyReport {
    let mut findings = Vec::new();
    for change in changes {
        let Some(after) = &change.after else {
            continue;
        };
        let view = AfterView::new(after);
        for rule in rules_for(&change.resource_type) {
            for message in (rule.check)(&change.resource_type, &view) {
                findings.push(PolicyFinding {
                    severity: rule.severity,
                    code: rule.code.to_string(),
                    message,
                    resource: change.address.clone(),
                });
            }
        }
    }
    PolicyReport::from_findings(findings)
}

// ============================================================================
// SECTION: Stage
// ============================================================================

/// Policy stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOutput {
    /// Evaluated report.
    pub policy_report: PolicyReport,
    /// Key the full report was written to.
    pub report_key: String,
}

/// Reads plans, evaluates them and persists reports.
pub struct PolicyEngine {
    /// Artifact store.
    store: Arc<dyn PlanStore>,
}

impl PolicyEngine {
    /// Creates the stage over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self {
            store,
        }
    }

    /// Evaluates the plan named by `input` and stores `{keyPrefix}/policy.json`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the plan is malformed or the object store
    /// fails.
    pub fn evaluate_plan(&self, input: &PlanInput) -> Result<PolicyOutput, PipelineError> {
        let bytes = self.store.get(&input.plan_json(), MAX_PLAN_BYTES)?;
        let plan = PlanDocument::from_slice(&bytes)?;
        let report = evaluate(&plan.resource_changes);
        let report_location = input.sibling(POLICY_REPORT_FILE);
        let body = serde_json::to_vec(&report)
            .map_err(|err| PipelineError::Invalid(format!("report serialization: {err}")))?;
        self.store.put(&report_location, body, Some("application/json"))?;
        info!(
            report_key = %report_location.key,
            high = report.high_count(),
            medium = report.medium_count(),
            info = report.info_count(),
            "policy report written"
        );
        Ok(PolicyOutput {
            policy_report: report,
            report_key: report_location.key,
        })
    }
}
