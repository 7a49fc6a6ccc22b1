// crates/plan-review-core/src/runtime/pr_gate.rs
// ============================================================================
// Module: Pull Request Gate
// Description: Best-effort pull request state check.
// Purpose: Stop the pipeline for closed or merged pull requests.
// Dependencies: crate::{core, interfaces}, serde, tracing
// ============================================================================

//! ## Overview
//! The gate never fails. Without a configured source it always proceeds. With
//! one, a closed or merged pull request halts the chain, and any lookup
//! failure becomes an explicit [`GateOutcome::Degraded`] that still proceeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::core::Manifest;
use crate::interfaces::PullRequestSource;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Tagged gate result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The pull request is open, or the check is disabled.
    Proceed,
    /// The pull request is closed or merged.
    Halt,
    /// The lookup failed; the pipeline proceeds anyway.
    Degraded {
        /// Failure description.
        cause: String,
    },
}

impl GateOutcome {
    /// Returns true unless the gate halts the pipeline.
    #[must_use]
    pub const fn proceed(&self) -> bool {
        !matches!(self, Self::Halt)
    }

    /// Returns the stable reason string.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Proceed => "ok".to_string(),
            Self::Halt => "pr-closed-or-merged".to_string(),
            Self::Degraded {
                cause,
            } => format!("github-check-failed:{cause}"),
        }
    }

    /// Returns the `{proceed, reason}` record.
    #[must_use]
    pub fn to_output(&self) -> PrCheckOutput {
        PrCheckOutput {
            proceed: self.proceed(),
            reason: self.reason(),
        }
    }
}

/// Serialized gate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrCheckOutput {
    /// Whether the pipeline continues.
    pub proceed: bool,
    /// Decision reason.
    pub reason: String,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Best-effort pull request gate.
#[derive(Clone, Default)]
pub struct PrGate {
    /// Lookup client; `None` disables the live check.
    source: Option<Arc<dyn PullRequestSource>>,
}

impl PrGate {
    /// Creates a gate; pass `None` when no access token is configured.
    #[must_use]
    pub fn new(source: Option<Arc<dyn PullRequestSource>>) -> Self {
        Self {
            source,
        }
    }

    /// Checks the pull request referenced by `manifest`.
    #[must_use]
    pub fn check(&self, manifest: &Manifest) -> GateOutcome {
        let Some(source) = &self.source else {
            return GateOutcome::Proceed;
        };
        match source.pull_request(&manifest.repository, manifest.pull_request_number) {
            Ok(state) if state.is_open_unmerged() => GateOutcome::Proceed,
            Ok(state) => {
                info!(
                    repository = %manifest.repository,
                    pr = manifest.pull_request_number,
                    state = %state.state,
                    merged = state.merged,
                    "pull request no longer open"
                );
                GateOutcome::Halt
            }
            Err(err) => {
                warn!(
                    repository = %manifest.repository,
                    pr = manifest.pull_request_number,
                    error = %err,
                    "pull request check degraded"
                );
                GateOutcome::Degraded {
                    cause: err.to_string(),
                }
            }
        }
    }
}
