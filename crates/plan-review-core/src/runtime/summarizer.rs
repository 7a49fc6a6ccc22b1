// crates/plan-review-core/src/runtime/summarizer.rs
// ============================================================================
// Module: Change Summarizer
// Description: Claim-gated plan summarization and summary persistence.
// Purpose: Produce and store one ChangeSummary per plan artifact version.
// Dependencies: crate::{core, interfaces, runtime::guard}, serde_json, tracing
// ============================================================================

//! ## Overview
//! The summarizer fingerprints the plan JSON (version id, etag, or content
//! hash), claims it through the [`IdempotencyGuard`] when one is configured,
//! then parses the plan, computes a [`ChangeSummary`] and writes it to
//! `{keyPrefix}/summary.json`. A rejected claim short-circuits with a skipped
//! output and no side effects; a failure after a granted claim releases it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::core::ChangeSummary;
use crate::core::Fingerprint;
use crate::core::ObjectLocation;
use crate::core::PlanDocument;
use crate::core::SUMMARY_FILE;
use crate::core::artifacts::sibling_key;
use crate::interfaces::ObjectStoreError;
use crate::interfaces::PlanStore;
use crate::runtime::error::PipelineError;
use crate::runtime::guard::HeldClaim;
use crate::runtime::guard::IdempotencyGuard;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum plan JSON size accepted from the object store.
pub const MAX_PLAN_BYTES: usize = 128 * 1024 * 1024;
/// Reason reported when a claim is rejected.
pub const ALREADY_PROCESSED: &str = "already-processed";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Input record shared by the summarizer and policy stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInput {
    /// Bucket holding the plan.
    pub bucket: String,
    /// Plan JSON key.
    pub plan_json_key: String,
    /// Prefix under which derived artifacts are written.
    pub key_prefix: String,
}

impl PlanInput {
    /// Returns the plan JSON location.
    #[must_use]
    pub fn plan_json(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.plan_json_key.clone())
    }

    /// Returns the location of a sibling artifact under the key prefix.
    #[must_use]
    pub fn sibling(&self, file_name: &str) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), sibling_key(&self.key_prefix, file_name))
    }
}

/// Summarizer output record.
///
/// # Invariants
/// - `skipped = true` implies `summary` and `summary_key` are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeOutput {
    /// True when the artifact version was already processed.
    pub skipped: bool,
    /// Skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Key the summary was written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_key: Option<String>,
    /// Computed summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<ChangeSummary>,
}

impl SummarizeOutput {
    /// Output for a rejected claim.
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            reason: Some(ALREADY_PROCESSED.to_string()),
            summary_key: None,
            summary: None,
        }
    }

    /// Output for a persisted summary.
    #[must_use]
    pub const fn summarized(summary_key: String, summary: ChangeSummary) -> Self {
        Self {
            skipped: false,
            reason: None,
            summary_key: Some(summary_key),
            summary: Some(summary),
        }
    }
}

// ============================================================================
// SECTION: Summarizer
// ============================================================================

/// Claim-gated change summarizer.
pub struct ChangeSummarizer {
    /// Artifact store.
    store: Arc<dyn PlanStore>,
    /// Optional idempotency guard; `None` processes every invocation.
    guard: Option<IdempotencyGuard>,
}

impl ChangeSummarizer {
    /// Creates a summarizer.
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>, guard: Option<IdempotencyGuard>) -> Self {
        Self {
            store,
            guard,
        }
    }

    /// Summarizes the plan named by `input`.
    ///
    /// The claim is kept once the summary is written and released when any
    /// later step fails.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the plan is missing or malformed, or the
    /// object or claim store fails.
    pub fn summarize(&self, input: &PlanInput) -> Result<SummarizeOutput, PipelineError> {
        self.summarize_claimed(input).map(|(output, _)| output)
    }

    /// Summarizes the plan and hands back the claim for callers that run
    /// further stages under it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the plan is missing or malformed, or the
    /// object or claim store fails. The claim is already released when an
    /// error is returned.
    pub fn summarize_claimed(
        &self,
        input: &PlanInput,
    ) -> Result<(SummarizeOutput, Option<HeldClaim>), PipelineError> {
        let location = input.plan_json();
        let mut prefetched = None;
        let mut held = None;
        if let Some(guard) = &self.guard {
            let version = self
                .store
                .head(&location)?
                .ok_or_else(|| ObjectStoreError::NotFound(location.to_string()))?;
            let fingerprint = if let Some(token) = version.token() {
                Fingerprint::new(&location, token)
            } else {
                let bytes = self.store.get(&location, MAX_PLAN_BYTES)?;
                let fingerprint = Fingerprint::from_content(&location, &bytes);
                prefetched = Some(bytes);
                fingerprint
            };
            let Some(claim) = guard.acquire(fingerprint)? else {
                return Ok((SummarizeOutput::skipped(), None));
            };
            held = Some(claim);
        }

        let result = self.write_summary(input, &location, prefetched);
        match held {
            Some(claim) => claim.release_on_error(result).map(|output| (output, Some(claim))),
            None => result.map(|output| (output, None)),
        }
    }

    /// Reads and parses the plan, then persists its summary.
    fn write_summary(
        &self,
        input: &PlanInput,
        location: &ObjectLocation,
        prefetched: Option<Vec<u8>>,
    ) -> Result<SummarizeOutput, PipelineError> {
        let bytes = match prefetched {
            Some(bytes) => bytes,
            None => self.store.get(location, MAX_PLAN_BYTES)?,
        };
        let plan = PlanDocument::from_slice(&bytes)?;
        let summary = ChangeSummary::from_changes(&plan.resource_changes, location.clone());
        let summary_location = input.sibling(SUMMARY_FILE);
        let body = serde_json::to_vec(&summary)
            .map_err(|err| PipelineError::Invalid(format!("summary serialization: {err}")))?;
        self.store.put(&summary_location, body, Some("application/json"))?;
        info!(
            summary_key = %summary_location.key,
            creates = summary.creates,
            updates = summary.updates,
            deletes = summary.deletes,
            types = summary.by_type.len(),
            "change summary written"
        );
        Ok(SummarizeOutput::summarized(summary_location.key, summary))
    }
}
