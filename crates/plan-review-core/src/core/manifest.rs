// crates/plan-review-core/src/core/manifest.rs
// ============================================================================
// Module: Plan Review Manifest
// Description: Manifest record describing one plan or apply event.
// Purpose: Typed view of the manifest JSON written by the orchestrator.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A manifest identifies the repository, pull request, project and action a
//! set of artifacts belongs to. It is produced upstream and is read-only here.
//! The JSON uses the orchestrator's short field names (`repo`, `pr`, `commit`,
//! `has_changes`); the descriptive names are accepted as aliases.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Enums
// ============================================================================

/// Terraform action recorded by a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestAction {
    /// A `terraform plan` run.
    Plan,
    /// A `terraform apply` run.
    Apply,
}

impl ManifestAction {
    /// Returns the stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for ManifestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an apply run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    /// Apply finished successfully.
    Success,
    /// Apply failed.
    Failure,
}

impl ApplyStatus {
    /// Returns the stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Manifest describing one plan/apply event.
///
/// # Invariants
/// - `status` is only meaningful when `action` is [`ManifestAction::Apply`].
/// - `has_changes` is only set for plan runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Repository as `owner/name`.
    #[serde(rename = "repo", alias = "repository")]
    pub repository: String,
    /// Pull request number.
    #[serde(rename = "pr", alias = "pullRequestNumber")]
    pub pull_request_number: u64,
    /// Project identifier within the repository.
    pub project: String,
    /// Terraform action.
    pub action: ManifestAction,
    /// Apply outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplyStatus>,
    /// Commit SHA the run was executed against.
    #[serde(rename = "commit", alias = "commitSha")]
    pub commit_sha: String,
    /// Whether the plan detected changes.
    #[serde(
        rename = "has_changes",
        alias = "hasChanges",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub has_changes: Option<bool>,
}

impl Manifest {
    /// Returns true for apply manifests.
    #[must_use]
    pub fn is_apply(&self) -> bool {
        self.action == ManifestAction::Apply
    }
}
