// crates/plan-review-core/src/core/mod.rs
// ============================================================================
// Module: Plan Review Core Types
// Description: Canonical manifest, plan, summary and finding models.
// Purpose: Provide stable, serializable records exchanged between stages.
// Dependencies: serde, serde_json, sha2
// ============================================================================

//! ## Overview
//! Core types are the plain structured records that cross stage boundaries.
//! None of them hold live references to stores or clients.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod artifacts;
pub mod findings;
pub mod manifest;
pub mod plan;
pub mod summary;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::APPLY_TEXT_FILE;
pub use artifacts::Fingerprint;
pub use artifacts::ObjectLocation;
pub use artifacts::ObjectVersion;
pub use artifacts::PLAN_JSON_FILE;
pub use artifacts::PLAN_TEXT_FILE;
pub use artifacts::POLICY_REPORT_FILE;
pub use artifacts::SUMMARY_FILE;
pub use findings::PolicyFinding;
pub use findings::PolicyReport;
pub use findings::ReportError;
pub use findings::Severity;
pub use manifest::ApplyStatus;
pub use manifest::Manifest;
pub use manifest::ManifestAction;
pub use plan::ActionSet;
pub use plan::PlanDocument;
pub use plan::PlanParseError;
pub use plan::ResourceChange;
pub use summary::ChangeSummary;
pub use summary::MAX_TYPE_ENTRIES;
pub use summary::TypeTally;
