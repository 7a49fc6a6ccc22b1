// crates/plan-review-core/src/lib.rs
// ============================================================================
// Module: Plan Review Core Library
// Description: Public API surface for the plan review pipeline.
// Purpose: Expose core records, ports, and the review stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Plan review core resolves change manifests, summarizes Terraform plans at
//! most once per artifact version, evaluates security rules, and renders
//! notifications with time-limited artifact links. Storage, claims, source
//! control and chat delivery are reached only through the traits in
//! [`interfaces`], so every stage runs unchanged against in-memory or real
//! backends.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ClaimOutcome;
pub use interfaces::ClaimStore;
pub use interfaces::ClaimStoreError;
pub use interfaces::LinkError;
pub use interfaces::LinkSigner;
pub use interfaces::Notifier;
pub use interfaces::NotifierError;
pub use interfaces::ObjectStoreError;
pub use interfaces::PlanStore;
pub use interfaces::PullRequestSource;
pub use interfaces::PullRequestState;
pub use interfaces::SourceControlError;
pub use runtime::ChangeSummarizer;
pub use runtime::ErrorClass;
pub use runtime::GateOutcome;
pub use runtime::IdempotencyGuard;
pub use runtime::ManifestResolver;
pub use runtime::NotificationRenderer;
pub use runtime::NotifyInput;
pub use runtime::Pipeline;
pub use runtime::PipelineError;
pub use runtime::PipelinePorts;
pub use runtime::PipelineReport;
pub use runtime::PlanInput;
pub use runtime::PolicyEngine;
pub use runtime::PolicyOutput;
pub use runtime::PrCheckOutput;
pub use runtime::PrGate;
pub use runtime::ResolvedManifest;
pub use runtime::RunOutcome;
pub use runtime::SummarizeOutput;
