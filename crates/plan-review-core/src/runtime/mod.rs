// crates/plan-review-core/src/runtime/mod.rs
// ============================================================================
// Module: Plan Review Runtime
// Description: Review stages and the pipeline that chains them.
// Purpose: Execute manifest resolution, summarization, policy and notification.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every stage is a short-lived unit of work over the ports in
//! [`crate::interfaces`]. Stages exchange plain records and hold no state
//! across invocations; the CLI and the [`Pipeline`] call the same stage code.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod error;
pub mod guard;
pub mod memory;
pub mod notify;
pub mod pipeline;
pub mod policy;
pub mod pr_gate;
pub mod resolver;
pub mod rules;
pub mod summarizer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ErrorClass;
pub use error::PipelineError;
pub use guard::Claim;
pub use guard::HeldClaim;
pub use guard::IdempotencyGuard;
pub use memory::InMemoryClaimStore;
pub use memory::InMemoryLinkSigner;
pub use memory::InMemoryPlanStore;
pub use memory::RecordingNotifier;
pub use memory::StaticPullRequestSource;
pub use notify::DEFAULT_LINK_EXPIRY;
pub use notify::MessageLinks;
pub use notify::NotificationRenderer;
pub use notify::NotifyInput;
pub use notify::NotifyOutput;
pub use notify::render_message;
pub use pipeline::Pipeline;
pub use pipeline::PipelinePorts;
pub use pipeline::PipelineReport;
pub use pipeline::RunOutcome;
pub use policy::PolicyEngine;
pub use policy::PolicyOutput;
pub use pr_gate::GateOutcome;
pub use pr_gate::PrCheckOutput;
pub use pr_gate::PrGate;
pub use resolver::ManifestResolver;
pub use resolver::ResolvedManifest;
pub use rules::PolicyRule;
pub use rules::RULES;
pub use rules::RuleDescription;
pub use summarizer::ChangeSummarizer;
pub use summarizer::PlanInput;
pub use summarizer::SummarizeOutput;
