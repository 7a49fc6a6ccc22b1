// crates/plan-review-providers/src/lib.rs
// ============================================================================
// Module: Plan Review Providers
// Description: HTTP implementations of the source-control and notifier ports.
// Purpose: Reach GitHub and chat webhooks with bounded, blocking requests.
// Dependencies: plan-review-core, reqwest, serde
// ============================================================================

//! ## Overview
//! [`GitHubPullRequestSource`] answers the pull request gate and
//! [`WebhookNotifier`] delivers rendered messages. Both use a blocking
//! `reqwest` client with a fixed timeout and redirects disabled.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod github;
pub mod webhook;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use github::GitHubConfig;
pub use github::GitHubPullRequestSource;
pub use webhook::WebhookNotifier;
