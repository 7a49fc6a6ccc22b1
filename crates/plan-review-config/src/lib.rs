// crates/plan-review-config/src/lib.rs
// ============================================================================
// Module: Plan Review Config Library
// Description: Canonical config model, environment overrides, and validation.
// Purpose: Single source of truth for plan-review.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `plan-review-config` defines the configuration model for the plan review
//! pipeline. Files are optional: every setting has a default, and the
//! recognised environment options override file values. Validation is strict
//! and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
