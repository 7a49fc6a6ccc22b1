// crates/plan-review-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Claim Store
// Description: Durable ClaimStore backend using a SQLite table.
// Purpose: Back the idempotency guard with a transactional table.
// Dependencies: plan-review-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`plan_review_core::ClaimStore`]. A
//! claim is a single row keyed by fingerprint; the primary-key conflict on a
//! second insert is the "already claimed" signal.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_FINGERPRINT_LENGTH;
pub use store::SqliteClaimStore;
pub use store::SqliteClaimStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
