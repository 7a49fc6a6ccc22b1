// crates/plan-review-object-store/src/lib.rs
// ============================================================================
// Module: Plan Review Object Store
// Description: S3-compatible implementations of the storage-facing ports.
// Purpose: Read and write plan artifacts, sign links and record claims in S3.
// Dependencies: plan-review-core, plan-review-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`ObjectStoreBackend`] owns one S3 client and hands out the three ports
//! that live on object storage: [`S3PlanStore`] for artifacts,
//! [`S3LinkSigner`] for presigned read links and [`ObjectStoreClaimStore`]
//! for conditional-write claims. All ports are blocking; a private Tokio
//! runtime drives the async SDK.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
mod client;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::MAX_OBJECT_KEY_LENGTH;
pub use backend::ObjectStoreBackend;
pub use backend::ObjectStoreClaimStore;
pub use backend::S3LinkSigner;
pub use backend::S3PlanStore;
