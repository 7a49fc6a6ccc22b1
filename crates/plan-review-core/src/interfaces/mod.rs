// crates/plan-review-core/src/interfaces/mod.rs
// ============================================================================
// Module: Plan Review Interfaces
// Description: Backend-agnostic ports for storage, claims, links and delivery.
// Purpose: Define the contract surfaces used by the pipeline stages.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe how the pipeline reaches external systems without
//! embedding backend-specific details. Every port is synchronous and scoped to
//! a single invocation; implementations hold no state across invocations
//! beyond reusable clients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::core::Fingerprint;
use crate::core::ObjectLocation;
use crate::core::ObjectVersion;

// ============================================================================
// SECTION: Plan Store
// ============================================================================

/// Object-store errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObjectStoreError {
    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Invalid key or request.
    #[error("object store invalid request: {0}")]
    Invalid(String),
    /// Backend I/O failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Backend returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Object exceeds the caller's size limit.
    #[error("object too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
}

/// Read/write access to plan and apply artifacts.
pub trait PlanStore: Send + Sync {
    /// Reads an object, failing when it exceeds `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the object is missing, too large, or
    /// the backend fails.
    fn get(
        &self,
        location: &ObjectLocation,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError>;

    /// Writes an object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend rejects the write.
    fn put(
        &self,
        location: &ObjectLocation,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;

    /// Returns version metadata, or `None` when the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the backend fails.
    fn head(&self, location: &ObjectLocation) -> Result<Option<ObjectVersion>, ObjectStoreError>;
}

// ============================================================================
// SECTION: Link Signer
// ============================================================================

/// Link signing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Requested expiry is outside the backend's limits.
    #[error("link expiry invalid: {0}")]
    InvalidExpiry(String),
    /// Signing failed.
    #[error("link signing failed: {0}")]
    Signing(String),
}

/// Produces time-limited read links for stored artifacts.
pub trait LinkSigner: Send + Sync {
    /// Returns a read link for `location` valid for `expiry`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError`] when the link cannot be produced.
    fn signed_link(
        &self,
        location: &ObjectLocation,
        expiry: Duration,
    ) -> Result<String, LinkError>;
}

// ============================================================================
// SECTION: Claim Store
// ============================================================================

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The key was absent and has been inserted by this caller.
    Inserted,
    /// The key already existed; nothing was written.
    AlreadyExists,
}

/// Claim store failures other than the expected conditional-check failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimStoreError {
    /// Store I/O failure.
    #[error("claim store io error: {0}")]
    Io(String),
    /// Store backend failure.
    #[error("claim store backend error: {0}")]
    Backend(String),
    /// Invalid claim request.
    #[error("claim store invalid request: {0}")]
    Invalid(String),
}

/// Conditional-insert key store backing the idempotency guard.
pub trait ClaimStore: Send + Sync {
    /// Inserts `fingerprint` only if it does not already exist.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError`] for any failure other than the key already
    /// existing, which is reported as [`ClaimOutcome::AlreadyExists`].
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<ClaimOutcome, ClaimStoreError>;

    /// Removes the claim on `fingerprint` so a later invocation can take it.
    ///
    /// Releasing an absent fingerprint is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError`] when the store cannot remove the claim.
    fn release(&self, fingerprint: &Fingerprint) -> Result<(), ClaimStoreError>;
}

// ============================================================================
// SECTION: Pull Request Source
// ============================================================================

/// Current state of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestState {
    /// Raw state label (`open`, `closed`).
    pub state: String,
    /// True once merged.
    pub merged: bool,
}

impl PullRequestState {
    /// Returns true when the pull request is open and unmerged.
    #[must_use]
    pub fn is_open_unmerged(&self) -> bool {
        self.state.eq_ignore_ascii_case("open") && !self.merged
    }
}

/// Source-control lookup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceControlError {
    /// Request could not be completed.
    #[error("request failed: {0}")]
    Request(String),
    /// Non-success HTTP status.
    #[error("http status {0}")]
    Status(u16),
    /// Response body could not be parsed.
    #[error("response parse failed: {0}")]
    Parse(String),
    /// Invalid lookup input.
    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Reads pull request state from a source-control API.
pub trait PullRequestSource: Send + Sync {
    /// Fetches the state of pull request `number` in `repository`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceControlError`] when the lookup fails.
    fn pull_request(
        &self,
        repository: &str,
        number: u64,
    ) -> Result<PullRequestState, SourceControlError>;
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Notification delivery errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// The notifier is not configured.
    #[error("notifier not configured: {0}")]
    NotConfigured(String),
    /// Delivery failed.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Delivers rendered messages to a chat endpoint.
pub trait Notifier: Send + Sync {
    /// Delivers `text`.
    ///
    /// # Errors
    ///
    /// Returns [`NotifierError`] when delivery fails.
    fn deliver(&self, text: &str) -> Result<(), NotifierError>;
}
