// crates/plan-review-core/src/runtime/guard.rs
// ============================================================================
// Module: Idempotency Guard
// Description: At-most-once claims over artifact fingerprints.
// Purpose: Ensure one artifact version is summarized exactly once.
// Dependencies: crate::{core, interfaces}, tracing
// ============================================================================

//! ## Overview
//! The guard wraps a [`ClaimStore`]: the first caller to insert a fingerprint
//! is granted the claim; every later caller observes `claimed = false` and
//! must skip. The store's conditional insert is the only mutual exclusion
//! between concurrent invocations; no extra locking is layered on top.
//!
//! A granted claim is held as a [`HeldClaim`]. When work after the claim
//! fails, the claim is released so the platform's retry can take it again;
//! a claim is only kept once the guarded work has completed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::Fingerprint;
use crate::interfaces::ClaimOutcome;
use crate::interfaces::ClaimStore;
use crate::interfaces::ClaimStoreError;
use crate::runtime::error::PipelineError;

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// True only for the first caller with this fingerprint.
    pub claimed: bool,
}

/// Idempotency guard over a conditional-insert store.
#[derive(Clone)]
pub struct IdempotencyGuard {
    /// Backing claim store.
    store: Arc<dyn ClaimStore>,
}

impl IdempotencyGuard {
    /// Creates a guard over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ClaimStore>) -> Self {
        Self {
            store,
        }
    }

    /// Attempts to claim `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError`] for store failures; an existing claim is not
    /// an error.
    pub fn try_claim(&self, fingerprint: &Fingerprint) -> Result<Claim, ClaimStoreError> {
        match self.store.insert_if_absent(fingerprint)? {
            ClaimOutcome::Inserted => {
                debug!(fingerprint = %fingerprint, "fingerprint claimed");
                Ok(Claim {
                    claimed: true,
                })
            }
            ClaimOutcome::AlreadyExists => {
                info!(fingerprint = %fingerprint, "fingerprint already claimed");
                Ok(Claim {
                    claimed: false,
                })
            }
        }
    }

    /// Claims `fingerprint` and returns the held claim, or `None` when another
    /// invocation already holds it.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError`] for store failures.
    pub fn acquire(&self, fingerprint: Fingerprint) -> Result<Option<HeldClaim>, ClaimStoreError> {
        if !self.try_claim(&fingerprint)?.claimed {
            return Ok(None);
        }
        Ok(Some(HeldClaim {
            guard: self.clone(),
            fingerprint,
        }))
    }

    /// Releases the claim on `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError`] when the store cannot remove the claim.
    pub fn release(&self, fingerprint: &Fingerprint) -> Result<(), ClaimStoreError> {
        self.store.release(fingerprint)?;
        info!(fingerprint = %fingerprint, "fingerprint claim released");
        Ok(())
    }
}

// ============================================================================
// SECTION: Held Claim
// ============================================================================

/// Claim granted to the current invocation.
pub struct HeldClaim {
    /// Guard that granted the claim.
    guard: IdempotencyGuard,
    /// Claimed fingerprint.
    fingerprint: Fingerprint,
}

impl HeldClaim {
    /// Returns the claimed fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Passes `result` through, releasing the claim first when it is an error.
    ///
    /// A failed release is logged and the stage error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error carried by `result`.
    pub fn release_on_error<T>(&self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if let Err(stage_err) = &result
            && let Err(err) = self.guard.release(&self.fingerprint)
        {
            warn!(
                fingerprint = %self.fingerprint,
                stage_error = %stage_err,
                error = %err,
                "claim release failed"
            );
        }
        result
    }
}
