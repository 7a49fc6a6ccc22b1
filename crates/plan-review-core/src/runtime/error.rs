// crates/plan-review-core/src/runtime/error.rs
// ============================================================================
// Module: Pipeline Errors
// Description: Error taxonomy shared by every pipeline stage.
// Purpose: Separate fatal input errors from retryable external failures.
// Dependencies: crate::interfaces, thiserror
// ============================================================================

//! ## Overview
//! Stages fail with [`PipelineError`]. Each variant belongs to one
//! [`ErrorClass`]: input errors are fatal for the invocation and must not be
//! retried; transient errors are surfaced to the invoking platform, which may
//! retry. Idempotency conflicts and degraded PR checks are not errors and never
//! appear here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::PlanParseError;
use crate::interfaces::ClaimStoreError;
use crate::interfaces::LinkError;
use crate::interfaces::NotifierError;
use crate::interfaces::ObjectStoreError;

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Coarse error classes for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad trigger, manifest or plan input. Not retryable.
    Input,
    /// External system failure. Retryable by the platform.
    Transient,
}

impl ErrorClass {
    /// Returns the stable label for the class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Transient => "transient",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stage failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Trigger payload matched no accepted shape.
    #[error("unsupported input shape: {0}")]
    UnsupportedInputShape(String),
    /// Manifest bytes did not match the manifest schema.
    #[error("manifest parse error: {0}")]
    ManifestParse(String),
    /// Plan JSON is malformed.
    #[error(transparent)]
    PlanParse(#[from] PlanParseError),
    /// Stage input is otherwise invalid.
    #[error("invalid stage input: {0}")]
    Invalid(String),
    /// Object-store failure.
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    /// Idempotency store failure other than an existing claim.
    #[error(transparent)]
    Claim(#[from] ClaimStoreError),
    /// Read link could not be produced.
    #[error(transparent)]
    LinkSigning(#[from] LinkError),
    /// Notification could not be delivered.
    #[error(transparent)]
    Delivery(#[from] NotifierError),
}

impl PipelineError {
    /// Returns the error class.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedInputShape(_)
            | Self::ManifestParse(_)
            | Self::PlanParse(_)
            | Self::Invalid(_) => ErrorClass::Input,
            Self::ObjectStore(_) | Self::Claim(_) | Self::LinkSigning(_) | Self::Delivery(_) => {
                ErrorClass::Transient
            }
        }
    }

    /// Returns true when the invoking platform may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient)
    }
}
