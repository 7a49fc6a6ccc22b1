// crates/plan-review-core/src/runtime/resolver.rs
// ============================================================================
// Module: Manifest Resolver
// Description: Trigger payload parsing and manifest resolution.
// Purpose: Turn a pointer or storage event into a manifest plus sibling keys.
// Dependencies: crate::{core, interfaces}, serde_json, tracing
// ============================================================================

//! ## Overview
//! The resolver accepts either a direct `{bucket, key}` pointer or an
//! object-created event envelope (`detail.bucket.name`, `detail.object.key`),
//! reads the manifest, and derives the plan JSON, plan text and apply text keys
//! under the manifest's prefix. It performs exactly one object read and no
//! writes. The apply text key is always derived even if the object is absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::core::APPLY_TEXT_FILE;
use crate::core::Manifest;
use crate::core::ObjectLocation;
use crate::core::PLAN_JSON_FILE;
use crate::core::PLAN_TEXT_FILE;
use crate::core::artifacts::key_prefix;
use crate::core::artifacts::sibling_key;
use crate::interfaces::PlanStore;
use crate::runtime::error::PipelineError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum manifest size accepted from the object store.
pub const MAX_MANIFEST_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Manifest plus derived artifact keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedManifest {
    /// Bucket holding the artifacts.
    pub bucket: String,
    /// Prefix shared by all sibling artifacts.
    pub key_prefix: String,
    /// Parsed manifest.
    pub manifest: Manifest,
    /// Plan JSON key.
    pub plan_json_key: String,
    /// Rendered plan text key.
    pub plan_text_key: String,
    /// Apply log key; the object may not exist yet.
    pub apply_text_key: String,
}

impl ResolvedManifest {
    /// Returns the plan JSON location.
    #[must_use]
    pub fn plan_json(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.plan_json_key.clone())
    }

    /// Returns the plan text location.
    #[must_use]
    pub fn plan_text(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.plan_text_key.clone())
    }

    /// Returns the apply text location.
    #[must_use]
    pub fn apply_text(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.apply_text_key.clone())
    }
}

// ============================================================================
// SECTION: Trigger Parsing
// ============================================================================

/// Extracts the manifest location from a trigger payload.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedInputShape`] when the payload is
/// neither a `{bucket, key}` pointer nor an object-created event.
pub fn manifest_location(payload: &Value) -> Result<ObjectLocation, PipelineError> {
    let direct = (
        payload.get("bucket").and_then(Value::as_str),
        payload.get("key").and_then(Value::as_str),
    );
    if let (Some(bucket), Some(key)) = direct {
        return non_empty_location(bucket, key);
    }
    let event = (
        payload.pointer("/detail/bucket/name").and_then(Value::as_str),
        payload.pointer("/detail/object/key").and_then(Value::as_str),
    );
    if let (Some(bucket), Some(key)) = event {
        return non_empty_location(bucket, key);
    }
    Err(PipelineError::UnsupportedInputShape(
        "expected {bucket, key} or an object-created event with detail.bucket.name and \
         detail.object.key"
            .to_string(),
    ))
}

/// Builds a location, rejecting empty bucket or key strings.
fn non_empty_location(bucket: &str, key: &str) -> Result<ObjectLocation, PipelineError> {
    if bucket.trim().is_empty() || key.trim().is_empty() {
        return Err(PipelineError::UnsupportedInputShape(
            "bucket and key must be non-empty".to_string(),
        ));
    }
    Ok(ObjectLocation::new(bucket, key))
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves trigger payloads into manifests and sibling artifact keys.
pub struct ManifestResolver {
    /// Object store holding the manifest.
    store: Arc<dyn PlanStore>,
}

impl ManifestResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self {
            store,
        }
    }

    /// Resolves a trigger payload.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for unsupported payloads, unreadable or
    /// malformed manifests, and object-store failures.
    pub fn resolve(&self, payload: &Value) -> Result<ResolvedManifest, PipelineError> {
        let location = manifest_location(payload)?;
        let prefix = key_prefix(&location.key)
            .ok_or_else(|| {
                PipelineError::UnsupportedInputShape(format!(
                    "manifest key has no prefix: {}",
                    location.key
                ))
            })?
            .to_string();
        let bytes = self.store.get(&location, MAX_MANIFEST_BYTES)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|err| PipelineError::ManifestParse(err.to_string()))?;
        info!(
            bucket = %location.bucket,
            key = %location.key,
            repository = %manifest.repository,
            pr = manifest.pull_request_number,
            action = %manifest.action,
            "manifest resolved"
        );
        Ok(ResolvedManifest {
            plan_json_key: sibling_key(&prefix, PLAN_JSON_FILE),
            plan_text_key: sibling_key(&prefix, PLAN_TEXT_FILE),
            apply_text_key: sibling_key(&prefix, APPLY_TEXT_FILE),
            bucket: location.bucket,
            key_prefix: prefix,
            manifest,
        })
    }
}
