// crates/plan-review-core/src/core/artifacts.rs
// ============================================================================
// Module: Plan Review Artifact Addressing
// Description: Object locations, sibling artifact keys, and fingerprints.
// Purpose: Give every stage one canonical way to name stored artifacts.
// Dependencies: serde, sha2
// ============================================================================

//! ## Overview
//! Plan and apply artifacts live side by side under a single key prefix in an
//! object store. This module derives the sibling keys from the manifest key
//! and builds the idempotency fingerprint for one version of one artifact.
//! Invariants:
//! - Sibling keys are always `{prefix}/{suffix}` with fixed suffixes.
//! - A fingerprint is `"{bucket}#{key}#{version-token}"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the Terraform plan JSON artifact.
pub const PLAN_JSON_FILE: &str = "tfplan.json";
/// File name of the rendered plan text artifact.
pub const PLAN_TEXT_FILE: &str = "plan.txt";
/// File name of the apply log artifact.
pub const APPLY_TEXT_FILE: &str = "apply.txt";
/// File name of the persisted change summary.
pub const SUMMARY_FILE: &str = "summary.json";
/// File name of the persisted policy report.
pub const POLICY_REPORT_FILE: &str = "policy.json";

// ============================================================================
// SECTION: Object Location
// ============================================================================

/// Bucket + key address of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Bucket name.
    pub bucket: String,
    /// Object key inside the bucket.
    pub key: String,
}

impl ObjectLocation {
    /// Creates a new object location.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Version metadata reported by an object store for one object.
///
/// # Invariants
/// - Both fields are `None` when the backend exposes neither versioning nor etags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersion {
    /// Backend version identifier (versioned buckets only).
    pub version_id: Option<String>,
    /// Entity tag of the current object content.
    pub etag: Option<String>,
}

impl ObjectVersion {
    /// Returns the version id when present, otherwise the etag.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.version_id
            .as_deref()
            .filter(|value| !value.is_empty() && *value != "null")
            .or_else(|| self.etag.as_deref().filter(|value| !value.is_empty()))
    }
}

// ============================================================================
// SECTION: Sibling Keys
// ============================================================================

/// Joins a key prefix and a file name.
#[must_use]
pub fn sibling_key(prefix: &str, file_name: &str) -> String {
    format!("{prefix}/{file_name}")
}

/// Returns the key prefix of a manifest key (everything before the last `/`).
#[must_use]
pub fn key_prefix(manifest_key: &str) -> Option<&str> {
    manifest_key.rsplit_once('/').map(|(prefix, _)| prefix).filter(|prefix| !prefix.is_empty())
}

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// String identifying one version of one stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Builds a fingerprint from a location and a version token.
    #[must_use]
    pub fn new(location: &ObjectLocation, version_token: &str) -> Self {
        Self(format!("{}#{}#{}", location.bucket, location.key, version_token))
    }

    /// Builds a fingerprint from a location and the content of the object.
    #[must_use]
    pub fn from_content(location: &ObjectLocation, bytes: &[u8]) -> Self {
        Self::new(location, &content_token(bytes))
    }

    /// Wraps an already-formatted fingerprint string.
    #[must_use]
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the fingerprint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns the `sha256:<hex>` content token for object bytes.
#[must_use]
pub fn content_token(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256_hex(bytes))
}

/// Returns the lowercase hex sha256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
