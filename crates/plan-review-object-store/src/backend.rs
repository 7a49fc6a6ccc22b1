// crates/plan-review-object-store/src/backend.rs
// ============================================================================
// Module: Object Store Backend
// Description: PlanStore, LinkSigner and ClaimStore over one S3 client.
// Purpose: Bind the pipeline ports to S3-compatible object storage.
// Dependencies: plan-review-core, plan-review-config
// ============================================================================

//! ## Overview
//! Keys are validated before any request leaves the process: they must be
//! relative, free of traversal segments and within S3's key length limit.
//! Claims are small objects written with `If-None-Match: *`, so S3 itself
//! arbitrates concurrent claimants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use plan_review_config::MAX_LINK_EXPIRY_SECONDS;
use plan_review_config::ObjectStoreConfig;
use plan_review_core::ClaimOutcome;
use plan_review_core::ClaimStore;
use plan_review_core::ClaimStoreError;
use plan_review_core::Fingerprint;
use plan_review_core::LinkError;
use plan_review_core::LinkSigner;
use plan_review_core::ObjectLocation;
use plan_review_core::ObjectStoreError;
use plan_review_core::ObjectVersion;
use plan_review_core::PlanStore;
use plan_review_core::core::artifacts::sha256_hex;
use tracing::debug;

use crate::client::ObjectStoreClient;
use crate::client::S3ObjectStoreClient;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum object key length accepted by S3.
pub const MAX_OBJECT_KEY_LENGTH: usize = 1024;
/// Maximum bucket name length.
const MAX_BUCKET_NAME_LENGTH: usize = 63;
/// Minimum bucket name length.
const MIN_BUCKET_NAME_LENGTH: usize = 3;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Shared S3 client handing out the object-store ports.
#[derive(Clone)]
pub struct ObjectStoreBackend {
    /// Object-store client implementation.
    client: Arc<dyn ObjectStoreClient>,
}

impl ObjectStoreBackend {
    /// Creates a backend from object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when configuration or initialization fails.
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        Ok(Self {
            client: Arc::new(S3ObjectStoreClient::new(config)?),
        })
    }

    /// Creates a backend from a custom client (tests only).
    #[cfg(test)]
    pub(crate) fn from_client(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            client,
        }
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn plan_store(&self) -> S3PlanStore {
        S3PlanStore {
            client: Arc::clone(&self.client),
        }
    }

    /// Returns the presigned link signer.
    #[must_use]
    pub fn link_signer(&self) -> S3LinkSigner {
        S3LinkSigner {
            client: Arc::clone(&self.client),
        }
    }

    /// Returns a claim store writing under `table/` in `bucket`.
    ///
    /// When `bucket` is `None`, each claim lands in the bucket named by its
    /// fingerprint, i.e. next to the artifact it guards.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Invalid`] when the table or bucket name is
    /// invalid.
    pub fn claim_store(
        &self,
        table: &str,
        bucket: Option<String>,
    ) -> Result<ObjectStoreClaimStore, ObjectStoreError> {
        validate_segment(table)?;
        if let Some(bucket) = &bucket {
            validate_bucket(bucket)?;
        }
        Ok(ObjectStoreClaimStore {
            client: Arc::clone(&self.client),
            table: table.to_string(),
            bucket,
        })
    }
}

// ============================================================================
// SECTION: Plan Store
// ============================================================================

/// S3-backed [`PlanStore`].
pub struct S3PlanStore {
    /// Object-store client.
    client: Arc<dyn ObjectStoreClient>,
}

impl PlanStore for S3PlanStore {
    fn get(
        &self,
        location: &ObjectLocation,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError> {
        validate_location(location)?;
        debug!(bucket = %location.bucket, key = %location.key, "object get");
        self.client.get(&location.bucket, &location.key, max_bytes)
    }

    fn put(
        &self,
        location: &ObjectLocation,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        validate_location(location)?;
        debug!(bucket = %location.bucket, key = %location.key, bytes = bytes.len(), "object put");
        self.client.put(&location.bucket, &location.key, bytes, content_type)
    }

    fn head(&self, location: &ObjectLocation) -> Result<Option<ObjectVersion>, ObjectStoreError> {
        validate_location(location)?;
        self.client.head(&location.bucket, &location.key)
    }
}

// ============================================================================
// SECTION: Link Signer
// ============================================================================

/// Presigned-GET [`LinkSigner`].
pub struct S3LinkSigner {
    /// Object-store client.
    client: Arc<dyn ObjectStoreClient>,
}

impl LinkSigner for S3LinkSigner {
    fn signed_link(
        &self,
        location: &ObjectLocation,
        expiry: Duration,
    ) -> Result<String, LinkError> {
        if expiry.is_zero() || expiry > Duration::from_secs(MAX_LINK_EXPIRY_SECONDS) {
            return Err(LinkError::InvalidExpiry(format!(
                "expiry must be between 1 and {MAX_LINK_EXPIRY_SECONDS} seconds"
            )));
        }
        validate_location(location).map_err(|err| LinkError::Signing(err.to_string()))?;
        self.client.presign_get(&location.bucket, &location.key, expiry).map_err(|err| match err {
            ObjectStoreError::Invalid(message) => LinkError::InvalidExpiry(message),
            other => LinkError::Signing(other.to_string()),
        })
    }
}

// ============================================================================
// SECTION: Claim Store
// ============================================================================

/// Conditional-write [`ClaimStore`] on object storage.
///
/// # Invariants
/// - Claim keys are `{table}/{sha256(fingerprint)}`; the fingerprint itself
///   is the object body.
/// - Releasing a claim deletes its object; deleting a missing object succeeds.
pub struct ObjectStoreClaimStore {
    /// Object-store client.
    client: Arc<dyn ObjectStoreClient>,
    /// Key prefix standing in for a table name.
    table: String,
    /// Fixed claim bucket, or `None` for the artifact's bucket.
    bucket: Option<String>,
}

impl ObjectStoreClaimStore {
    /// Returns the claim location for `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimStoreError::Invalid`] when no bucket is configured and
    /// the fingerprint does not name one.
    pub fn claim_location(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<ObjectLocation, ClaimStoreError> {
        let bucket = match &self.bucket {
            Some(bucket) => bucket.clone(),
            None => {
                let bucket = fingerprint
                    .as_str()
                    .split_once('#')
                    .map(|(bucket, _)| bucket)
                    .filter(|bucket| validate_bucket(bucket).is_ok())
                    .ok_or_else(|| {
                        ClaimStoreError::Invalid("fingerprint does not name a bucket".to_string())
                    })?;
                bucket.to_string()
            }
        };
        let key = format!("{}/{}", self.table, sha256_hex(fingerprint.as_str().as_bytes()));
        Ok(ObjectLocation::new(bucket, key))
    }
}

impl ClaimStore for ObjectStoreClaimStore {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<ClaimOutcome, ClaimStoreError> {
        let location = self.claim_location(fingerprint)?;
        let body = fingerprint.as_str().as_bytes().to_vec();
        let written = self
            .client
            .put_if_absent(&location.bucket, &location.key, body)
            .map_err(claim_error)?;
        if written {
            Ok(ClaimOutcome::Inserted)
        } else {
            debug!(claim = %location, "object-store claim already present");
            Ok(ClaimOutcome::AlreadyExists)
        }
    }

    fn release(&self, fingerprint: &Fingerprint) -> Result<(), ClaimStoreError> {
        let location = self.claim_location(fingerprint)?;
        self.client.delete(&location.bucket, &location.key).map_err(claim_error)?;
        debug!(claim = %location, "object-store claim released");
        Ok(())
    }
}

/// Maps client failures onto claim store errors.
fn claim_error(err: ObjectStoreError) -> ClaimStoreError {
    match err {
        ObjectStoreError::Invalid(message) => ClaimStoreError::Invalid(message),
        ObjectStoreError::Io(message) => ClaimStoreError::Io(message),
        other => ClaimStoreError::Backend(other.to_string()),
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Validates a bucket + key pair.
fn validate_location(location: &ObjectLocation) -> Result<(), ObjectStoreError> {
    validate_bucket(&location.bucket)?;
    validate_key(&location.key)
}

/// Validates an S3 bucket name.
fn validate_bucket(bucket: &str) -> Result<(), ObjectStoreError> {
    let valid_length = (MIN_BUCKET_NAME_LENGTH ..= MAX_BUCKET_NAME_LENGTH).contains(&bucket.len());
    let valid_chars = bucket
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '-' | '.'));
    if !valid_length || !valid_chars {
        return Err(ObjectStoreError::Invalid(format!("invalid bucket name: {bucket}")));
    }
    Ok(())
}

/// Validates an object key.
fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    if key.is_empty() {
        return Err(ObjectStoreError::Invalid("object key must be set".to_string()));
    }
    if key.len() > MAX_OBJECT_KEY_LENGTH {
        return Err(ObjectStoreError::Invalid("object key exceeds length limit".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(ObjectStoreError::Invalid(
            "object key must be relative without backslashes".to_string(),
        ));
    }
    for segment in key.split('/') {
        validate_segment(segment)?;
    }
    Ok(())
}

/// Validates a single key segment.
fn validate_segment(value: &str) -> Result<(), ObjectStoreError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(ObjectStoreError::Invalid("key segment is invalid".to_string()));
    }
    if value.contains(['/', '\\']) {
        return Err(ObjectStoreError::Invalid(
            "key segment contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: In-Memory Test Client
// ============================================================================

/// Object-store client keeping objects in a map (tests only).
#[cfg(test)]
#[derive(Default)]
struct InMemoryObjectStore {
    /// Objects keyed by `bucket/key`.
    objects: std::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>,
}

#[cfg(test)]
impl InMemoryObjectStore {
    /// Builds the map key.
    fn path(bucket: &str, key: &str) -> String {
        format!("{bucket}/{key}")
    }

    /// Locks the object map.
    fn lock(
        &self,
    ) -> Result<
        std::sync::MutexGuard<'_, std::collections::BTreeMap<String, Vec<u8>>>,
        ObjectStoreError,
    > {
        self.objects.lock().map_err(|_| ObjectStoreError::Io("object store lock poisoned".to_string()))
    }
}

#[cfg(test)]
impl ObjectStoreClient for InMemoryObjectStore {
    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let path = Self::path(bucket, key);
        let bytes = self
            .lock()?
            .get(&path)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(path.clone()))?;
        if bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                path,
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        self.lock()?.insert(Self::path(bucket, key), bytes);
        Ok(())
    }

    fn put_if_absent(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<bool, ObjectStoreError> {
        let mut guard = self.lock()?;
        let path = Self::path(bucket, key);
        if guard.contains_key(&path) {
            return Ok(false);
        }
        guard.insert(path, bytes);
        Ok(true)
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.lock()?.remove(&Self::path(bucket, key));
        Ok(())
    }

    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectVersion>, ObjectStoreError> {
        Ok(self.lock()?.get(&Self::path(bucket, key)).map(|bytes| ObjectVersion {
            version_id: None,
            etag: Some(sha256_hex(bytes)),
        }))
    }

    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, ObjectStoreError> {
        Ok(format!("memory://{bucket}/{key}?X-Amz-Expires={}", expiry.as_secs()))
    }
}
