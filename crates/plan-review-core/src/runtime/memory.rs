// crates/plan-review-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Ports
// Description: Process-local implementations of every pipeline port.
// Purpose: Drive stage and end-to-end tests without external services.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! These implementations keep state behind `Arc<Mutex<..>>` so clones share
//! one store, mirroring how several invocations would share a real backend.
//! They are not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::Fingerprint;
use crate::core::ObjectLocation;
use crate::core::ObjectVersion;
use crate::interfaces::ClaimOutcome;
use crate::interfaces::ClaimStore;
use crate::interfaces::ClaimStoreError;
use crate::interfaces::LinkError;
use crate::interfaces::LinkSigner;
use crate::interfaces::Notifier;
use crate::interfaces::NotifierError;
use crate::interfaces::ObjectStoreError;
use crate::interfaces::PlanStore;
use crate::interfaces::PullRequestSource;
use crate::interfaces::PullRequestState;
use crate::interfaces::SourceControlError;

// ============================================================================
// SECTION: Plan Store
// ============================================================================

/// Stored object with its metadata.
#[derive(Debug, Clone)]
struct StoredObject {
    /// Object bytes.
    bytes: Vec<u8>,
    /// Version id assigned at write time.
    version_id: Option<String>,
}

/// In-memory object store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanStore {
    /// Objects keyed by `bucket/key`.
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    /// Whether writes assign version ids.
    unversioned: bool,
    /// Monotonic version counter.
    versions: Arc<Mutex<u64>>,
}

impl InMemoryPlanStore {
    /// Creates a versioned store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that reports neither version ids nor etags.
    #[must_use]
    pub fn unversioned() -> Self {
        Self {
            unversioned: true,
            ..Self::default()
        }
    }

    /// Writes an object directly, bypassing the port.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the store lock is poisoned.
    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<(), ObjectStoreError> {
        self.put(&ObjectLocation::new(bucket, key), bytes.into(), None)
    }

    /// Returns a copy of the stored bytes, if any.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let guard = self.objects.lock().ok()?;
        guard.get(&object_key(&ObjectLocation::new(bucket, key))).map(|object| object.bytes.clone())
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    /// Returns true when the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates the next version id.
    fn next_version(&self) -> Result<Option<String>, ObjectStoreError> {
        if self.unversioned {
            return Ok(None);
        }
        let mut counter = self
            .versions
            .lock()
            .map_err(|_| ObjectStoreError::Io("version counter mutex poisoned".to_string()))?;
        *counter += 1;
        Ok(Some(format!("v{}", *counter)))
    }
}

/// Builds the map key for a location.
fn object_key(location: &ObjectLocation) -> String {
    format!("{}/{}", location.bucket, location.key)
}

impl PlanStore for InMemoryPlanStore {
    fn get(
        &self,
        location: &ObjectLocation,
        max_bytes: usize,
    ) -> Result<Vec<u8>, ObjectStoreError> {
        let guard = self
            .objects
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store mutex poisoned".to_string()))?;
        let object = guard
            .get(&object_key(location))
            .ok_or_else(|| ObjectStoreError::NotFound(location.to_string()))?;
        if object.bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                path: location.to_string(),
                max_bytes,
                actual_bytes: object.bytes.len(),
            });
        }
        Ok(object.bytes.clone())
    }

    fn put(
        &self,
        location: &ObjectLocation,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let version_id = self.next_version()?;
        self.objects
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store mutex poisoned".to_string()))?
            .insert(object_key(location), StoredObject {
                bytes,
                version_id,
            });
        Ok(())
    }

    fn head(&self, location: &ObjectLocation) -> Result<Option<ObjectVersion>, ObjectStoreError> {
        let guard = self
            .objects
            .lock()
            .map_err(|_| ObjectStoreError::Io("object store mutex poisoned".to_string()))?;
        Ok(guard.get(&object_key(location)).map(|object| ObjectVersion {
            version_id: object.version_id.clone(),
            etag: None,
        }))
    }
}

// ============================================================================
// SECTION: Link Signer
// ============================================================================

/// Link signer producing deterministic `memory://` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryLinkSigner;

impl LinkSigner for InMemoryLinkSigner {
    fn signed_link(
        &self,
        location: &ObjectLocation,
        expiry: Duration,
    ) -> Result<String, LinkError> {
        if expiry.is_zero() {
            return Err(LinkError::InvalidExpiry("expiry must be positive".to_string()));
        }
        Ok(format!("memory://{}/{}?expires={}", location.bucket, location.key, expiry.as_secs()))
    }
}

// ============================================================================
// SECTION: Claim Store
// ============================================================================

/// In-memory conditional-insert claim store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClaimStore {
    /// Claimed fingerprints.
    claims: Arc<Mutex<BTreeSet<String>>>,
}

impl InMemoryClaimStore {
    /// Creates an empty claim store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `fingerprint` has been claimed.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.claims.lock().is_ok_and(|guard| guard.contains(fingerprint.as_str()))
    }
}

impl ClaimStore for InMemoryClaimStore {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<ClaimOutcome, ClaimStoreError> {
        let inserted = self
            .claims
            .lock()
            .map_err(|_| ClaimStoreError::Io("claim store mutex poisoned".to_string()))?
            .insert(fingerprint.as_str().to_string());
        Ok(if inserted { ClaimOutcome::Inserted } else { ClaimOutcome::AlreadyExists })
    }

    fn release(&self, fingerprint: &Fingerprint) -> Result<(), ClaimStoreError> {
        self.claims
            .lock()
            .map_err(|_| ClaimStoreError::Io("claim store mutex poisoned".to_string()))?
            .remove(fingerprint.as_str());
        Ok(())
    }
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Notifier recording every delivered message.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    /// Delivered messages in order.
    messages: Arc<Mutex<Vec<String>>>,
    /// When set, every delivery fails with this cause.
    failure: Option<String>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that rejects every message.
    #[must_use]
    pub fn failing(cause: impl Into<String>) -> Self {
        Self {
            failure: Some(cause.into()),
            ..Self::default()
        }
    }

    /// Returns the delivered messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, text: &str) -> Result<(), NotifierError> {
        if let Some(cause) = &self.failure {
            return Err(NotifierError::DeliveryFailed(cause.clone()));
        }
        self.messages
            .lock()
            .map_err(|_| NotifierError::DeliveryFailed("notifier mutex poisoned".to_string()))?
            .push(text.to_string());
        Ok(())
    }
}

// ============================================================================
// SECTION: Pull Request Source
// ============================================================================

/// Pull request source returning a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticPullRequestSource {
    /// Answer returned for every lookup.
    answer: Result<PullRequestState, SourceControlError>,
}

impl StaticPullRequestSource {
    /// Answers with the given state.
    #[must_use]
    pub fn state(state: &str, merged: bool) -> Self {
        Self {
            answer: Ok(PullRequestState {
                state: state.to_string(),
                merged,
            }),
        }
    }

    /// Answers with the given error.
    #[must_use]
    pub const fn failing(error: SourceControlError) -> Self {
        Self {
            answer: Err(error),
        }
    }
}

impl PullRequestSource for StaticPullRequestSource {
    fn pull_request(
        &self,
        _repository: &str,
        _number: u64,
    ) -> Result<PullRequestState, SourceControlError> {
        self.answer.clone()
    }
}
