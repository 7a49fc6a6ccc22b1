// crates/plan-review-object-store/src/client.rs
// ============================================================================
// Module: S3 Object Store Client
// Description: Blocking facade over the async aws-sdk-s3 client.
// Purpose: Provide get/put/delete/head/presign and conditional put to the ports.
// Dependencies: plan-review-core, plan-review-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! The SDK is async; the pipeline ports are not. Every call is driven to
//! completion on a private runtime, or on the caller's runtime when one is
//! already active. Reads are size-bounded while streaming so an oversized
//! object never lands in memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use plan_review_config::ObjectStoreConfig;
use plan_review_core::ObjectStoreError;
use plan_review_core::ObjectVersion;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Client Trait
// ============================================================================

/// Minimal object-store client abstraction.
pub(crate) trait ObjectStoreClient: Send + Sync {
    /// Reads a single object with a size limit.
    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError>;

    /// Writes a single object.
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;

    /// Writes an object only when the key is absent; returns false otherwise.
    fn put_if_absent(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<bool, ObjectStoreError>;

    /// Deletes a single object; a missing object is not an error.
    fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;

    /// Returns version metadata, or `None` when the object is missing.
    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectVersion>, ObjectStoreError>;

    /// Returns a presigned GET URL.
    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, ObjectStoreError>;
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, ObjectStoreError>
where
    F: Future<Output = Result<T, ObjectStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| ObjectStoreError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(ObjectStoreError::Io("object store thread join failed".to_string())));
    }

    runtime.block_on(future)
}

/// Returns true when a conditional write lost to an existing object.
fn is_precondition_failure<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.as_service_error()
        .and_then(|service| service.code())
        .is_some_and(|code| code == "PreconditionFailed" || code == "ConditionalRequestConflict")
}

// ============================================================================
// SECTION: S3 Client
// ============================================================================

/// S3-backed object-store client.
pub(crate) struct S3ObjectStoreClient {
    /// Underlying S3 client.
    client: Client,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ObjectStoreClient {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ObjectStoreClient {
    /// Builds a new S3 client from configuration and the ambient AWS chain.
    pub(crate) fn new(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        config.validate().map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
        let runtime = Runtime::new().map_err(|err| ObjectStoreError::Io(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint.clone();
        let shared_config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shutdown.
    fn runtime(&self) -> Result<&Runtime, ObjectStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| ObjectStoreError::Io("object store runtime closed".to_string()))
    }
}

impl ObjectStoreClient for S3ObjectStoreClient {
    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let path = format!("s3://{bucket}/{key}");
            let output = match client.get_object().bucket(bucket).key(key).send().await {
                Ok(output) => output,
                Err(err) if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) => {
                    return Err(ObjectStoreError::NotFound(path));
                }
                Err(err) => return Err(ObjectStoreError::Backend(err.to_string())),
            };
            if let Some(length) = output.content_length() {
                let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
                if actual_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        path,
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut total_bytes = 0usize;
            let mut chunk = [0u8; 8192];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| ObjectStoreError::Io(err.to_string()))?;
                if read == 0 {
                    break;
                }
                total_bytes = total_bytes
                    .checked_add(read)
                    .ok_or_else(|| ObjectStoreError::Io("object size overflow".to_string()))?;
                if total_bytes > max_bytes {
                    return Err(ObjectStoreError::TooLarge {
                        path,
                        max_bytes,
                        actual_bytes: total_bytes,
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let body = ByteStream::from(bytes);
            let mut request = client.put_object().bucket(bucket).key(key).body(body);
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn put_if_absent(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<bool, ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let result = client
                .put_object()
                .bucket(bucket)
                .key(key)
                .if_none_match("*")
                .body(ByteStream::from(bytes))
                .send()
                .await;
            match result {
                Ok(_) => Ok(true),
                Err(err) if is_precondition_failure(&err) => Ok(false),
                Err(err) => Err(ObjectStoreError::Backend(err.to_string())),
            }
        })
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            client
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectVersion>, ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            match client.head_object().bucket(bucket).key(key).send().await {
                Ok(output) => Ok(Some(ObjectVersion {
                    version_id: output.version_id().map(str::to_string),
                    etag: output.e_tag().map(|tag| tag.trim_matches('"').to_string()),
                })),
                Err(err) if err.as_service_error().is_some_and(HeadObjectError::is_not_found) => {
                    Ok(None)
                }
                Err(err) => Err(ObjectStoreError::Backend(err.to_string())),
            }
        })
    }

    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry: Duration,
    ) -> Result<String, ObjectStoreError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let presigning = PresigningConfig::expires_in(expiry)
                .map_err(|err| ObjectStoreError::Invalid(err.to_string()))?;
            let request = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presigning)
                .await
                .map_err(|err| ObjectStoreError::Backend(err.to_string()))?;
            Ok(request.uri().to_string())
        })
    }
}
