// crates/plan-review-cli/src/ports.rs
// ============================================================================
// Module: Port Wiring
// Description: Builds live pipeline ports from validated configuration.
// Purpose: Select claim, source-control and notifier backends per config.
// Dependencies: plan-review-config, plan-review-object-store,
//               plan-review-store-sqlite, plan-review-providers
// ============================================================================

//! ## Overview
//! Optional collaborators stay optional: no idempotency table disables the
//! guard and no token disables the live pull request check. The notifier is
//! required only by commands that deliver.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use plan_review_config::ClaimBackend;
use plan_review_config::PlanReviewConfig;
use plan_review_config::WEBHOOK_ENV_VAR;
use plan_review_core::ClaimStore;
use plan_review_core::Notifier;
use plan_review_core::PipelinePorts;
use plan_review_core::PullRequestSource;
use plan_review_object_store::ObjectStoreBackend;
use plan_review_providers::GitHubConfig;
use plan_review_providers::GitHubPullRequestSource;
use plan_review_providers::WebhookNotifier;
use plan_review_store_sqlite::SqliteClaimStore;
use plan_review_store_sqlite::SqliteClaimStoreConfig;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Port construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// Object-store client could not be created.
    #[error("object store setup failed: {0}")]
    ObjectStore(String),
    /// Claim store could not be opened.
    #[error("claim store setup failed: {0}")]
    Claims(String),
    /// Source-control client could not be created.
    #[error("pull request source setup failed: {0}")]
    PullRequests(String),
    /// Notifier is missing or invalid.
    #[error("notifier setup failed: {0}")]
    Notifier(String),
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the shared S3 backend.
///
/// # Errors
///
/// Returns [`SetupError::ObjectStore`] when the client cannot be created.
pub fn object_store(config: &PlanReviewConfig) -> Result<ObjectStoreBackend, SetupError> {
    ObjectStoreBackend::new(&config.object_store)
        .map_err(|err| SetupError::ObjectStore(err.to_string()))
}

/// Builds the configured claim store, or `None` when the guard is disabled.
///
/// # Errors
///
/// Returns [`SetupError::Claims`] when the backend cannot be opened.
pub fn claim_store(
    config: &PlanReviewConfig,
    backend: &ObjectStoreBackend,
) -> Result<Option<Arc<dyn ClaimStore>>, SetupError> {
    let settings = &config.idempotency;
    let Some(table) = &settings.table else {
        debug!("idempotency guard disabled");
        return Ok(None);
    };
    let store: Arc<dyn ClaimStore> = match settings.backend {
        ClaimBackend::Sqlite => {
            let path = settings.path.clone().ok_or_else(|| {
                SetupError::Claims("idempotency.path is required for sqlite".to_string())
            })?;
            let store = SqliteClaimStore::new(&SqliteClaimStoreConfig::new(path, table.clone()))
                .map_err(|err| SetupError::Claims(err.to_string()))?;
            Arc::new(store)
        }
        ClaimBackend::ObjectStore => {
            let store = backend
                .claim_store(table, settings.bucket.clone())
                .map_err(|err| SetupError::Claims(err.to_string()))?;
            Arc::new(store)
        }
    };
    Ok(Some(store))
}

/// Builds the pull request source, or `None` when no token is configured.
///
/// # Errors
///
/// Returns [`SetupError::PullRequests`] when the client cannot be created.
pub fn pull_request_source(
    config: &PlanReviewConfig,
) -> Result<Option<Arc<dyn PullRequestSource>>, SetupError> {
    let gate = &config.pr_gate;
    let Some(token) = &gate.token else {
        debug!("pull request check disabled: no token");
        return Ok(None);
    };
    let source = GitHubPullRequestSource::new(GitHubConfig {
        api_base_url: gate.api_base_url.clone(),
        token: Some(token.expose().to_string()),
        timeout: gate.timeout(),
        ..GitHubConfig::default()
    })
    .map_err(|err| SetupError::PullRequests(err.to_string()))?;
    Ok(Some(Arc::new(source)))
}

/// Builds the webhook notifier.
///
/// # Errors
///
/// Returns [`SetupError::Notifier`] when no webhook is configured or the URL
/// is invalid.
pub fn notifier(config: &PlanReviewConfig) -> Result<Arc<dyn Notifier>, SetupError> {
    let Some(url) = &config.notifier.webhook_url else {
        return Err(SetupError::Notifier(format!(
            "notifier.webhook_url is not configured (set {WEBHOOK_ENV_VAR})"
        )));
    };
    let notifier = WebhookNotifier::new(url, config.notifier.timeout())
        .map_err(|err| SetupError::Notifier(err.to_string()))?;
    Ok(Arc::new(notifier))
}

/// Builds every port used by a full pipeline run.
///
/// # Errors
///
/// Returns [`SetupError`] when any backend cannot be created.
pub fn pipeline_ports(config: &PlanReviewConfig) -> Result<PipelinePorts, SetupError> {
    let backend = object_store(config)?;
    Ok(PipelinePorts {
        store: Arc::new(backend.plan_store()),
        links: Arc::new(backend.link_signer()),
        notifier: notifier(config)?,
        claims: claim_store(config, &backend)?,
        pull_requests: pull_request_source(config)?,
        link_expiry: config.links.expiry(),
    })
}
