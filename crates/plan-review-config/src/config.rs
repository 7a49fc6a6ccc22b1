// crates/plan-review-config/src/config.rs
// ============================================================================
// Module: Plan Review Configuration
// Description: Configuration loading, environment overrides and validation.
// Purpose: Provide strict, fail-closed config parsing with safe defaults.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from `plan-review.toml` (or an explicit path) and
//! then overridden by the recognised environment options. Override lookup is
//! injected as a closure so the full resolution path is testable without
//! touching the process environment. The source-control token is accepted only
//! from the environment and is redacted from debug output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Limits and Defaults
// ============================================================================

/// Default config file name.
const DEFAULT_CONFIG_NAME: &str = "plan-review.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PLAN_REVIEW_CONFIG";
/// Environment variable holding the chat webhook URL.
pub const WEBHOOK_ENV_VAR: &str = "SLACK_WEBHOOK_URL";
/// Environment variable holding the link expiry in seconds.
pub const LINK_TTL_ENV_VAR: &str = "PRESIGN_TTL_SECONDS";
/// Environment variable naming the idempotency table.
pub const IDEMPOTENCY_TABLE_ENV_VAR: &str = "IDEMPOTENCY_TABLE";
/// Environment variable holding the source-control access token.
pub const GITHUB_TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default link expiry in seconds.
const DEFAULT_LINK_EXPIRY_SECONDS: u64 = 3600;
/// Longest link expiry accepted by presigned object-store URLs.
pub const MAX_LINK_EXPIRY_SECONDS: u64 = 604_800;
/// Default timeout for outbound HTTP calls.
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5_000;
/// Maximum timeout for outbound HTTP calls.
const MAX_HTTP_TIMEOUT_MS: u64 = 60_000;
/// Maximum idempotency table name length.
const MAX_TABLE_NAME_LENGTH: usize = 255;
/// Default source-control API base URL.
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

// ============================================================================
// SECTION: Root
// ============================================================================

/// Plan review configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanReviewConfig {
    /// Object-store client settings.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Time-limited link settings.
    #[serde(default)]
    pub links: LinksConfig,
    /// Idempotency guard settings.
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    /// Chat notifier settings.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Pull request gate settings.
    #[serde(default)]
    pub pr_gate: PrGateConfig,
}

impl PlanReviewConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Loads configuration resolving paths and overrides through `lookup`.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// `plan-review.toml` when it exists, else built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed or
    /// validated.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match resolve_path(path, &lookup)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the document is malformed.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads and parses a config file.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Applies the recognised environment options.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override cannot be parsed.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = read(WEBHOOK_ENV_VAR) {
            self.notifier.webhook_url = Some(url);
        }
        if let Some(ttl) = read(LINK_TTL_ENV_VAR) {
            self.links.expiry_seconds = ttl.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{LINK_TTL_ENV_VAR} must be an integer"))
            })?;
        }
        if let Some(table) = read(IDEMPOTENCY_TABLE_ENV_VAR) {
            self.idempotency.table = Some(table);
        }
        if let Some(token) = read(GITHUB_TOKEN_ENV_VAR) {
            self.pr_gate.token = Some(AccessToken::new(token));
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.object_store.validate()?;
        self.links.validate()?;
        self.idempotency.validate()?;
        self.notifier.validate()?;
        self.pr_gate.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Object Store
// ============================================================================

/// S3-compatible object-store client settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStoreConfig {
    /// Optional region (defaults to environment).
    #[serde(default)]
    pub region: Option<String>,
    /// Optional endpoint (S3-compatible).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Force path-style addressing (S3-compatible).
    #[serde(default)]
    pub force_path_style: bool,
    /// Allow non-TLS endpoints (explicit opt-in).
    #[serde(default)]
    pub allow_http: bool,
}

impl ObjectStoreConfig {
    /// Validates object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when object-store settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Invalid("object_store.region must be non-empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            validate_http_url("object_store.endpoint", endpoint, self.allow_http)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Links
// ============================================================================

/// Time-limited link settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    /// Link lifetime in seconds.
    #[serde(default = "default_link_expiry_seconds")]
    pub expiry_seconds: u64,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: DEFAULT_LINK_EXPIRY_SECONDS,
        }
    }
}

impl LinksConfig {
    /// Returns the link lifetime.
    #[must_use]
    pub const fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_seconds)
    }

    /// Validates link settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the expiry is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1 ..= MAX_LINK_EXPIRY_SECONDS).contains(&self.expiry_seconds) {
            return Err(ConfigError::Invalid(format!(
                "links.expiry_seconds must be between 1 and {MAX_LINK_EXPIRY_SECONDS}"
            )));
        }
        Ok(())
    }
}

/// Default link expiry.
const fn default_link_expiry_seconds() -> u64 {
    DEFAULT_LINK_EXPIRY_SECONDS
}

// ============================================================================
// SECTION: Idempotency
// ============================================================================

/// Claim store backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimBackend {
    /// Transactional `SQLite` table.
    #[default]
    Sqlite,
    /// Conditional writes into an object-store bucket.
    ObjectStore,
}

/// Idempotency guard settings.
///
/// # Invariants
/// - The guard is disabled when `table` is `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdempotencyConfig {
    /// Table name; `None` disables the guard.
    #[serde(default)]
    pub table: Option<String>,
    /// Backend selection.
    #[serde(default)]
    pub backend: ClaimBackend,
    /// Database path for the `SQLite` backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Bucket for the object-store backend (defaults to the artifact bucket).
    #[serde(default)]
    pub bucket: Option<String>,
}

impl IdempotencyConfig {
    /// Returns true when the guard is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.table.is_some()
    }

    /// Validates idempotency settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the table name or backend settings are
    /// invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        validate_table_name(table)?;
        match self.backend {
            ClaimBackend::Sqlite => {
                let Some(path) = &self.path else {
                    return Err(ConfigError::Invalid(
                        "idempotency.path is required for the sqlite backend".to_string(),
                    ));
                };
                if path.as_os_str().is_empty()
                    || path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH
                {
                    return Err(ConfigError::Invalid("idempotency.path is invalid".to_string()));
                }
            }
            ClaimBackend::ObjectStore => {
                if let Some(bucket) = &self.bucket
                    && bucket.trim().is_empty()
                {
                    return Err(ConfigError::Invalid(
                        "idempotency.bucket must be non-empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validates a claim table name.
fn validate_table_name(table: &str) -> Result<(), ConfigError> {
    if table.is_empty() || table.len() > MAX_TABLE_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "idempotency.table must be 1..={MAX_TABLE_NAME_LENGTH} characters"
        )));
    }
    let valid = table
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if !valid {
        return Err(ConfigError::Invalid(
            "idempotency.table may only contain [A-Za-z0-9_.-]".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Chat notifier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierConfig {
    /// Incoming webhook URL; required to deliver notifications.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Delivery timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl NotifierConfig {
    /// Returns the delivery timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates notifier settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the URL or timeout is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("notifier.timeout_ms", self.timeout_ms)?;
        if let Some(url) = &self.webhook_url {
            validate_http_url("notifier.webhook_url", url, true)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: PR Gate
// ============================================================================

/// Source-control access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a token value.
    #[must_use]
    pub const fn new(value: String) -> Self {
        Self(value)
    }

    /// Returns the raw token for request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Pull request gate settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrGateConfig {
    /// Source-control API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Lookup timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Access token; read from the environment only.
    #[serde(skip)]
    pub token: Option<AccessToken>,
}

impl Default for PrGateConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            token: None,
        }
    }
}

impl PrGateConfig {
    /// Returns the lookup timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns true when a token enables the live check.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Validates gate settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the base URL or timeout is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout("pr_gate.timeout_ms", self.timeout_ms)?;
        validate_http_url("pr_gate.api_base_url", &self.api_base_url, true)
    }
}

/// Default API base URL.
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

/// Default HTTP timeout.
const fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; `None` means built-in defaults.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<Option<PathBuf>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR).filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates an HTTP(S) URL.
fn validate_http_url(field: &str, value: &str, allow_http: bool) -> Result<(), ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        "http" => Err(ConfigError::Invalid(format!("{field} uses http:// without allow_http"))),
        other => Err(ConfigError::Invalid(format!("{field} has unsupported scheme {other}"))),
    }
}

/// Validates an outbound timeout.
fn validate_timeout(field: &str, timeout_ms: u64) -> Result<(), ConfigError> {
    if !(1 ..= MAX_HTTP_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_HTTP_TIMEOUT_MS}"
        )));
    }
    Ok(())
}
