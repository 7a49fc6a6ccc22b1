// crates/plan-review-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Claim Store Implementation
// Description: Conditional-insert claims persisted in SQLite.
// Purpose: Grant each fingerprint exactly once across invocations.
// Dependencies: plan-review-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Claims are rows in a single table keyed by fingerprint. Inserts run in
//! their own statement; a primary-key constraint violation maps to
//! [`ClaimOutcome::AlreadyExists`] and every other `SQLite` failure, other
//! constraint violations included, to [`ClaimStoreError`]. Releasing a claim
//! deletes its row. The schema is versioned through a `store_meta` table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use plan_review_core::ClaimOutcome;
use plan_review_core::ClaimStore;
use plan_review_core::ClaimStoreError;
use plan_review_core::Fingerprint;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::ffi;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version stored in `store_meta`.
const SCHEMA_VERSION: i64 = 1;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum table name length.
const MAX_TABLE_NAME_LENGTH: usize = 255;
/// Maximum fingerprint length accepted for a claim.
pub const MAX_FINGERPRINT_LENGTH: usize = 2048;
/// Default busy timeout.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` claim store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `table` contains only `[A-Za-z0-9_.-]`.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteClaimStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Claim table name.
    pub table: String,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteClaimStoreConfig {
    /// Creates a config with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for ClaimStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Db(_) | SqliteStoreError::VersionMismatch(_) => {
                Self::Backend(error.to_string())
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed claim store.
pub struct SqliteClaimStore {
    /// Serialized connection.
    connection: Mutex<Connection>,
    /// Quoted claim table identifier.
    table: String,
}

impl SqliteClaimStore {
    /// Opens (or creates) the store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path or table is invalid, the
    /// database cannot be opened, or the schema version is unsupported.
    pub fn new(config: &SqliteClaimStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        let table = quoted_table_name(&config.table)?;
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        }
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection, &table)?;
        Ok(Self {
            connection: Mutex::new(connection),
            table,
        })
    }

    /// Returns true when `fingerprint` has been claimed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn is_claimed(&self, fingerprint: &Fingerprint) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let found: Option<i64> = guard
            .query_row(
                &format!("SELECT 1 FROM {} WHERE fingerprint = ?1", self.table),
                params![fingerprint.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(found.is_some())
    }

    /// Returns the number of stored claims.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn claim_count(&self) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), params![], |row| {
                row.get(0)
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Invalid("negative count".to_string()))
    }

    /// Locks the connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }
}

impl ClaimStore for SqliteClaimStore {
    fn insert_if_absent(&self, fingerprint: &Fingerprint) -> Result<ClaimOutcome, ClaimStoreError> {
        if fingerprint.as_str().is_empty() || fingerprint.as_str().len() > MAX_FINGERPRINT_LENGTH {
            return Err(ClaimStoreError::Invalid(format!(
                "fingerprint length must be 1..={MAX_FINGERPRINT_LENGTH}"
            )));
        }
        let guard = self.lock()?;
        let result = guard.execute(
            &format!("INSERT INTO {} (fingerprint, claimed_at) VALUES (?1, ?2)", self.table),
            params![fingerprint.as_str(), unix_millis()],
        );
        match result {
            Ok(_) => Ok(ClaimOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                debug!(fingerprint = %fingerprint, "sqlite claim already present");
                Ok(ClaimOutcome::AlreadyExists)
            }
            Err(err) => Err(ClaimStoreError::Backend(err.to_string())),
        }
    }

    fn release(&self, fingerprint: &Fingerprint) -> Result<(), ClaimStoreError> {
        let guard = self.lock()?;
        let removed = guard
            .execute(
                &format!("DELETE FROM {} WHERE fingerprint = ?1", self.table),
                params![fingerprint.as_str()],
            )
            .map_err(|err| ClaimStoreError::Backend(err.to_string()))?;
        debug!(fingerprint = %fingerprint, removed, "sqlite claim released");
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates the database path against security limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Validates a table name and returns it as a quoted identifier.
fn quoted_table_name(table: &str) -> Result<String, SqliteStoreError> {
    let valid = !table.is_empty()
        && table.len() <= MAX_TABLE_NAME_LENGTH
        && table.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'));
    if !valid {
        return Err(SqliteStoreError::Invalid(format!("invalid claim table name: {table}")));
    }
    if table.eq_ignore_ascii_case("store_meta") {
        return Err(SqliteStoreError::Invalid("claim table name is reserved".to_string()));
    }
    Ok(format!("\"{table}\""))
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteClaimStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteClaimStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(connection: &mut Connection, table: &str) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {other}"
            )));
        }
    }
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            fingerprint TEXT PRIMARY KEY NOT NULL,
            claimed_at INTEGER NOT NULL
        );"
    ))
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Returns the current unix time in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
