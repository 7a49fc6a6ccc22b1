// crates/plan-review-cli/src/input.rs
// ============================================================================
// Module: CLI Input
// Description: Bounded reads of JSON stage input from a file or stdin.
// Purpose: Keep untrusted input size-limited before parsing.
// Dependencies: serde, serde_json
// ============================================================================

//! Bounded reads of JSON stage input from a file or stdin.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a stage input record.
pub const MAX_INPUT_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Input read failures.
#[derive(Debug, Error)]
pub enum InputError {
    /// File or stdin I/O failure.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    /// Input exceeds the size limit.
    #[error("input exceeds size limit ({size} > {limit} bytes)")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
    /// Input is not the expected JSON record.
    #[error("invalid input json: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
///
/// # Errors
///
/// Returns [`InputError`] when the file cannot be read or is too large.
pub fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, InputError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(InputError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    read_limited(file, max_bytes)
}

/// Reads at most `max_bytes` from `reader`, failing when more is available.
///
/// # Errors
///
/// Returns [`InputError`] when reading fails or the limit is exceeded.
pub fn read_limited<R: Read>(reader: R, max_bytes: usize) -> Result<Vec<u8>, InputError> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut bytes = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(InputError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses one JSON record from `path`, or stdin when `None`.
///
/// # Errors
///
/// Returns [`InputError`] when the input cannot be read or parsed.
pub fn read_json_input<T: DeserializeOwned>(path: Option<&Path>) -> Result<T, InputError> {
    let bytes = match path {
        Some(path) => read_bytes_with_limit(path, MAX_INPUT_BYTES)?,
        None => read_limited(std::io::stdin().lock(), MAX_INPUT_BYTES)?,
    };
    Ok(serde_json::from_slice(&bytes)?)
}
