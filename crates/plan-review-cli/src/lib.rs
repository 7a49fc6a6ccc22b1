// crates/plan-review-cli/src/lib.rs
// ============================================================================
// Module: Plan Review CLI Library
// Description: Shared helpers for the plan-review command-line interface.
// Purpose: Input reading, port wiring and exit-code policy for the binary.
// Dependencies: plan-review-core, plan-review-config, backend crates
// ============================================================================

//! ## Overview
//! The binary (`src/main.rs`) parses arguments and dispatches; everything it
//! needs to turn configuration into live ports, read bounded JSON input and
//! map failures to exit codes lives here so tests can reach it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod input;
pub mod ports;

#[cfg(test)]
mod tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use plan_review_core::ErrorClass;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for input errors (`EX_USAGE`-style, not retryable).
pub const EXIT_INPUT: u8 = 2;
/// Exit code for transient errors (`EX_TEMPFAIL`, retryable).
pub const EXIT_TRANSIENT: u8 = 75;
/// Exit code for configuration or local I/O failures.
pub const EXIT_FAILURE: u8 = 1;

/// Returns the process exit code for a stage error class.
#[must_use]
pub const fn exit_code_for(class: ErrorClass) -> u8 {
    match class {
        ErrorClass::Input => EXIT_INPUT,
        ErrorClass::Transient => EXIT_TRANSIENT,
    }
}
