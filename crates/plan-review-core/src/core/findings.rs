// crates/plan-review-core/src/core/findings.rs
// ============================================================================
// Module: Policy Findings
// Description: Severity-classified findings and the aggregate report.
// Purpose: Stable result model for the policy engine.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`PolicyReport`] is an ordered, immutable list of [`PolicyFinding`]
//! values with per-severity counts derived from that list.
//! Invariants:
//! - Counts always equal the number of findings of each severity.
//! - Deserialized reports are rejected when their counts disagree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// High risk.
    High,
    /// Medium risk.
    Medium,
    /// Informational.
    Info,
}

impl Severity {
    /// Returns the stable uppercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Finding
// ============================================================================

/// One detected risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFinding {
    /// Severity class.
    pub severity: Severity,
    /// Stable rule identifier (for example `SG_OPEN_INGRESS`).
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Address of the offending resource change.
    pub resource: String,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Report validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Stored counts disagree with the finding list.
    #[error("policy report counts do not match findings: {0}")]
    CountMismatch(String),
}

/// Aggregate of one plan's findings.
///
/// Serialized as `{high, medium, info, findings}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicyReport")]
pub struct PolicyReport {
    /// Number of HIGH findings.
    #[serde(rename = "high")]
    high_count: usize,
    /// Number of MEDIUM findings.
    #[serde(rename = "medium")]
    medium_count: usize,
    /// Number of INFO findings.
    #[serde(rename = "info")]
    info_count: usize,
    /// Findings in rule evaluation order.
    findings: Vec<PolicyFinding>,
}

impl PolicyReport {
    /// Builds a report, deriving counts from the findings.
    #[must_use]
    pub fn from_findings(findings: Vec<PolicyFinding>) -> Self {
        let count = |severity: Severity| {
            findings.iter().filter(|finding| finding.severity == severity).count()
        };
        Self {
            high_count: count(Severity::High),
            medium_count: count(Severity::Medium),
            info_count: count(Severity::Info),
            findings,
        }
    }

    /// Number of HIGH findings.
    #[must_use]
    pub const fn high_count(&self) -> usize {
        self.high_count
    }

    /// Number of MEDIUM findings.
    #[must_use]
    pub const fn medium_count(&self) -> usize {
        self.medium_count
    }

    /// Number of INFO findings.
    #[must_use]
    pub const fn info_count(&self) -> usize {
        self.info_count
    }

    /// Findings in rule evaluation order.
    #[must_use]
    pub fn findings(&self) -> &[PolicyFinding] {
        &self.findings
    }

    /// Returns true when no rule matched.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Wire form used to validate reports read back from storage or stage input.
#[derive(Deserialize)]
struct RawPolicyReport {
    /// Claimed HIGH count.
    high: usize,
    /// Claimed MEDIUM count.
    medium: usize,
    /// Claimed INFO count.
    info: usize,
    /// Findings.
    #[serde(default)]
    findings: Vec<PolicyFinding>,
}

impl TryFrom<RawPolicyReport> for PolicyReport {
    type Error = ReportError;

    fn try_from(raw: RawPolicyReport) -> Result<Self, Self::Error> {
        let report = Self::from_findings(raw.findings);
        if report.high_count != raw.high
            || report.medium_count != raw.medium
            || report.info_count != raw.info
        {
            return Err(ReportError::CountMismatch(format!(
                "claimed {}/{}/{}, derived {}/{}/{}",
                raw.high,
                raw.medium,
                raw.info,
                report.high_count,
                report.medium_count,
                report.info_count
            )));
        }
        Ok(report)
    }
}
