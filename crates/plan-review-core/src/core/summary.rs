// crates/plan-review-core/src/core/summary.rs
// ============================================================================
// Module: Plan Change Summary
// Description: Create/update/delete counts over one plan.
// Purpose: Aggregate resource changes globally and per resource type.
// Dependencies: crate::core::{artifacts, plan}, serde
// ============================================================================

//! ## Overview
//! A [`ChangeSummary`] counts the verbs of every resource change, both
//! globally and per resource type, and keeps the ten busiest types.
//! Invariants:
//! - A replace increments both `creates` and `deletes`; it is never an update.
//! - `by_type` is sorted by total descending, ties in first-seen order, and
//!   holds at most [`MAX_TYPE_ENTRIES`] entries.
//! - Global counts cover every type, including truncated ones.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::artifacts::ObjectLocation;
use crate::core::plan::ResourceChange;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of per-type entries kept in a summary.
pub const MAX_TYPE_ENTRIES: usize = 10;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Per-type change counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTally {
    /// Resource type.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Number of creates.
    #[serde(rename = "create")]
    pub creates: u64,
    /// Number of in-place updates.
    #[serde(rename = "update")]
    pub updates: u64,
    /// Number of deletes.
    #[serde(rename = "delete")]
    pub deletes: u64,
}

impl TypeTally {
    /// Creates a tally with explicit counts.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, creates: u64, updates: u64, deletes: u64) -> Self {
        Self {
            resource_type: resource_type.into(),
            creates,
            updates,
            deletes,
        }
    }

    /// Returns the sum of all counts.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.creates.saturating_add(self.updates).saturating_add(self.deletes)
    }
}

/// Aggregate over one plan.
///
/// Serialized as `{adds, mods, dels, byType, s3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Changes whose action set contains `create`.
    #[serde(rename = "adds")]
    pub creates: u64,
    /// Changes whose action set contains `update`.
    #[serde(rename = "mods")]
    pub updates: u64,
    /// Changes whose action set contains `delete`.
    #[serde(rename = "dels")]
    pub deletes: u64,
    /// Busiest resource types.
    #[serde(rename = "byType")]
    pub by_type: Vec<TypeTally>,
    /// Plan JSON the summary was computed from.
    #[serde(rename = "s3")]
    pub source_location: ObjectLocation,
}

impl ChangeSummary {
    /// Computes the summary of a resource-change list.
    #[must_use]
    pub fn from_changes(changes: &[ResourceChange], source_location: ObjectLocation) -> Self {
        let mut creates = 0_u64;
        let mut updates = 0_u64;
        let mut deletes = 0_u64;
        let mut tallies: Vec<TypeTally> = Vec::new();
        let mut index_by_type: HashMap<&str, usize> = HashMap::new();

        for change in changes {
            if change.actions.is_empty() {
                continue;
            }
            let slot = *index_by_type.entry(change.resource_type.as_str()).or_insert_with(|| {
                tallies.push(TypeTally::new(change.resource_type.clone(), 0, 0, 0));
                tallies.len() - 1
            });
            let tally = &mut tallies[slot];
            if change.actions.create {
                creates = creates.saturating_add(1);
                tally.creates = tally.creates.saturating_add(1);
            }
            if change.actions.update {
                updates = updates.saturating_add(1);
                tally.updates = tally.updates.saturating_add(1);
            }
            if change.actions.delete {
                deletes = deletes.saturating_add(1);
                tally.deletes = tally.deletes.saturating_add(1);
            }
        }

        // Stable: equal totals keep first-seen order.
        tallies.sort_by(|left, right| right.total().cmp(&left.total()));
        tallies.truncate(MAX_TYPE_ENTRIES);

        Self {
            creates,
            updates,
            deletes,
            by_type: tallies,
            source_location,
        }
    }

    /// Returns true when the plan changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.creates == 0 && self.updates == 0 && self.deletes == 0
    }
}
