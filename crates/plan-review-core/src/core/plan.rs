// crates/plan-review-core/src/core/plan.rs
// ============================================================================
// Module: Terraform Plan Document
// Description: Resource-change list parsed from a Terraform plan JSON.
// Purpose: Shared input model for the change summarizer and policy engine.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Only the `resource_changes` array of a plan is read. Each entry yields a
//! [`ResourceChange`] with its type, address, action set and optional planned
//! `after` state. The `after` map stays schema-less here; rules read it through
//! typed views.
//! Invariants:
//! - `resource_changes` must be present and be an array.
//! - Every change has a non-empty resource type.
//! - A missing `address` defaults to the resource type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Plan document parse failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanParseError {
    /// The bytes are not a plan document with a `resource_changes` array.
    #[error("plan json malformed: {0}")]
    Malformed(String),
    /// A resource change has an empty type.
    #[error("resource change {index} has an empty type")]
    EmptyResourceType {
        /// Position of the change in the plan.
        index: usize,
    },
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Verbs recorded in a change's action list.
///
/// # Invariants
/// - A replace is `{create, delete}`, never `update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet {
    /// The change creates the resource.
    pub create: bool,
    /// The change updates the resource in place.
    pub update: bool,
    /// The change deletes the resource.
    pub delete: bool,
}

impl ActionSet {
    /// Builds an action set from Terraform action strings.
    ///
    /// Verbs other than create/update/delete (`no-op`, `read`) are ignored.
    #[must_use]
    pub fn from_verbs<S: AsRef<str>>(verbs: &[S]) -> Self {
        let mut set = Self::default();
        for verb in verbs {
            match verb.as_ref() {
                "create" => set.create = true,
                "update" => set.update = true,
                "delete" => set.delete = true,
                _ => {}
            }
        }
        set
    }

    /// Returns true when the set is a replacement (delete + create).
    #[must_use]
    pub const fn is_replace(self) -> bool {
        self.create && self.delete
    }

    /// Returns true when no counted verb is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        !self.create && !self.update && !self.delete
    }
}

// ============================================================================
// SECTION: Resource Change
// ============================================================================

/// One entry of a plan's resource-change list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceChange {
    /// Terraform resource type (for example `aws_security_group`).
    pub resource_type: String,
    /// Resource address, unique within a plan.
    pub address: String,
    /// Counted action verbs.
    pub actions: ActionSet,
    /// Planned post-change attributes; `None` for pure deletions.
    pub after: Option<Map<String, Value>>,
}

/// Parsed Terraform plan document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDocument {
    /// Resource changes in plan order.
    pub resource_changes: Vec<ResourceChange>,
}

impl PlanDocument {
    /// Parses plan JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PlanParseError`] when `resource_changes` is missing or
    /// wrong-typed, or when an entry lacks a resource type.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PlanParseError> {
        let raw: RawPlan = serde_json::from_slice(bytes)
            .map_err(|err| PlanParseError::Malformed(err.to_string()))?;
        let mut resource_changes = Vec::with_capacity(raw.resource_changes.len());
        for (index, entry) in raw.resource_changes.into_iter().enumerate() {
            if entry.resource_type.trim().is_empty() {
                return Err(PlanParseError::EmptyResourceType {
                    index,
                });
            }
            let change = entry.change.unwrap_or_default();
            let after = match change.after {
                Some(Value::Object(map)) => Some(map),
                _ => None,
            };
            let address = entry
                .address
                .filter(|address| !address.is_empty())
                .unwrap_or_else(|| entry.resource_type.clone());
            resource_changes.push(ResourceChange {
                actions: ActionSet::from_verbs(&change.actions),
                resource_type: entry.resource_type,
                address,
                after,
            });
        }
        Ok(Self {
            resource_changes,
        })
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Raw plan document; only the fields read by the pipeline.
#[derive(Deserialize)]
struct RawPlan {
    /// Resource change entries.
    resource_changes: Vec<RawResourceChange>,
}

/// Raw resource change entry.
#[derive(Deserialize)]
struct RawResourceChange {
    /// Resource type.
    #[serde(rename = "type")]
    resource_type: String,
    /// Resource address.
    #[serde(default)]
    address: Option<String>,
    /// Change block.
    #[serde(default)]
    change: Option<RawChange>,
}

/// Raw change block.
#[derive(Deserialize, Default)]
struct RawChange {
    /// Action verbs.
    #[serde(default)]
    actions: Vec<String>,
    /// Planned post-change attributes.
    #[serde(default)]
    after: Option<Value>,
}
