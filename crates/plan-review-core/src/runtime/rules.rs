// crates/plan-review-core/src/runtime/rules.rs
// ============================================================================
// Module: Policy Rules
// Description: Static rule table and typed views over planned resource state.
// Purpose: Map resource types to the security rules that apply to them.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each rule is a pure function over a typed view of a resource change's
//! `after` state. Views are built with lenient accessors: an attribute that is
//! missing or has the wrong type reads as absent, so a rule never fails on
//! partial input. Adding a rule means adding one [`PolicyRule`] entry to
//! [`RULES`]; the engine iterates the table and never branches on type names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::Severity;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// IPv4 all-addresses block.
const ANY_IPV4: &str = "0.0.0.0/0";
/// IPv6 all-addresses block.
const ANY_IPV6: &str = "::/0";
/// Acls that grant anonymous read access.
const PUBLIC_ACLS: [&str; 2] = ["public-read", "public-read-write"];

// ============================================================================
// SECTION: Lenient Accessors
// ============================================================================

/// Read-only view over an `after` attribute map.
#[derive(Debug, Clone, Copy)]
pub struct AfterView<'a> {
    /// Underlying attributes.
    attributes: &'a Map<String, Value>,
}

impl<'a> AfterView<'a> {
    /// Wraps an attribute map.
    #[must_use]
    pub const fn new(attributes: &'a Map<String, Value>) -> Self {
        Self {
            attributes,
        }
    }

    /// Returns a string attribute.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&'a str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Returns a boolean attribute; `"true"`/`"false"` strings are accepted.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.attributes.get(name)? {
            Value::Bool(value) => Some(*value),
            Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
            Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Returns an integer attribute; numeric strings are accepted.
    #[must_use]
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the string members of a list attribute.
    pub fn strings(&self, name: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        self.attributes
            .get(name)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Returns the object members of a list attribute as nested views.
    pub fn objects(&self, name: &str) -> impl Iterator<Item = AfterView<'a>> + use<'a> {
        self.attributes
            .get(name)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(AfterView::new)
    }

    /// Returns the attribute rendered as text, for message values.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Typed Views
// ============================================================================

/// One ingress entry of a security group or a standalone ingress rule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IngressEntry {
    /// First port of the range.
    from_port: Option<i64>,
    /// Last port of the range.
    to_port: Option<i64>,
    /// Protocol label.
    protocol: Option<String>,
    /// True when either CIDR list contains an all-addresses block.
    open_to_world: bool,
}

impl IngressEntry {
    /// Builds the entry from an ingress attribute map.
    fn read(view: &AfterView<'_>) -> Self {
        let open_to_world = view
            .strings("cidr_blocks")
            .chain(view.strings("ipv6_cidr_blocks"))
            .any(|cidr| cidr == ANY_IPV4 || cidr == ANY_IPV6);
        Self {
            from_port: view.int("from_port"),
            to_port: view.int("to_port"),
            protocol: view.text("protocol"),
            open_to_world,
        }
    }

    /// Renders the port range as `ALL`, a single port, or `from-to`.
    fn port_range(&self) -> String {
        match (self.from_port, self.to_port) {
            (None, None) => "ALL".to_string(),
            (Some(from), Some(to)) if from == to => from.to_string(),
            (from, to) => format!("{}-{}", render_port(from), render_port(to)),
        }
    }
}

/// Renders a port bound, `*` when absent.
fn render_port(port: Option<i64>) -> String {
    port.map_or_else(|| "*".to_string(), |port| port.to_string())
}

/// Collects the ingress entries a security group resource declares.
///
/// A standalone rule resource is one entry when it is an ingress rule and none
/// otherwise.
fn ingress_entries(resource_type: &str, view: &AfterView<'_>) -> Vec<IngressEntry> {
    if resource_type == "aws_security_group_rule" {
        let is_ingress = view.str("type").is_some_and(|kind| kind.eq_ignore_ascii_case("ingress"));
        return if is_ingress { vec![IngressEntry::read(view)] } else { Vec::new() };
    }
    view.objects("ingress").map(|entry| IngressEntry::read(&entry)).collect()
}

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// Rule predicate: returns one message per match.
pub type RuleCheck = fn(resource_type: &str, after: &AfterView<'_>) -> Vec<String>;

/// One entry of the static rule table.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRule {
    /// Stable rule code.
    pub code: &'static str,
    /// Severity of every finding the rule emits.
    pub severity: Severity,
    /// Resource types the rule applies to.
    pub resource_types: &'static [&'static str],
    /// Short description for rule listings.
    pub description: &'static str,
    /// Predicate over the typed view.
    pub check: RuleCheck,
}

impl PolicyRule {
    /// Returns true when the rule applies to `resource_type`.
    #[must_use]
    pub fn applies_to(&self, resource_type: &str) -> bool {
        self.resource_types.contains(&resource_type)
    }

    /// Returns the serializable listing entry for this rule.
    #[must_use]
    pub fn describe(&self) -> RuleDescription {
        RuleDescription {
            code: self.code,
            severity: self.severity,
            resource_types: self.resource_types.to_vec(),
            description: self.description,
        }
    }
}

/// Serializable rule listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDescription {
    /// Stable rule code.
    pub code: &'static str,
    /// Finding severity.
    pub severity: Severity,
    /// Resource types the rule applies to.
    pub resource_types: Vec<&'static str>,
    /// Short description.
    pub description: &'static str,
}

/// Rules in evaluation order.
pub static RULES: [PolicyRule; 5] = [
    PolicyRule {
        code: "SG_OPEN_INGRESS",
        severity: Severity::High,
        resource_types: &["aws_security_group", "aws_security_group_rule"],
        description: "ingress open to 0.0.0.0/0 or ::/0",
        check: sg_open_ingress,
    },
    PolicyRule {
        code: "S3_PUBLIC_ACL",
        severity: Severity::High,
        resource_types: &["aws_s3_bucket"],
        description: "bucket acl is public-read or public-read-write",
        check: s3_public_acl,
    },
    PolicyRule {
        code: "S3_PAB_DISABLED",
        severity: Severity::Medium,
        resource_types: &["aws_s3_bucket_public_access_block"],
        description: "any of the four public access block flags is not true",
        check: s3_pab_disabled,
    },
    PolicyRule {
        code: "RDS_PUBLIC",
        severity: Severity::High,
        resource_types: &["aws_db_instance"],
        description: "database instance is publicly accessible",
        check: rds_public,
    },
    PolicyRule {
        code: "IAM_WILDCARD",
        severity: Severity::Medium,
        resource_types: &[
            "aws_iam_policy",
            "aws_iam_role_policy",
            "aws_iam_role_policy_attachment",
        ],
        description: "policy document text contains '*'",
        check: iam_wildcard,
    },
];

/// Returns the rules that apply to `resource_type`, in table order.
pub fn rules_for(resource_type: &str) -> impl Iterator<Item = &'static PolicyRule> {
    RULES.iter().filter(move |rule| rule.applies_to(resource_type))
}

// ============================================================================
// SECTION: Rule Predicates
// ============================================================================

/// Security group ingress open to every address.
fn sg_open_ingress(resource_type: &str, after: &AfterView<'_>) -> Vec<String> {
    ingress_entries(resource_type, after)
        .into_iter()
        .filter(|entry| entry.open_to_world)
        .map(|entry| {
            format!(
                "Security group ingress open to the world: port {} proto={}",
                entry.port_range(),
                entry.protocol.as_deref().unwrap_or("*")
            )
        })
        .collect()
}

/// Bucket ACL granting public access.
fn s3_public_acl(_: &str, after: &AfterView<'_>) -> Vec<String> {
    after
        .str("acl")
        .filter(|acl| PUBLIC_ACLS.iter().any(|public| acl.eq_ignore_ascii_case(public)))
        .map(|acl| vec![format!("S3 bucket ACL is public ({acl})")])
        .unwrap_or_default()
}

/// Public access block with any flag missing or false.
fn s3_pab_disabled(_: &str, after: &AfterView<'_>) -> Vec<String> {
    let flags =
        ["block_public_acls", "block_public_policy", "ignore_public_acls", "restrict_public_buckets"];
    if flags.iter().all(|flag| after.flag(flag) == Some(true)) {
        return Vec::new();
    }
    vec!["Public access block not fully enabled".to_string()]
}

/// Database instance reachable from the internet.
fn rds_public(_: &str, after: &AfterView<'_>) -> Vec<String> {
    if after.flag("publicly_accessible") == Some(true) {
        return vec!["RDS instance publicly_accessible=true".to_string()];
    }
    Vec::new()
}

/// Policy document text containing `*` anywhere.
fn iam_wildcard(_: &str, after: &AfterView<'_>) -> Vec<String> {
    if after.str("policy").is_some_and(|policy| policy.contains('*')) {
        return vec!["IAM policy may contain wildcards".to_string()];
    }
    Vec::new()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
