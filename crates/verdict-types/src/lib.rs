//! # verdict-types: Core types for Verdict
//!
//! Shared leaf types used across the Verdict ABAC decision engine:
//! - Decision effects ([`Effect`])
//! - Attribute values ([`AttributeValue`], [`AttributeMap`])
//! - Data classification ([`DataClassification`])
//! - Action classification ([`ActionCategory`], [`RiskLevel`])
//! - Environment trust ([`TrustLevel`])
//!
//! Attribute values are deliberately a small, closed set: policies are
//! authored as data, so every value that can appear in an attribute map or a
//! condition literal must round-trip through serde without surprises.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

// ============================================================================
// Effect
// ============================================================================

/// The outcome of an access decision: permit or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Grant access.
    Permit,
    /// Deny access.
    Deny,
}

impl Default for Effect {
    /// Defaults to `Deny` (safe default: deny unless explicitly permitted).
    fn default() -> Self {
        Self::Deny
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permit => write!(f, "permit"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

// ============================================================================
// AttributeValue
// ============================================================================

/// A flat attribute map for one category (subject, resource, action, environment).
pub type AttributeMap = HashMap<String, AttributeValue>;

/// A single attribute value.
///
/// Values form a closed set so condition evaluation stays total: every
/// comparison either produces a result or is reported as a type mismatch by
/// the evaluator, never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Absent or unknown value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer quantity (levels, counts, hours).
    Int(i64),
    /// Floating-point quantity (scores, monetary values flattened for comparison).
    Float(f64),
    /// Text value (names, classifications, states).
    Str(String),
    /// Homogeneous or mixed list (role names, permission grants).
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Returns the truthiness of this value.
    ///
    /// Only `Bool(true)` is truthy; everything else (including non-empty
    /// strings and non-zero numbers) is falsy. Conditions must produce real
    /// booleans, not rely on implicit coercion.
    pub fn is_truthy(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    /// Returns the string form if this is a `Str` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric form of this value, coercing `Int` to `f64`.
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Structural equality with numeric coercion (`Int(3) == Float(3.0)`).
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            },
        }
    }

    /// Ordering for relational comparisons.
    ///
    /// Numbers compare numerically (with `Int`/`Float` coercion), strings
    /// lexicographically. Everything else is unordered.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_number()?;
                let b = other.as_number()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Whether this list value contains an element loosely equal to `needle`.
    ///
    /// Non-list values contain nothing.
    pub fn contains(&self, needle: &Self) -> bool {
        match self {
            Self::List(items) => items.iter().any(|v| v.loosely_equals(needle)),
            _ => false,
        }
    }

    /// Short type name used in evaluator diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Decimal> for AttributeValue {
    /// Flattens a decimal to `Float` for comparison in condition expressions.
    fn from(v: Decimal) -> Self {
        Self::Float(v.to_f64().unwrap_or(f64::MAX))
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// ============================================================================
// Data Classification
// ============================================================================

/// Sensitivity classification of a resource.
///
/// Ordered from least to most sensitive; relational comparisons on the
/// classification use this ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum DataClassification {
    /// Freely shareable data.
    Public,
    /// Default classification for organization-internal data.
    #[default]
    Internal,
    /// Data restricted to specific departments or roles.
    Confidential,
    /// Data requiring explicit grants (financial records, personnel files).
    Restricted,
}

impl DataClassification {
    /// Lowercase name as it appears in attribute maps and policy text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Confidential => "confidential",
            Self::Restricted => "restricted",
        }
    }
}

impl fmt::Display for DataClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Action Classification
// ============================================================================

/// Coarse category of an action, derived from the static classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ActionCategory {
    /// Read-only access (read, view, list, search).
    Access,
    /// State-changing operations (create, update, modify).
    Modification,
    /// Irreversible removal (delete).
    Destruction,
    /// System-level operations (purge, configure, disable).
    Administration,
    /// Workflow sign-off (approve, reject, authorize).
    Approval,
    /// Workflow transitions (submit, cancel).
    Workflow,
    /// Moving data across boundaries (export, import).
    DataTransfer,
    /// Anything not in the classification table.
    #[default]
    General,
}

impl ActionCategory {
    /// Kebab-case name as it appears in attribute maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Modification => "modification",
            Self::Destruction => "destruction",
            Self::Administration => "administration",
            Self::Approval => "approval",
            Self::Workflow => "workflow",
            Self::DataTransfer => "data-transfer",
            Self::General => "general",
        }
    }
}

/// Risk tier of an action or request context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Routine, reversible operations.
    Low,
    /// Operations that change state.
    #[default]
    Medium,
    /// Operations with workflow or financial consequences.
    High,
    /// Destructive or configuration-level operations.
    Critical,
}

impl RiskLevel {
    /// Lowercase name as it appears in attribute maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

// ============================================================================
// Trust Level
// ============================================================================

/// Trust level computed from the request environment (network, time, device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// High-risk context (external network, after hours, automation hints).
    Low,
    /// Mixed signals.
    Medium,
    /// Internal network during business hours.
    High,
}

impl TrustLevel {
    /// Lowercase name as it appears in attribute maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_effect_is_deny() {
        assert_eq!(Effect::default(), Effect::Deny);
    }

    #[test]
    fn test_loose_equality_numeric_coercion() {
        assert!(AttributeValue::Int(3).loosely_equals(&AttributeValue::Float(3.0)));
        assert!(!AttributeValue::Int(3).loosely_equals(&AttributeValue::Float(3.5)));
        assert!(!AttributeValue::Int(1).loosely_equals(&AttributeValue::Bool(true)));
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        assert_eq!(
            AttributeValue::Int(2).compare(&AttributeValue::Float(3.0)),
            Some(Ordering::Less)
        );
        assert_eq!(
            AttributeValue::from("abc").compare(&AttributeValue::from("abd")),
            Some(Ordering::Less)
        );
        assert_eq!(
            AttributeValue::Bool(true).compare(&AttributeValue::Int(1)),
            None
        );
    }

    #[test]
    fn test_list_contains() {
        let roles = AttributeValue::from(vec!["staff", "approver"]);
        assert!(roles.contains(&AttributeValue::from("staff")));
        assert!(!roles.contains(&AttributeValue::from("admin")));
        assert!(!AttributeValue::from("staff").contains(&AttributeValue::from("staff")));
    }

    #[test]
    fn test_only_bool_true_is_truthy() {
        assert!(AttributeValue::Bool(true).is_truthy());
        assert!(!AttributeValue::Bool(false).is_truthy());
        assert!(!AttributeValue::Int(1).is_truthy());
        assert!(!AttributeValue::from("true").is_truthy());
        assert!(!AttributeValue::Null.is_truthy());
    }

    #[test]
    fn test_classification_ordering() {
        assert!(DataClassification::Public < DataClassification::Internal);
        assert!(DataClassification::Confidential < DataClassification::Restricted);
    }

    #[test]
    fn test_risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test_case(AttributeValue::Null, "null")]
    #[test_case(AttributeValue::Bool(true), "bool")]
    #[test_case(AttributeValue::Int(1), "int")]
    #[test_case(AttributeValue::from("x"), "string")]
    fn test_type_names(value: AttributeValue, expected: &str) {
        assert_eq!(value.type_name(), expected);
    }

    #[test]
    fn test_attribute_value_serde_roundtrip() {
        let value = AttributeValue::List(vec![
            AttributeValue::from("admin"),
            AttributeValue::Int(3),
            AttributeValue::Bool(false),
        ]);
        let json = serde_json::to_string(&value).expect("serialize value");
        let back: AttributeValue = serde_json::from_str(&json).expect("deserialize value");
        assert!(value.loosely_equals(&back));
    }

    #[test]
    fn test_decimal_flattens_to_float() {
        let v = AttributeValue::from(Decimal::new(12_550, 2)); // 125.50
        assert!(v.loosely_equals(&AttributeValue::Float(125.5)));
    }
}
