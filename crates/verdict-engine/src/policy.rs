//! Policy definitions.
//!
//! Policies are data, typically loaded from JSON authored in an admin tool.
//! Serde names follow the wire format (camelCase). A target block with empty
//! lists is unconstrained; applicability is checked in [`crate::applicability`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use verdict_types::{DataClassification, Effect};

use crate::error::ConfigError;

// ============================================================================
// Combining algorithms
// ============================================================================

/// How multiple rule or policy verdicts fold into one effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningAlgorithm {
    /// Any deny wins; permit only if at least one permit and no deny.
    #[default]
    DenyOverrides,
    /// Any permit wins; deny only if at least one deny and no permit.
    PermitOverrides,
    /// The first matching verdict in order decides.
    FirstApplicable,
    /// The matching policy with the highest `priority` decides (cross-policy
    /// combining only; falls back to deny-overrides within a tie).
    PriorityBased,
}

impl CombiningAlgorithm {
    /// Kebab-case name, as used in config and the wire format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DenyOverrides => "deny-overrides",
            Self::PermitOverrides => "permit-overrides",
            Self::FirstApplicable => "first-applicable",
            Self::PriorityBased => "priority-based",
        }
    }
}

impl FromStr for CombiningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deny-overrides" => Ok(Self::DenyOverrides),
            "permit-overrides" => Ok(Self::PermitOverrides),
            "first-applicable" => Ok(Self::FirstApplicable),
            "priority-based" => Ok(Self::PriorityBased),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

// ============================================================================
// Targets
// ============================================================================

/// Subject-side applicability constraints.
///
/// Values within one list are OR-ed; a subject matches the block when it
/// satisfies every non-empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectTarget {
    /// Any of these role names.
    pub roles: Vec<String>,
    /// Any of these departments (primary or secondary).
    pub departments: Vec<String>,
    /// Any of these locations.
    pub locations: Vec<String>,
    /// Any of these permissions.
    pub permissions: Vec<String>,
}

/// Resource-side applicability constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceTarget {
    /// Any of these resource types.
    pub types: Vec<String>,
    /// Any of these instance ids.
    pub ids: Vec<String>,
    /// Any of these classifications.
    pub classifications: Vec<DataClassification>,
}

/// Action-side applicability constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionTarget {
    /// Any of these action names.
    pub names: Vec<String>,
    /// Any of these action categories (kebab-case names).
    pub categories: Vec<String>,
}

/// Clock-time window, start inclusive, end exclusive.
///
/// `start_hour > end_hour` denotes a window that wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    /// First hour inside the window (0-23).
    pub start_hour: u8,
    /// First hour outside the window (0-23).
    pub end_hour: u8,
}

impl TimeWindow {
    /// Whether `hour` falls inside the window.
    pub fn contains(self, hour: u8) -> bool {
        if self.start_hour <= self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Day of week for environment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Converts from chrono's weekday.
    pub fn from_weekday(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// Environment-side applicability constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentTarget {
    /// The request hour must fall inside this window.
    pub time_window: Option<TimeWindow>,
    /// The request day must be one of these.
    pub days_of_week: Vec<DayOfWeek>,
    /// The request IP must start with one of these prefixes. A request with
    /// no IP fails a non-empty prefix list.
    pub ip_prefixes: Vec<String>,
}

/// Full applicability target: the four blocks are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyTarget {
    /// Subject constraints.
    pub subjects: SubjectTarget,
    /// Resource constraints.
    pub resources: ResourceTarget,
    /// Action constraints.
    pub actions: ActionTarget,
    /// Environment constraints.
    pub environment: EnvironmentTarget,
}

// ============================================================================
// Rules and policies
// ============================================================================

/// A single rule: a condition expression guarding an effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// Rule name, unique within its policy.
    pub name: String,
    /// Condition expression source; empty means always-matching.
    #[serde(default)]
    pub condition: String,
    /// Effect when the condition matches.
    pub effect: Effect,
}

fn default_enabled() -> bool {
    true
}

/// A policy: target, rules, and a rule-combining algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Stable policy id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Disabled policies never apply.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Priority for priority-based combining; higher wins.
    #[serde(default)]
    pub priority: i32,
    /// Start of the validity window, inclusive.
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    /// End of the validity window, exclusive.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Applicability target.
    #[serde(default)]
    pub target: PolicyTarget,
    /// Rules, evaluated in order under `rule_combining`.
    pub rules: Vec<PolicyRule>,
    /// How this policy's rule verdicts fold into one effect.
    #[serde(default)]
    pub rule_combining: CombiningAlgorithm,
    /// Obligations attached to a decision this policy determines.
    #[serde(default)]
    pub obligations: Vec<String>,
    /// Advice attached to a decision this policy determines.
    #[serde(default)]
    pub advice: Vec<String>,
}

impl Policy {
    /// Builder-style constructor with the common defaults.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            priority: 0,
            valid_from: None,
            valid_until: None,
            target: PolicyTarget::default(),
            rules: Vec::new(),
            rule_combining: CombiningAlgorithm::default(),
            obligations: Vec::new(),
            advice: Vec::new(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the target.
    #[must_use]
    pub fn with_target(mut self, target: PolicyTarget) -> Self {
        self.target = target;
        self
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(
        mut self,
        name: impl Into<String>,
        condition: impl Into<String>,
        effect: Effect,
    ) -> Self {
        self.rules.push(PolicyRule {
            name: name.into(),
            condition: condition.into(),
            effect,
        });
        self
    }

    /// Sets the rule-combining algorithm.
    #[must_use]
    pub fn with_rule_combining(mut self, algorithm: CombiningAlgorithm) -> Self {
        self.rule_combining = algorithm;
        self
    }

    /// Sets the validity window.
    #[must_use]
    pub fn with_validity(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }
}

// ============================================================================
// Load validation
// ============================================================================

/// Validates a policy set at load time.
///
/// Structural defects (duplicate ids, inverted validity windows) are rejected
/// here so they never reach the request path. Rule condition text is NOT
/// validated here; a bad condition degrades to a non-match at evaluation.
pub fn validate_policies(policies: &[Policy]) -> Result<(), crate::error::PolicyLoadError> {
    let mut seen = std::collections::HashSet::new();
    for policy in policies {
        if !seen.insert(policy.id.as_str()) {
            return Err(crate::error::PolicyLoadError::DuplicateId(policy.id.clone()));
        }
        if let (Some(from), Some(until)) = (policy.valid_from, policy.valid_until) {
            if from >= until {
                return Err(crate::error::PolicyLoadError::InvertedValidity(
                    policy.id.clone(),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("deny-overrides", CombiningAlgorithm::DenyOverrides)]
    #[test_case("permit-overrides", CombiningAlgorithm::PermitOverrides)]
    #[test_case("first-applicable", CombiningAlgorithm::FirstApplicable)]
    #[test_case("priority-based", CombiningAlgorithm::PriorityBased)]
    fn test_algorithm_parse(name: &str, expected: CombiningAlgorithm) {
        assert_eq!(name.parse::<CombiningAlgorithm>().unwrap(), expected);
        assert_eq!(expected.as_str(), name);
    }

    #[test]
    fn test_algorithm_parse_rejects_unknown() {
        let err = "consensus".parse::<CombiningAlgorithm>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownAlgorithm("consensus".to_string()));
    }

    #[test]
    fn test_time_window_wraps_midnight() {
        let night = TimeWindow {
            start_hour: 22,
            end_hour: 6,
        };
        assert!(night.contains(23));
        assert!(night.contains(2));
        assert!(!night.contains(12));

        let day = TimeWindow {
            start_hour: 9,
            end_hour: 17,
        };
        assert!(day.contains(9));
        assert!(!day.contains(17));
    }

    #[test]
    fn test_policy_json_defaults() {
        let json = r#"{
            "id": "p1",
            "name": "Baseline",
            "rules": [
                { "name": "allow-read", "condition": "actionType('read')", "effect": "permit" }
            ]
        }"#;
        let policy: Policy = serde_json::from_str(json).expect("parse");
        assert!(policy.enabled);
        assert_eq!(policy.priority, 0);
        assert_eq!(policy.rule_combining, CombiningAlgorithm::DenyOverrides);
        assert!(policy.target.subjects.roles.is_empty());
        assert_eq!(policy.rules[0].effect, Effect::Permit);
    }

    #[test]
    fn test_policy_json_camel_case_fields() {
        let json = r#"{
            "id": "p2",
            "name": "Scoped",
            "priority": 10,
            "validFrom": "2026-01-01T00:00:00Z",
            "validUntil": "2027-01-01T00:00:00Z",
            "ruleCombining": "first-applicable",
            "target": {
                "subjects": { "roles": ["manager"] },
                "environment": { "timeWindow": { "startHour": 9, "endHour": 17 } }
            },
            "rules": [ { "name": "r", "effect": "deny" } ]
        }"#;
        let policy: Policy = serde_json::from_str(json).expect("parse");
        assert_eq!(policy.priority, 10);
        assert_eq!(policy.rule_combining, CombiningAlgorithm::FirstApplicable);
        assert_eq!(policy.target.subjects.roles, vec!["manager".to_string()]);
        assert_eq!(
            policy.target.environment.time_window,
            Some(TimeWindow {
                start_hour: 9,
                end_hour: 17
            })
        );
        // Empty condition defaults to always-matching.
        assert!(policy.rules[0].condition.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let policies = vec![Policy::new("p1", "a"), Policy::new("p1", "b")];
        let err = validate_policies(&policies).unwrap_err();
        assert_eq!(
            err,
            crate::error::PolicyLoadError::DuplicateId("p1".to_string())
        );
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let until = Utc::now();
        let from = until + chrono::Duration::days(1);
        let policies = vec![Policy::new("p1", "a").with_validity(Some(from), Some(until))];
        assert!(matches!(
            validate_policies(&policies),
            Err(crate::error::PolicyLoadError::InvertedValidity(_))
        ));
    }
}
