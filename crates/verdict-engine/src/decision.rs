//! Decision result types.
//!
//! An [`AccessDecision`] is the full, explainable output of one evaluation:
//! the final effect, a human-readable reason, and the per-policy and per-rule
//! trail that produced it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verdict_types::Effect;

/// Outcome of one rule inside one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    /// Rule name.
    pub name: String,
    /// The rule's declared effect.
    pub effect: Effect,
    /// Whether the condition matched.
    pub matched: bool,
    /// Present when the condition errored; the rule counted as a non-match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Outcome of one policy's evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Policy id.
    pub policy_id: String,
    /// The effect this policy's rules combined to.
    pub effect: Effect,
    /// Whether any rule matched; an unmatched policy contributes nothing.
    pub matched: bool,
    /// Why the policy produced this outcome.
    pub reason: String,
    /// Per-rule trail.
    pub rule_results: Vec<RuleResult>,
    /// Time spent in this policy.
    pub duration: Duration,
    /// Set when the policy is defective: it had rules but every one errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The final decision for one access request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    /// Unique id for this evaluation, for audit correlation.
    pub request_id: Uuid,
    /// Final effect.
    pub effect: Effect,
    /// Human-readable explanation of the final effect.
    pub reason: String,
    /// Per-policy trail, in evaluation order.
    pub results: Vec<EvaluationResult>,
    /// Obligations from policies that agreed with the final effect.
    pub obligations: Vec<String>,
    /// Advice from policies that agreed with the final effect.
    pub advice: Vec<String>,
    /// Whether the host must write an audit record for this access.
    pub audit_required: bool,
    /// Whether the policy set came from the policy cache.
    pub cache_hit: bool,
    /// Wall time spent evaluating.
    pub evaluation_time: Duration,
    /// When the decision was made (the request timestamp).
    pub timestamp: DateTime<Utc>,
}

impl AccessDecision {
    /// Whether access was granted.
    pub fn is_permit(&self) -> bool {
        self.effect == Effect::Permit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_camel_case() {
        let decision = AccessDecision {
            request_id: Uuid::nil(),
            effect: Effect::Deny,
            reason: "no applicable policies".to_string(),
            results: vec![],
            obligations: vec![],
            advice: vec![],
            audit_required: false,
            cache_hit: false,
            evaluation_time: Duration::from_micros(42),
            timestamp: DateTime::<Utc>::MIN_UTC,
        };
        let json = serde_json::to_value(&decision).expect("serialize");
        assert_eq!(json["effect"], "deny");
        assert!(json.get("auditRequired").is_some());
        assert!(json.get("requestId").is_some());
    }

    #[test]
    fn test_rule_diagnostic_omitted_when_clean() {
        let result = RuleResult {
            name: "r".to_string(),
            effect: Effect::Permit,
            matched: true,
            diagnostic: None,
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("diagnostic").is_none());
    }
}
