//! The policy decision point.
//!
//! [`PolicyEngine`] is a pure evaluator: given a policy set and the four
//! resolved snapshots, it filters applicable policies, evaluates their rules,
//! folds the verdicts, and produces an explainable [`AccessDecision`]. Time
//! is taken from the request environment, so evaluating the same inputs
//! yields the same decision.

use std::time::Instant;

use tracing::info;
use uuid::Uuid;
use verdict_expr::EvalContext;
use verdict_resolver::ResolvedAttributes;
use verdict_types::Effect;

use crate::applicability::applicable_policies;
use crate::audit::{AuditEntry, AuditLog, AuditStats};
use crate::combining::{combine_policies, evaluate_policy};
use crate::decision::{AccessDecision, EvaluationResult};
use crate::error::ConfigError;
use crate::policy::{CombiningAlgorithm, Policy};

// ============================================================================
// Config
// ============================================================================

/// Engine configuration, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How matched policies fold into the final effect.
    pub combining_algorithm: CombiningAlgorithm,
    /// Effect applied when no policy matches.
    pub default_decision: Effect,
    /// Whether to keep the in-memory audit trail.
    pub enable_audit_log: bool,
    /// Audit trail capacity.
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            combining_algorithm: CombiningAlgorithm::DenyOverrides,
            default_decision: Effect::Deny,
            enable_audit_log: true,
            audit_capacity: 1000,
        }
    }
}

impl EngineConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.enable_audit_log && self.audit_capacity == 0 {
            return Err(ConfigError::ZeroAuditCapacity);
        }
        Ok(self)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Stateless policy evaluator with an optional audit trail.
#[derive(Debug)]
pub struct PolicyEngine {
    config: EngineConfig,
    audit: Option<AuditLog>,
}

impl PolicyEngine {
    /// Creates an engine, rejecting invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let config = config.validate()?;
        let audit = config
            .enable_audit_log
            .then(|| AuditLog::new(config.audit_capacity));
        Ok(Self { config, audit })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates one request against a policy set.
    ///
    /// `cache_hit` is carried through to the decision for observability; it
    /// does not change evaluation.
    pub fn evaluate(
        &self,
        policies: &[Policy],
        resolved: &ResolvedAttributes,
        cache_hit: bool,
    ) -> AccessDecision {
        let started = Instant::now();

        let subject_map = resolved.subject.to_attributes();
        let resource_map = resolved.resource.to_attributes();
        let action_map = resolved.action.to_attributes();
        let environment_map = resolved.environment.to_attributes();
        let ctx = EvalContext::new(&subject_map, &resource_map, &action_map, &environment_map);

        let applicable = applicable_policies(policies, resolved);
        let results: Vec<EvaluationResult> = applicable
            .iter()
            .map(|policy| evaluate_policy(policy, &ctx))
            .collect();

        let pairs: Vec<(&Policy, &EvaluationResult)> =
            applicable.iter().copied().zip(results.iter()).collect();
        let verdict = combine_policies(self.config.combining_algorithm, &pairs);

        let (effect, reason) = match verdict.effect {
            Some(effect) => (effect, verdict.reason),
            None => (
                self.config.default_decision,
                format!(
                    "no policy matched; default decision '{}' applied",
                    match self.config.default_decision {
                        Effect::Permit => "permit",
                        Effect::Deny => "deny",
                    }
                ),
            ),
        };

        let mut obligations = Vec::new();
        let mut advice = Vec::new();
        for policy in &applicable {
            if verdict.determining.contains(&policy.id) {
                obligations.extend(policy.obligations.iter().cloned());
                advice.extend(policy.advice.iter().cloned());
            }
        }

        let decision = AccessDecision {
            request_id: Uuid::new_v4(),
            effect,
            reason,
            results,
            obligations,
            advice,
            audit_required: resolved.action.classification.requires_audit,
            cache_hit,
            evaluation_time: started.elapsed(),
            timestamp: resolved.environment.timestamp,
        };

        info!(
            request_id = %decision.request_id,
            subject = %resolved.subject.id,
            resource = %resolved.resource.resource_type,
            action = %resolved.action.name,
            effect = ?decision.effect,
            policies = applicable.len(),
            "access decision"
        );

        if let Some(audit) = &self.audit {
            audit.record(
                &decision,
                &resolved.subject.id,
                &resolved.resource.resource_type,
                resolved.resource.resource_id.as_deref(),
                &resolved.action.name,
            );
        }

        decision
    }

    /// Recent audit entries, newest last.
    pub fn recent_audit(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit
            .as_ref()
            .map(|log| log.recent(limit))
            .unwrap_or_default()
    }

    /// Audit entries for one subject.
    pub fn audit_for_subject(&self, subject_id: &str) -> Vec<AuditEntry> {
        self.audit
            .as_ref()
            .map(|log| log.for_subject(subject_id))
            .unwrap_or_default()
    }

    /// Aggregates over the retained audit window.
    pub fn audit_stats(&self) -> AuditStats {
        self.audit
            .as_ref()
            .map(AuditLog::stats)
            .unwrap_or_default()
    }

    /// Drops the audit trail.
    pub fn clear_audit(&self) {
        if let Some(audit) = &self.audit {
            audit.clear();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyTarget, SubjectTarget};
    use chrono::{TimeZone, Utc};
    use verdict_resolver::{
        AccountStatus, Environment, RequestContext, Resource, Subject, actions,
    };

    fn resolved(action: &str) -> ResolvedAttributes {
        // Wednesday 10:00 UTC.
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap();
        ResolvedAttributes {
            subject: Subject {
                id: "u1".to_string(),
                display_name: "Test".to_string(),
                roles: vec!["manager".to_string()],
                role_level: 5,
                department: "finance".to_string(),
                departments: vec!["finance".to_string()],
                location: "hq".to_string(),
                clearance_level: 3,
                permissions: vec![],
                account_status: AccountStatus::Active,
            },
            resource: Resource::type_defaults("report"),
            action: actions::classify(action),
            environment: Environment::base(ts).with_context(&RequestContext::default()),
        }
    }

    fn engine() -> PolicyEngine {
        PolicyEngine::new(EngineConfig::default()).expect("config")
    }

    #[test]
    fn test_zero_audit_capacity_rejected() {
        let err = PolicyEngine::new(EngineConfig {
            audit_capacity: 0,
            ..EngineConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroAuditCapacity);
    }

    #[test]
    fn test_empty_policy_set_gets_default_deny() {
        let decision = engine().evaluate(&[], &resolved("read"), false);
        assert_eq!(decision.effect, Effect::Deny);
        assert!(decision.reason.contains("default"));
        assert!(decision.results.is_empty());
    }

    #[test]
    fn test_permit_flows_through() {
        let policy = Policy::new("managers-read", "Managers read reports")
            .with_target(PolicyTarget {
                subjects: SubjectTarget {
                    roles: vec!["manager".to_string()],
                    ..SubjectTarget::default()
                },
                ..PolicyTarget::default()
            })
            .with_rule("allow", "hasRole('manager')", Effect::Permit);

        let decision = engine().evaluate(&[policy], &resolved("read"), false);
        assert!(decision.is_permit());
        assert_eq!(decision.results.len(), 1);
        assert!(decision.results[0].matched);
    }

    #[test]
    fn test_obligations_come_from_determining_policies() {
        let mut permit = Policy::new("permit", "p").with_rule("ok", "", Effect::Permit);
        permit.obligations.push("log-access".to_string());

        let mut deny = Policy::new("deny", "d").with_rule("no", "", Effect::Deny);
        deny.obligations.push("alert-security".to_string());

        let decision = engine().evaluate(&[permit, deny], &resolved("read"), false);
        assert_eq!(decision.effect, Effect::Deny);
        assert_eq!(decision.obligations, vec!["alert-security".to_string()]);
    }

    #[test]
    fn test_audit_required_follows_action_classification() {
        let decision = engine().evaluate(&[], &resolved("delete"), false);
        assert!(decision.audit_required);
        let decision = engine().evaluate(&[], &resolved("read"), false);
        assert!(!decision.audit_required);
    }

    #[test]
    fn test_audit_trail_records_evaluations() {
        let engine = engine();
        engine.evaluate(&[], &resolved("read"), false);
        engine.evaluate(&[], &resolved("delete"), false);

        let stats = engine.audit_stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.denies, 2);
        assert_eq!(engine.audit_for_subject("u1").len(), 2);
    }

    #[test]
    fn test_audit_disabled_is_inert() {
        let engine = PolicyEngine::new(EngineConfig {
            enable_audit_log: false,
            ..EngineConfig::default()
        })
        .expect("config");
        engine.evaluate(&[], &resolved("read"), false);
        assert_eq!(engine.audit_stats(), AuditStats::default());
        assert!(engine.recent_audit(10).is_empty());
    }

    #[test]
    fn test_decision_timestamp_is_request_time() {
        let resolved = resolved("read");
        let decision = engine().evaluate(&[], &resolved, false);
        assert_eq!(decision.timestamp, resolved.environment.timestamp);
    }
}
