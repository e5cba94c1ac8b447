//! Property tests over the combining layer.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use verdict_engine::{EngineConfig, Policy, PolicyEngine};
use verdict_resolver::{
    AccountStatus, Environment, RequestContext, ResolvedAttributes, Resource, Subject, actions,
};
use verdict_types::Effect;

fn resolved() -> ResolvedAttributes {
    let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap();
    ResolvedAttributes {
        subject: Subject {
            id: "u1".to_string(),
            display_name: "Prop".to_string(),
            roles: vec!["staff".to_string()],
            role_level: 2,
            department: "ops".to_string(),
            departments: vec!["ops".to_string()],
            location: "hq".to_string(),
            clearance_level: 2,
            permissions: vec![],
            account_status: AccountStatus::Active,
        },
        resource: Resource::type_defaults("document"),
        action: actions::classify("read"),
        environment: Environment::base(ts).with_context(&RequestContext::default()),
    }
}

fn engine() -> PolicyEngine {
    PolicyEngine::new(EngineConfig {
        enable_audit_log: false,
        ..EngineConfig::default()
    })
    .expect("config")
}

/// A pool of policies with mixed effects, conditions, and priorities.
fn policy_pool() -> Vec<Policy> {
    vec![
        Policy::new("p-permit-read", "a")
            .with_priority(10)
            .with_rule("r", "actionType('read')", Effect::Permit),
        Policy::new("p-deny-staff", "b")
            .with_priority(20)
            .with_rule("r", "hasRole('staff')", Effect::Deny),
        Policy::new("p-unmatched", "c")
            .with_priority(30)
            .with_rule("r", "hasRole('admin')", Effect::Deny),
        Policy::new("p-permit-all", "d").with_rule("r", "", Effect::Permit),
        Policy::new("p-broken", "e").with_rule("r", "hasRole(", Effect::Deny),
    ]
}

proptest! {
    /// Deny-overrides is a commutative fold: any permutation of the policy
    /// set yields the same effect.
    #[test]
    fn deny_overrides_is_permutation_invariant(order in Just(policy_pool()).prop_shuffle()) {
        let engine = engine();
        let request = resolved();

        let baseline = engine.evaluate(&policy_pool(), &request, false);
        let shuffled = engine.evaluate(&order, &request, false);

        prop_assert_eq!(baseline.effect, shuffled.effect);
    }

    /// The decision is always exactly permit or deny, whatever subset of the
    /// pool is loaded.
    #[test]
    fn decision_is_total(subset in proptest::sample::subsequence(policy_pool(), 0..=5)) {
        let engine = engine();
        let decision = engine.evaluate(&subset, &resolved(), false);
        prop_assert!(matches!(decision.effect, Effect::Permit | Effect::Deny));
        prop_assert!(!decision.reason.is_empty());
    }
}
