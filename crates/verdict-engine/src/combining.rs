//! Rule and policy combining.
//!
//! Two layers of folding: rules within one policy combine under the policy's
//! own algorithm, and matched policies combine under the engine's algorithm.
//! A policy whose rules all fail to evaluate is marked defective and counts
//! as unmatched, so one bad policy cannot veto or grant anything.

use std::time::Instant;

use tracing::{debug, warn};
use verdict_expr::EvalContext;
use verdict_types::Effect;

use crate::decision::{EvaluationResult, RuleResult};
use crate::policy::{CombiningAlgorithm, Policy};

// ============================================================================
// Rule combining
// ============================================================================

/// Evaluates one policy's rules against the request and folds their verdicts.
pub fn evaluate_policy(policy: &Policy, ctx: &EvalContext<'_>) -> EvaluationResult {
    let started = Instant::now();

    let mut rule_results = Vec::with_capacity(policy.rules.len());
    for rule in &policy.rules {
        let (matched, diagnostic) = if rule.condition.trim().is_empty() {
            (true, None)
        } else {
            let outcome = verdict_expr::evaluate(&rule.condition, ctx);
            (outcome.matched, outcome.diagnostic)
        };
        if let Some(diag) = &diagnostic {
            debug!(policy = %policy.id, rule = %rule.name, %diag, "rule condition errored");
        }
        rule_results.push(RuleResult {
            name: rule.name.clone(),
            effect: rule.effect,
            matched,
            diagnostic,
        });
    }

    let all_errored =
        !rule_results.is_empty() && rule_results.iter().all(|r| r.diagnostic.is_some());
    if all_errored {
        warn!(policy = %policy.id, "policy is defective: every rule errored");
        return EvaluationResult {
            policy_id: policy.id.clone(),
            effect: Effect::Deny,
            matched: false,
            reason: "policy defective: no rule could be evaluated".to_string(),
            rule_results,
            duration: started.elapsed(),
            error: Some("all rules failed to evaluate".to_string()),
        };
    }

    let (effect, matched, reason) = combine_rules(policy.rule_combining, &rule_results);
    EvaluationResult {
        policy_id: policy.id.clone(),
        effect,
        matched,
        reason,
        rule_results,
        duration: started.elapsed(),
        error: None,
    }
}

/// Folds rule verdicts under an algorithm.
///
/// `PriorityBased` has no meaning inside a policy (rules carry no priority)
/// and folds as deny-overrides.
fn combine_rules(
    algorithm: CombiningAlgorithm,
    results: &[RuleResult],
) -> (Effect, bool, String) {
    let matched = |effect: Effect| {
        results
            .iter()
            .find(|r| r.matched && r.effect == effect)
            .map(|r| r.name.clone())
    };

    match algorithm {
        CombiningAlgorithm::DenyOverrides | CombiningAlgorithm::PriorityBased => {
            if let Some(rule) = matched(Effect::Deny) {
                (Effect::Deny, true, format!("rule '{rule}' denied"))
            } else if let Some(rule) = matched(Effect::Permit) {
                (Effect::Permit, true, format!("rule '{rule}' permitted"))
            } else {
                (Effect::Deny, false, "no rule matched".to_string())
            }
        }
        CombiningAlgorithm::PermitOverrides => {
            if let Some(rule) = matched(Effect::Permit) {
                (Effect::Permit, true, format!("rule '{rule}' permitted"))
            } else if let Some(rule) = matched(Effect::Deny) {
                (Effect::Deny, true, format!("rule '{rule}' denied"))
            } else {
                (Effect::Deny, false, "no rule matched".to_string())
            }
        }
        CombiningAlgorithm::FirstApplicable => match results.iter().find(|r| r.matched) {
            Some(rule) => (
                rule.effect,
                true,
                format!("first matching rule '{}' decided", rule.name),
            ),
            None => (Effect::Deny, false, "no rule matched".to_string()),
        },
    }
}

// ============================================================================
// Policy combining
// ============================================================================

/// The fold of all matched policies into a final verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedVerdict {
    /// `None` when no policy matched; the engine applies its default.
    pub effect: Option<Effect>,
    /// Why this effect was reached.
    pub reason: String,
    /// Ids of the policies that determined the effect.
    pub determining: Vec<String>,
}

/// Folds per-policy results under the engine's combining algorithm.
///
/// `pairs` must be in evaluation order (priority descending, load order
/// within a priority).
pub fn combine_policies(
    algorithm: CombiningAlgorithm,
    pairs: &[(&Policy, &EvaluationResult)],
) -> CombinedVerdict {
    let matched_with = |effect: Effect| -> Vec<String> {
        pairs
            .iter()
            .filter(|(_, r)| r.matched && r.effect == effect)
            .map(|(p, _)| p.id.clone())
            .collect()
    };

    match algorithm {
        CombiningAlgorithm::DenyOverrides => {
            let denies = matched_with(Effect::Deny);
            if !denies.is_empty() {
                return CombinedVerdict {
                    effect: Some(Effect::Deny),
                    reason: format!("denied by policy '{}'", denies[0]),
                    determining: denies,
                };
            }
            let permits = matched_with(Effect::Permit);
            if !permits.is_empty() {
                return CombinedVerdict {
                    effect: Some(Effect::Permit),
                    reason: format!("permitted by policy '{}'", permits[0]),
                    determining: permits,
                };
            }
            no_match()
        }
        CombiningAlgorithm::PermitOverrides => {
            let permits = matched_with(Effect::Permit);
            if !permits.is_empty() {
                return CombinedVerdict {
                    effect: Some(Effect::Permit),
                    reason: format!("permitted by policy '{}'", permits[0]),
                    determining: permits,
                };
            }
            let denies = matched_with(Effect::Deny);
            if !denies.is_empty() {
                return CombinedVerdict {
                    effect: Some(Effect::Deny),
                    reason: format!("denied by policy '{}'", denies[0]),
                    determining: denies,
                };
            }
            no_match()
        }
        CombiningAlgorithm::FirstApplicable => {
            match pairs.iter().find(|(_, r)| r.matched) {
                Some((policy, result)) => CombinedVerdict {
                    effect: Some(result.effect),
                    reason: format!("first applicable policy '{}' decided", policy.id),
                    determining: vec![policy.id.clone()],
                },
                None => no_match(),
            }
        }
        CombiningAlgorithm::PriorityBased => {
            // Highest explicit priority among matched policies wins; an
            // earlier policy keeps a tie.
            let mut best: Option<(&Policy, &EvaluationResult)> = None;
            for (policy, result) in pairs {
                if !result.matched {
                    continue;
                }
                if best.is_none_or(|(b, _)| policy.priority > b.priority) {
                    best = Some((policy, result));
                }
            }
            match best {
                Some((policy, result)) => CombinedVerdict {
                    effect: Some(result.effect),
                    reason: format!(
                        "policy '{}' decided at priority {}",
                        policy.id, policy.priority
                    ),
                    determining: vec![policy.id.clone()],
                },
                None => no_match(),
            }
        }
    }
}

fn no_match() -> CombinedVerdict {
    CombinedVerdict {
        effect: None,
        reason: "no policy matched".to_string(),
        determining: Vec::new(),
    }
}

// ============================================================================
// Tests
// ============================================================================
