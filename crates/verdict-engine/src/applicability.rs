//! Policy applicability filtering.
//!
//! Before any rule runs, each policy is checked against the resolved
//! snapshots: enabled flag, validity window, then the four target blocks.
//! Values inside one target list are OR-ed; the blocks are AND-ed. "Now" is
//! the request's environment timestamp, so a decision is reproducible from
//! its inputs.

use chrono::{Datelike, Timelike};
use verdict_resolver::ResolvedAttributes;

use crate::policy::{DayOfWeek, Policy};

/// Whether `policy` applies to the request described by `resolved`.
pub fn is_applicable(policy: &Policy, resolved: &ResolvedAttributes) -> bool {
    if !policy.enabled {
        return false;
    }

    let now = resolved.environment.timestamp;
    if policy.valid_from.is_some_and(|from| now < from) {
        return false;
    }
    // validUntil is exclusive: a policy is already out of force at its bound.
    if policy.valid_until.is_some_and(|until| now >= until) {
        return false;
    }

    subject_matches(policy, resolved)
        && resource_matches(policy, resolved)
        && action_matches(policy, resolved)
        && environment_matches(policy, resolved)
}

/// Filters and orders the applicable policies.
///
/// The sort is stable and by priority descending, so equal-priority policies
/// keep their load order for first-applicable combining.
pub fn applicable_policies<'a>(
    policies: &'a [Policy],
    resolved: &ResolvedAttributes,
) -> Vec<&'a Policy> {
    let mut applicable: Vec<&Policy> = policies
        .iter()
        .filter(|policy| is_applicable(policy, resolved))
        .collect();
    applicable.sort_by_key(|policy| std::cmp::Reverse(policy.priority));
    applicable
}

fn any_or_empty<T: PartialEq>(constraint: &[T], test: impl Fn(&T) -> bool) -> bool {
    constraint.is_empty() || constraint.iter().any(test)
}

fn subject_matches(policy: &Policy, resolved: &ResolvedAttributes) -> bool {
    let target = &policy.target.subjects;
    let subject = &resolved.subject;

    any_or_empty(&target.roles, |role| subject.roles.contains(role))
        && any_or_empty(&target.departments, |dept| {
            subject.department == *dept || subject.departments.contains(dept)
        })
        && any_or_empty(&target.locations, |loc| subject.location == *loc)
        && any_or_empty(&target.permissions, |perm| {
            subject.permissions.contains(perm)
        })
}

fn resource_matches(policy: &Policy, resolved: &ResolvedAttributes) -> bool {
    let target = &policy.target.resources;
    let resource = &resolved.resource;

    any_or_empty(&target.types, |t| resource.resource_type == *t)
        && any_or_empty(&target.ids, |id| {
            resource.resource_id.as_deref() == Some(id.as_str())
        })
        && any_or_empty(&target.classifications, |c| {
            resource.data_classification == *c
        })
}

fn action_matches(policy: &Policy, resolved: &ResolvedAttributes) -> bool {
    let target = &policy.target.actions;
    let action = &resolved.action;

    any_or_empty(&target.names, |name| action.name == *name)
        && any_or_empty(&target.categories, |category| {
            action.classification.category.as_str() == category
        })
}

fn environment_matches(policy: &Policy, resolved: &ResolvedAttributes) -> bool {
    let target = &policy.target.environment;
    let environment = &resolved.environment;
    let now = environment.timestamp;

    if let Some(window) = target.time_window {
        if !window.contains(now.hour() as u8) {
            return false;
        }
    }

    if !target.days_of_week.is_empty() {
        let today = DayOfWeek::from_weekday(now.weekday());
        if !target.days_of_week.contains(&today) {
            return false;
        }
    }

    if !target.ip_prefixes.is_empty() {
        // No IP on the request cannot satisfy an IP constraint.
        let Some(ip) = environment.ip_address.as_deref() else {
            return false;
        };
        if !target.ip_prefixes.iter().any(|prefix| ip.starts_with(prefix)) {
            return false;
        }
    }

    true
}

// ============================================================================
// Tests
// ============================================================================
