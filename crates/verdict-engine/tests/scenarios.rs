//! End-to-end decision scenarios through the permission service.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use verdict_engine::{
    AccessRequest, MemoryPolicyStore, PermissionCatalog, PermissionService, Policy,
    ServiceConfig,
};
use verdict_resolver::{
    AccountStatus, AttributeResolver, IdentityRecord, MemoryStore, ResolverConfig,
    ResourceRecord, RoleRecord,
};
use verdict_types::{DataClassification, Effect};

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (id, name) in [("role-staff", "staff"), ("role-admin", "admin")] {
        store.put_role(RoleRecord {
            id: id.to_string(),
            name: name.to_string(),
            level: if name == "admin" { 9 } else { 2 },
            permissions: vec![],
            parent_id: None,
        });
    }
    for (user, role) in [("staff-user", "role-staff"), ("admin-user", "role-admin")] {
        store.put_identity(IdentityRecord {
            id: user.to_string(),
            display_name: user.to_string(),
            role_ids: vec![role.to_string()],
            department: "ops".to_string(),
            departments: vec!["ops".to_string()],
            location: "hq".to_string(),
            clearance_level: 2,
            special_permissions: vec![],
            account_status: AccountStatus::Active,
        });
    }
    store.put_resource(
        "document",
        "doc-1",
        ResourceRecord {
            data_classification: DataClassification::Restricted,
            ..ResourceRecord::default()
        },
    );
    store
}

fn restricted_deny_policy() -> Policy {
    Policy::new("protect-restricted", "Protect restricted documents")
        .with_priority(100)
        .with_rule(
            "deny-non-admins",
            "resource.dataClassification == 'restricted' && !hasRole('admin')",
            Effect::Deny,
        )
}

fn read_permit_policy() -> Policy {
    Policy::new("allow-reads", "Allow reads")
        .with_priority(50)
        .with_rule("permit-read", "actionType('read')", Effect::Permit)
}

fn service(policies: Vec<Policy>) -> PermissionService<MemoryStore, MemoryPolicyStore> {
    let resolver = AttributeResolver::new(Arc::new(seeded_store()), ResolverConfig::default());
    let policy_store = MemoryPolicyStore::new();
    policy_store.set_policies(policies);
    PermissionService::new(
        resolver,
        Arc::new(policy_store),
        PermissionCatalog::new(),
        ServiceConfig::default(),
    )
    .expect("service")
}

fn read_doc(subject: &str) -> AccessRequest {
    let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap();
    AccessRequest::new(subject, "document", "read")
        .with_resource_id("doc-1")
        .at(ts)
}

#[tokio::test]
async fn staff_denied_on_restricted_resource() {
    let service = service(vec![restricted_deny_policy(), read_permit_policy()]);
    let decision = service.evaluate_access(&read_doc("staff-user")).await;
    assert_eq!(decision.effect, Effect::Deny);
    assert!(decision.reason.contains("protect-restricted"));
}

#[tokio::test]
async fn admin_permitted_on_restricted_resource() {
    let service = service(vec![restricted_deny_policy(), read_permit_policy()]);
    let decision = service.evaluate_access(&read_doc("admin-user")).await;
    assert_eq!(decision.effect, Effect::Permit);
}

#[tokio::test]
async fn empty_policy_set_falls_back_to_default_deny() {
    let service = service(vec![]);
    let decision = service.evaluate_access(&read_doc("staff-user")).await;
    assert_eq!(decision.effect, Effect::Deny);
    assert!(decision.reason.contains("default"));
}

#[tokio::test]
async fn expired_policy_has_no_influence() {
    let expired = restricted_deny_policy().with_validity(
        None,
        Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
    );
    let service = service(vec![expired, read_permit_policy()]);

    // The deny policy would fire for staff, but it is out of force.
    let decision = service.evaluate_access(&read_doc("staff-user")).await;
    assert_eq!(decision.effect, Effect::Permit);
    assert_eq!(decision.results.len(), 1);
}

#[tokio::test]
async fn malformed_rule_leaves_siblings_intact() {
    let policy = Policy::new("mixed", "Mixed health")
        .with_rule("broken", "hasRoleAdmin(", Effect::Deny)
        .with_rule("permit-read", "actionType('read')", Effect::Permit);
    let service = service(vec![policy]);

    let decision = service.evaluate_access(&read_doc("staff-user")).await;
    assert_eq!(decision.effect, Effect::Permit);

    let rules = &decision.results[0].rule_results;
    assert!(rules[0].diagnostic.is_some());
    assert!(!rules[0].matched);
    assert!(rules[1].matched);
}

#[tokio::test]
async fn warm_cache_reevaluation_is_stable() {
    let service = service(vec![restricted_deny_policy(), read_permit_policy()]);
    let first = service.evaluate_access(&read_doc("staff-user")).await;
    let second = service.evaluate_access(&read_doc("staff-user")).await;

    assert_eq!(first.effect, second.effect);
    assert_eq!(first.reason, second.reason);
    assert!(second.cache_hit);
}
