//! The attribute resolver.
//!
//! Turns raw store records into the four per-request snapshots, with a TTL
//! cache per namespace. Subject resolution flattens the role hierarchy;
//! resource resolution overlays instance records onto type defaults and runs
//! registered enrichers; environment resolution caches the per-minute base
//! and overlays caller context fresh on every request.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::actions;
use crate::attributes::{
    Action, Environment, RequestContext, ResolvedAttributes, Resource, Subject,
};
use crate::cache::{CacheStats, TtlCache};
use crate::enrichment::EnrichmentRegistry;
use crate::store::{AttributeStore, ResolutionError};

// ============================================================================
// Config
// ============================================================================

/// Cache tuning for the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// TTL for resolved subjects.
    pub subject_ttl: Duration,
    /// TTL for resolved resources.
    pub resource_ttl: Duration,
    /// TTL for classified actions.
    pub action_ttl: Duration,
    /// TTL for the per-minute environment base.
    pub environment_ttl: Duration,
    /// Capacity of each cache.
    pub max_entries: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            subject_ttl: Duration::from_secs(300),
            resource_ttl: Duration::from_secs(300),
            action_ttl: Duration::from_secs(600),
            environment_ttl: Duration::from_secs(60),
            max_entries: 1000,
        }
    }
}

/// Per-cache counters, one block per namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Subject cache counters.
    pub subject: CacheStats,
    /// Resource cache counters.
    pub resource: CacheStats,
    /// Action cache counters.
    pub action: CacheStats,
    /// Environment base cache counters.
    pub environment: CacheStats,
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves request identifiers into attribute snapshots.
pub struct AttributeResolver<S> {
    store: Arc<S>,
    subjects: TtlCache<String, Subject>,
    resources: TtlCache<(String, String), Resource>,
    action_table: TtlCache<String, Action>,
    environments: TtlCache<i64, Environment>,
    enrichment: EnrichmentRegistry,
}

impl<S: AttributeStore> AttributeResolver<S> {
    /// Creates a resolver over a store with the given cache tuning.
    pub fn new(store: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            store,
            subjects: TtlCache::new(config.subject_ttl, config.max_entries),
            resources: TtlCache::new(config.resource_ttl, config.max_entries),
            action_table: TtlCache::new(config.action_ttl, config.max_entries),
            environments: TtlCache::new(config.environment_ttl, config.max_entries),
            enrichment: EnrichmentRegistry::new(),
        }
    }

    /// Registers a resource enricher for a type.
    pub fn register_enricher<F>(&mut self, resource_type: &str, enricher: F)
    where
        F: Fn(Option<&str>, &mut std::collections::HashMap<String, verdict_types::AttributeValue>)
            + Send
            + Sync
            + 'static,
    {
        self.enrichment.register(resource_type, enricher);
    }

    /// Resolves a subject, flattening its role hierarchy.
    ///
    /// The hierarchy walk is breadth-first with a visited set, so cyclic or
    /// diamond-shaped parent links are traversed once each.
    pub async fn resolve_subject(&self, subject_id: &str) -> Result<Subject, ResolutionError> {
        if let Some(hit) = self.subjects.get(&subject_id.to_string()) {
            return Ok(hit);
        }

        let identity = self.store.fetch_identity(subject_id).await?;

        let mut role_names = Vec::new();
        let mut role_level = 0u8;
        let mut permissions: BTreeSet<String> = BTreeSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = identity.role_ids.iter().cloned().collect();

        while let Some(role_id) = queue.pop_front() {
            if !visited.insert(role_id.clone()) {
                continue;
            }
            let role = self.store.fetch_role(&role_id).await?;
            role_level = role_level.max(role.level);
            permissions.extend(role.permissions.iter().cloned());
            role_names.push(role.name);
            if let Some(parent) = role.parent_id {
                queue.push_back(parent);
            }
        }

        permissions.extend(identity.special_permissions.iter().cloned());

        let subject = Subject {
            id: identity.id,
            display_name: identity.display_name,
            roles: role_names,
            role_level,
            department: identity.department,
            departments: identity.departments,
            location: identity.location,
            clearance_level: identity.clearance_level,
            permissions: permissions.into_iter().collect(),
            account_status: identity.account_status,
        };

        debug!(
            subject = %subject.id,
            roles = subject.roles.len(),
            permissions = subject.permissions.len(),
            "resolved subject"
        );
        self.subjects.insert(subject_id.to_string(), subject.clone());
        Ok(subject)
    }

    /// Resolves a resource: type defaults, instance overlay, then enrichment.
    pub async fn resolve_resource(
        &self,
        resource_type: &str,
        resource_id: Option<&str>,
    ) -> Result<Resource, ResolutionError> {
        let key = (
            resource_type.to_string(),
            resource_id.unwrap_or_default().to_string(),
        );
        if let Some(hit) = self.resources.get(&key) {
            return Ok(hit);
        }

        let mut resource = Resource::type_defaults(resource_type);
        if let Some(id) = resource_id {
            resource.resource_id = Some(id.to_string());
            if let Some(record) = self.store.fetch_resource(resource_type, id).await? {
                resource.data_classification = record.data_classification;
                resource.owner_department = record.owner_department;
                resource.owner_location = record.owner_location;
                resource.document_state = record.document_state;
                resource.total_value = record.total_value;
                resource.custom = record.custom;
            }
        }
        self.enrichment.apply(&mut resource);

        debug!(
            resource_type,
            resource_id = resource_id.unwrap_or("-"),
            classification = resource.data_classification.as_str(),
            "resolved resource"
        );
        self.resources.insert(key, resource.clone());
        Ok(resource)
    }

    /// Classifies an action by name, through the action cache.
    pub fn resolve_action(&self, name: &str) -> Action {
        if let Some(hit) = self.action_table.get(&name.to_string()) {
            return hit;
        }
        let action = actions::classify(name);
        self.action_table.insert(name.to_string(), action.clone());
        action
    }

    /// Resolves the environment for a timestamp and caller context.
    ///
    /// The time-derived base is cached per minute; context-bearing fields and
    /// the risk score are recomputed fresh on every call.
    pub fn resolve_environment(
        &self,
        timestamp: DateTime<Utc>,
        context: &RequestContext,
    ) -> Environment {
        let bucket = timestamp.timestamp().div_euclid(60);
        let base = self.environments.get(&bucket).unwrap_or_else(|| {
            let base = Environment::base(timestamp);
            self.environments.insert(bucket, base.clone());
            base
        });
        base.with_context(context)
    }

    /// Resolves all four snapshots for one request.
    ///
    /// Subject and resource lookups hit the store and run concurrently;
    /// action and environment are derived locally.
    pub async fn resolve_all(
        &self,
        subject_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        action_name: &str,
        timestamp: DateTime<Utc>,
        context: &RequestContext,
    ) -> Result<ResolvedAttributes, ResolutionError> {
        let (subject, resource) = tokio::join!(
            self.resolve_subject(subject_id),
            self.resolve_resource(resource_type, resource_id),
        );

        Ok(ResolvedAttributes {
            subject: subject?,
            resource: resource?,
            action: self.resolve_action(action_name),
            environment: self.resolve_environment(timestamp, context),
        })
    }

    /// Drops the cached snapshot for one subject.
    pub fn invalidate_subject(&self, subject_id: &str) {
        self.subjects.invalidate(&subject_id.to_string());
    }

    /// Drops every cached snapshot.
    pub fn clear_caches(&self) {
        self.subjects.clear();
        self.resources.clear();
        self.action_table.clear();
        self.environments.clear();
    }

    /// Per-cache hit/miss counters.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            subject: self.subjects.stats(),
            resource: self.resources.stats(),
            action: self.action_table.stats(),
            environment: self.environments.stats(),
        }
    }
}

impl<S> std::fmt::Debug for AttributeResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeResolver")
            .field("enrichment", &self.enrichment)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AccountStatus, IdentityRecord, MemoryStore, ResourceRecord, RoleRecord};
    use chrono::TimeZone;
    use verdict_types::{AttributeValue, DataClassification};

    fn store_with_hierarchy() -> MemoryStore {
        let store = MemoryStore::new();
        store.put_role(RoleRecord {
            id: "role-employee".to_string(),
            name: "employee".to_string(),
            level: 1,
            permissions: vec!["document:read".to_string()],
            parent_id: None,
        });
        store.put_role(RoleRecord {
            id: "role-manager".to_string(),
            name: "manager".to_string(),
            level: 5,
            permissions: vec!["document:approve".to_string()],
            parent_id: Some("role-employee".to_string()),
        });
        store.put_identity(IdentityRecord {
            id: "u1".to_string(),
            display_name: "Avery".to_string(),
            role_ids: vec!["role-manager".to_string()],
            department: "finance".to_string(),
            departments: vec!["finance".to_string()],
            location: "hq".to_string(),
            clearance_level: 3,
            special_permissions: vec!["report:export".to_string()],
            account_status: AccountStatus::Active,
        });
        store
    }

    fn resolver(store: MemoryStore) -> AttributeResolver<MemoryStore> {
        AttributeResolver::new(Arc::new(store), ResolverConfig::default())
    }

    #[tokio::test]
    async fn test_subject_role_closure_and_permission_union() {
        let resolver = resolver(store_with_hierarchy());
        let subject = resolver.resolve_subject("u1").await.expect("subject");

        assert!(subject.roles.contains(&"manager".to_string()));
        assert!(subject.roles.contains(&"employee".to_string()));
        assert_eq!(subject.role_level, 5);
        assert!(subject.permissions.contains(&"document:read".to_string()));
        assert!(subject.permissions.contains(&"document:approve".to_string()));
        assert!(subject.permissions.contains(&"report:export".to_string()));
    }

    #[tokio::test]
    async fn test_cyclic_role_links_terminate() {
        let store = MemoryStore::new();
        store.put_role(RoleRecord {
            id: "a".to_string(),
            name: "a".to_string(),
            level: 1,
            permissions: vec![],
            parent_id: Some("b".to_string()),
        });
        store.put_role(RoleRecord {
            id: "b".to_string(),
            name: "b".to_string(),
            level: 2,
            permissions: vec![],
            parent_id: Some("a".to_string()),
        });
        store.put_identity(IdentityRecord {
            id: "u1".to_string(),
            display_name: "Cyclist".to_string(),
            role_ids: vec!["a".to_string()],
            department: "it".to_string(),
            departments: vec!["it".to_string()],
            location: "hq".to_string(),
            clearance_level: 1,
            special_permissions: vec![],
            account_status: AccountStatus::Active,
        });

        let resolver = resolver(store);
        let subject = resolver.resolve_subject("u1").await.expect("subject");
        assert_eq!(subject.roles.len(), 2);
        assert_eq!(subject.role_level, 2);
    }

    #[tokio::test]
    async fn test_missing_role_is_an_error() {
        let store = MemoryStore::new();
        store.put_identity(IdentityRecord {
            id: "u1".to_string(),
            display_name: "Dangling".to_string(),
            role_ids: vec!["role-ghost".to_string()],
            department: "it".to_string(),
            departments: vec![],
            location: "hq".to_string(),
            clearance_level: 1,
            special_permissions: vec![],
            account_status: AccountStatus::Active,
        });

        let resolver = resolver(store);
        let err = resolver.resolve_subject("u1").await.unwrap_err();
        assert_eq!(err, ResolutionError::RoleNotFound("role-ghost".to_string()));
    }

    #[tokio::test]
    async fn test_subject_cache_serves_second_lookup() {
        let resolver = resolver(store_with_hierarchy());
        resolver.resolve_subject("u1").await.expect("first");
        resolver.resolve_subject("u1").await.expect("second");

        let stats = resolver.stats();
        assert_eq!(stats.subject.hits, 1);
    }

    #[tokio::test]
    async fn test_resource_overlay_and_type_defaults() {
        let store = store_with_hierarchy();
        store.put_resource(
            "purchase_request",
            "pr-1",
            ResourceRecord {
                data_classification: DataClassification::Confidential,
                owner_department: Some("finance".to_string()),
                ..ResourceRecord::default()
            },
        );
        let resolver = resolver(store);

        let with_record = resolver
            .resolve_resource("purchase_request", Some("pr-1"))
            .await
            .expect("resource");
        assert_eq!(
            with_record.data_classification,
            DataClassification::Confidential
        );
        assert_eq!(with_record.owner_department.as_deref(), Some("finance"));

        // Unknown instance falls back to type defaults.
        let defaults = resolver
            .resolve_resource("purchase_request", Some("pr-404"))
            .await
            .expect("resource");
        assert_eq!(defaults.data_classification, DataClassification::Internal);
        assert_eq!(defaults.resource_id.as_deref(), Some("pr-404"));
    }

    #[tokio::test]
    async fn test_enricher_runs_on_resolution() {
        let mut resolver = resolver(store_with_hierarchy());
        resolver.register_enricher("purchase_request", |_, custom| {
            custom.insert("enriched".to_string(), AttributeValue::Bool(true));
        });

        let resource = resolver
            .resolve_resource("purchase_request", None)
            .await
            .expect("resource");
        assert_eq!(
            resource.custom.get("enriched"),
            Some(&AttributeValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_environment_minute_bucket_with_fresh_overlay() {
        let resolver = resolver(store_with_hierarchy());
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 30).unwrap();

        let quiet = resolver.resolve_environment(ts, &RequestContext::default());
        assert!(quiet.is_business_hours);

        // Same minute, different context: base is cached, overlay is fresh.
        let bot = resolver.resolve_environment(
            ts,
            &RequestContext {
                ip_address: Some("203.0.113.9".to_string()),
                user_agent: Some("ScanBot/1.0".to_string()),
                ..RequestContext::default()
            },
        );
        assert!(bot.risk_score > quiet.risk_score);
        assert_eq!(resolver.stats().environment.hits, 1);
    }

    #[tokio::test]
    async fn test_resolve_all_assembles_four_snapshots() {
        let resolver = resolver(store_with_hierarchy());
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap();

        let resolved = resolver
            .resolve_all(
                "u1",
                "purchase_request",
                None,
                "approve",
                ts,
                &RequestContext::default(),
            )
            .await
            .expect("resolved");

        assert_eq!(resolved.subject.id, "u1");
        assert_eq!(resolved.resource.resource_type, "purchase_request");
        assert_eq!(resolved.action.classification.action_type, "approve");
        assert!(resolved.environment.is_business_hours);
    }
}
