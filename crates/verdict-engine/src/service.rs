//! The permission service: the host-facing surface.
//!
//! Wires the resolver, the policy store, and the engine together behind four
//! operations: full evaluation, boolean checks, bulk checks, and the
//! effective-permission listing. Every failure on the request path degrades
//! to a deny decision; this layer never returns an error to the caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{error, warn};
use uuid::Uuid;
use verdict_resolver::{AttributeResolver, AttributeStore, RequestContext};
use verdict_types::Effect;

use crate::decision::AccessDecision;
use crate::engine::{EngineConfig, PolicyEngine};
use crate::error::{ConfigError, PolicyLoadError};
use crate::policy::{Policy, validate_policies};

// ============================================================================
// Policy store
// ============================================================================

/// Adapter over the host's policy storage.
pub trait PolicyStore: Send + Sync + 'static {
    /// Loads the full policy set.
    fn load_policies(
        &self,
    ) -> impl Future<Output = Result<Vec<Policy>, PolicyLoadError>> + Send;
}

/// In-memory [`PolicyStore`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<Vec<Policy>>,
}

impl MemoryPolicyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored policy set.
    pub fn set_policies(&self, policies: Vec<Policy>) {
        *self
            .policies
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = policies;
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn load_policies(
        &self,
    ) -> impl Future<Output = Result<Vec<Policy>, PolicyLoadError>> + Send {
        let policies = self
            .policies
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        async move {
            validate_policies(&policies)?;
            Ok(policies)
        }
    }
}

// ============================================================================
// Policy cache
// ============================================================================

/// Single-slot TTL cache over the loaded policy set.
#[derive(Debug)]
struct PolicyCache {
    slot: RwLock<Option<(Arc<Vec<Policy>>, Instant)>>,
    ttl: Duration,
}

impl PolicyCache {
    fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    fn get(&self) -> Option<Arc<Vec<Policy>>> {
        self.slot
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .filter(|(_, loaded)| loaded.elapsed() < self.ttl)
            .map(|(policies, _)| Arc::clone(policies))
    }

    fn put(&self, policies: Arc<Vec<Policy>>) {
        *self
            .slot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some((policies, Instant::now()));
    }

    fn invalidate(&self) {
        *self
            .slot
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

// ============================================================================
// Requests
// ============================================================================

/// One access question for the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    /// Requesting subject id.
    pub subject_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource instance, when the question is about one.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Requested action name.
    pub action: String,
    /// Request time; `None` means the service clock.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Ambient request context.
    #[serde(default)]
    pub context: RequestContext,
}

impl AccessRequest {
    /// Shorthand constructor for the common fields.
    pub fn new(
        subject_id: impl Into<String>,
        resource_type: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            action: action.into(),
            timestamp: None,
            context: RequestContext::default(),
        }
    }

    /// Names a resource instance.
    #[must_use]
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Pins the request time.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attaches ambient context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// One item of a bulk check: the parts that vary per question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckItem {
    /// Resource type.
    pub resource_type: String,
    /// Resource instance, when named.
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Requested action.
    pub action: String,
}

impl BulkCheckItem {
    /// Shorthand constructor.
    pub fn new(resource_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: None,
            action: action.into(),
        }
    }
}

/// Result of a boolean permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionCheck {
    /// Whether access is granted.
    pub allowed: bool,
    /// The decision's reason.
    pub reason: String,
    /// Time spent resolving and evaluating.
    pub execution_time: Duration,
    /// The full decision, for callers that need the trail.
    pub decision: AccessDecision,
}

/// One permitted (resource type, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionEntry {
    /// Resource type.
    pub resource_type: String,
    /// Permitted action.
    pub action: String,
}

/// Everything the subject may do, over the registered catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissions {
    /// Subject the listing is for.
    pub subject_id: String,
    /// Permitted (resource type, action) pairs.
    pub permitted: Vec<PermissionEntry>,
}

// ============================================================================
// Catalog
// ============================================================================

/// The fixed (resource type, action) universe that effective-permission
/// listings enumerate.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    actions: HashMap<String, Vec<String>>,
}

impl PermissionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the candidate actions for a resource type.
    pub fn register(&mut self, resource_type: &str, actions: &[&str]) {
        self.actions.insert(
            resource_type.to_string(),
            actions.iter().map(|a| (*a).to_string()).collect(),
        );
    }

    /// All (resource type, action) pairs, sorted for stable output.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .actions
            .iter()
            .flat_map(|(resource_type, actions)| {
                actions
                    .iter()
                    .map(move |action| (resource_type.clone(), action.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }
}

// ============================================================================
// Service config
// ============================================================================

/// Service-level tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Engine configuration.
    pub engine: EngineConfig,
    /// TTL for the loaded policy set.
    pub policy_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            policy_ttl: Duration::from_secs(300),
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// The host-facing permission service.
///
/// Cheap to clone; clones share the resolver caches, the policy cache, and
/// the audit trail.
#[derive(Debug)]
pub struct PermissionService<S, P> {
    resolver: Arc<AttributeResolver<S>>,
    policy_store: Arc<P>,
    policy_cache: Arc<PolicyCache>,
    engine: Arc<PolicyEngine>,
    catalog: Arc<PermissionCatalog>,
}

impl<S, P> Clone for PermissionService<S, P> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            policy_store: Arc::clone(&self.policy_store),
            policy_cache: Arc::clone(&self.policy_cache),
            engine: Arc::clone(&self.engine),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S: AttributeStore, P: PolicyStore> PermissionService<S, P> {
    /// Builds a service over a resolver and a policy store.
    ///
    /// Takes the resolver by value so hosts can register enrichers first.
    pub fn new(
        resolver: AttributeResolver<S>,
        policy_store: Arc<P>,
        catalog: PermissionCatalog,
        config: ServiceConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            resolver: Arc::new(resolver),
            policy_store,
            policy_cache: Arc::new(PolicyCache::new(config.policy_ttl)),
            engine: Arc::new(PolicyEngine::new(config.engine)?),
            catalog: Arc::new(catalog),
        })
    }

    /// The underlying engine, for audit queries.
    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// The underlying resolver, for cache stats and invalidation.
    pub fn resolver(&self) -> &AttributeResolver<S> {
        &self.resolver
    }

    /// Drops the cached policy set; the next request reloads.
    pub fn invalidate_policies(&self) {
        self.policy_cache.invalidate();
    }

    /// Evaluates one request into a full decision.
    ///
    /// Fail-closed: resolution and policy-load failures produce a deny
    /// decision carrying the failure as its reason.
    pub async fn evaluate_access(&self, request: &AccessRequest) -> AccessDecision {
        let timestamp = request.timestamp.unwrap_or_else(Utc::now);

        let (policies, cache_hit) = match self.load_policies().await {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(%err, "policy load failed; denying");
                return self.deny(timestamp, format!("policy load failed: {err}"));
            }
        };

        let resolved = match self
            .resolver
            .resolve_all(
                &request.subject_id,
                &request.resource_type,
                request.resource_id.as_deref(),
                &request.action,
                timestamp,
                &request.context,
            )
            .await
        {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(subject = %request.subject_id, %err, "resolution failed; denying");
                return self.deny(timestamp, format!("attribute resolution failed: {err}"));
            }
        };

        self.engine.evaluate(&policies, &resolved, cache_hit)
    }

    /// Boolean facade over [`evaluate_access`](Self::evaluate_access).
    pub async fn check_permission(&self, request: &AccessRequest) -> PermissionCheck {
        let started = Instant::now();
        let decision = self.evaluate_access(request).await;
        PermissionCheck {
            allowed: decision.is_permit(),
            reason: decision.reason.clone(),
            execution_time: started.elapsed(),
            decision,
        }
    }

    /// Checks many questions for one subject concurrently.
    ///
    /// The subject is resolved once up front; the spawned evaluations hit the
    /// warm cache. Output order matches input order.
    pub async fn bulk_check_permissions(
        &self,
        subject_id: &str,
        items: Vec<BulkCheckItem>,
        context: RequestContext,
    ) -> Vec<AccessDecision> {
        // Warm the subject entry so the fan-out does not re-resolve it.
        if let Err(err) = self.resolver.resolve_subject(subject_id).await {
            warn!(subject = %subject_id, %err, "bulk subject resolution failed; denying all");
        }
        let timestamp = Utc::now();

        let mut set = JoinSet::new();
        for (index, item) in items.into_iter().enumerate() {
            let service = self.clone();
            let request = AccessRequest {
                subject_id: subject_id.to_string(),
                resource_type: item.resource_type,
                resource_id: item.resource_id,
                action: item.action,
                timestamp: Some(timestamp),
                context: context.clone(),
            };
            set.spawn(async move { (index, service.evaluate_access(&request).await) });
        }

        let mut decisions: Vec<Option<AccessDecision>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, decision)) => {
                    if decisions.len() <= index {
                        decisions.resize(index + 1, None);
                    }
                    decisions[index] = Some(decision);
                }
                Err(err) => {
                    error!(%err, "bulk check task failed");
                }
            }
        }

        decisions
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    self.deny(Utc::now(), "evaluation task failed".to_string())
                })
            })
            .collect()
    }

    /// Enumerates the permitted (resource type, action) pairs from the
    /// registered catalog.
    pub async fn get_effective_permissions(
        &self,
        subject_id: &str,
        context: RequestContext,
    ) -> EffectivePermissions {
        let pairs = self.catalog.pairs();
        let items: Vec<BulkCheckItem> = pairs
            .iter()
            .map(|(resource_type, action)| BulkCheckItem::new(resource_type, action))
            .collect();
        let decisions = self
            .bulk_check_permissions(subject_id, items, context)
            .await;

        let permitted = pairs
            .into_iter()
            .zip(decisions)
            .filter(|(_, decision)| decision.is_permit())
            .map(|((resource_type, action), _)| PermissionEntry {
                resource_type,
                action,
            })
            .collect();

        EffectivePermissions {
            subject_id: subject_id.to_string(),
            permitted,
        }
    }

    async fn load_policies(&self) -> Result<(Arc<Vec<Policy>>, bool), PolicyLoadError> {
        if let Some(policies) = self.policy_cache.get() {
            return Ok((policies, true));
        }
        let policies = Arc::new(self.policy_store.load_policies().await?);
        self.policy_cache.put(Arc::clone(&policies));
        Ok((policies, false))
    }

    fn deny(&self, timestamp: DateTime<Utc>, reason: String) -> AccessDecision {
        AccessDecision {
            request_id: Uuid::new_v4(),
            effect: Effect::Deny,
            reason,
            results: Vec::new(),
            obligations: Vec::new(),
            advice: Vec::new(),
            audit_required: false,
            cache_hit: false,
            evaluation_time: Duration::ZERO,
            timestamp,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
