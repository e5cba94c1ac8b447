//! The attribute store adapter seam.
//!
//! The resolver never owns identity, role, or resource data; it reads raw
//! records through [`AttributeStore`] and turns them into per-request
//! snapshots. Hosts implement this trait over their directory, database, or
//! IdP. [`MemoryStore`] is a complete in-memory implementation for tests and
//! embedding.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdict_types::{AttributeValue, DataClassification};

// ============================================================================
// Errors
// ============================================================================

/// Error raised while resolving attributes from upstream stores.
///
/// Never escapes the decision path: the PDP converts any resolution failure
/// into a deny decision with a diagnostic reason (fail-closed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The subject id has no identity record.
    #[error("subject '{0}' not found")]
    SubjectNotFound(String),

    /// A role referenced by an identity or a parent link does not exist.
    #[error("role '{0}' not found")]
    RoleNotFound(String),

    /// The upstream store failed (connectivity, timeout, corrupt record).
    #[error("attribute store failure: {0}")]
    Store(String),
}

// ============================================================================
// Raw records
// ============================================================================

/// Account lifecycle state of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Normal, usable account.
    #[default]
    Active,
    /// Temporarily blocked.
    Suspended,
    /// Permanently deactivated.
    Disabled,
}

impl AccountStatus {
    /// Lowercase name as it appears in attribute maps.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Disabled => "disabled",
        }
    }
}

/// Raw identity record as stored by the identity directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Stable identity id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Directly assigned role ids (hierarchy is flattened by the resolver).
    pub role_ids: Vec<String>,
    /// Primary department.
    pub department: String,
    /// All department memberships (includes the primary).
    pub departments: Vec<String>,
    /// Primary location.
    pub location: String,
    /// Security clearance level.
    pub clearance_level: u8,
    /// Grants held outside any role.
    pub special_permissions: Vec<String>,
    /// Account lifecycle state.
    pub account_status: AccountStatus,
}

/// Raw role record with an optional parent link.
///
/// Parent links form a hierarchy the resolver flattens per subject. Cycles in
/// stored data are tolerated (guarded by a visited set), not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Stable role id.
    pub id: String,
    /// Role name as referenced by policies.
    pub name: String,
    /// Hierarchy level; higher means more privileged.
    pub level: u8,
    /// Permissions granted by this role.
    pub permissions: Vec<String>,
    /// Parent role id, if this role inherits from another.
    pub parent_id: Option<String>,
}

/// Raw per-instance resource record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Sensitivity classification.
    pub data_classification: DataClassification,
    /// Department that owns the instance.
    pub owner_department: Option<String>,
    /// Location that owns the instance.
    pub owner_location: Option<String>,
    /// Workflow or document state (e.g. "draft", "approved").
    pub document_state: Option<String>,
    /// Monetary value, where the resource has one.
    pub total_value: Option<Decimal>,
    /// Free-form attributes, flattened into the resource map under `custom.`.
    pub custom: HashMap<String, AttributeValue>,
}

// ============================================================================
// AttributeStore
// ============================================================================

/// Read-only adapter over the host's identity/role/resource directories.
///
/// All methods return `Send` futures so resolutions can fan out concurrently
/// and bulk checks can run on a multithreaded runtime.
pub trait AttributeStore: Send + Sync + 'static {
    /// Fetches the identity record for a subject id.
    fn fetch_identity(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<IdentityRecord, ResolutionError>> + Send;

    /// Fetches a role record by id.
    fn fetch_role(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<RoleRecord, ResolutionError>> + Send;

    /// Fetches the instance record for a resource, if one exists.
    ///
    /// `Ok(None)` means the type is known but the instance has no stored
    /// attributes; the resolver falls back to type-level defaults.
    fn fetch_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<ResourceRecord>, ResolutionError>> + Send;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory [`AttributeStore`] for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: RwLock<HashMap<String, IdentityRecord>>,
    roles: RwLock<HashMap<String, RoleRecord>>,
    resources: RwLock<HashMap<(String, String), ResourceRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an identity record.
    pub fn put_identity(&self, record: IdentityRecord) {
        self.identities
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(record.id.clone(), record);
    }

    /// Inserts or replaces a role record.
    pub fn put_role(&self, record: RoleRecord) {
        self.roles
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(record.id.clone(), record);
    }

    /// Inserts or replaces a resource instance record.
    pub fn put_resource(&self, resource_type: &str, id: &str, record: ResourceRecord) {
        self.resources
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert((resource_type.to_string(), id.to_string()), record);
    }
}

impl AttributeStore for MemoryStore {
    fn fetch_identity(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<IdentityRecord, ResolutionError>> + Send {
        let found = self
            .identities
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned();
        let id = id.to_string();
        async move { found.ok_or(ResolutionError::SubjectNotFound(id)) }
    }

    fn fetch_role(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<RoleRecord, ResolutionError>> + Send {
        let found = self
            .roles
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned();
        let id = id.to_string();
        async move { found.ok_or(ResolutionError::RoleNotFound(id)) }
    }

    fn fetch_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<ResourceRecord>, ResolutionError>> + Send {
        let found = self
            .resources
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned();
        async move { Ok(found) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> IdentityRecord {
        IdentityRecord {
            id: id.to_string(),
            display_name: "Test User".to_string(),
            role_ids: vec!["role-staff".to_string()],
            department: "procurement".to_string(),
            departments: vec!["procurement".to_string()],
            location: "hq".to_string(),
            clearance_level: 1,
            special_permissions: vec![],
            account_status: AccountStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_memory_store_identity_roundtrip() {
        let store = MemoryStore::new();
        store.put_identity(identity("u1"));

        let fetched = store.fetch_identity("u1").await.expect("identity");
        assert_eq!(fetched.department, "procurement");

        let missing = store.fetch_identity("nobody").await;
        assert_eq!(
            missing,
            Err(ResolutionError::SubjectNotFound("nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_store_resource_defaults_to_none() {
        let store = MemoryStore::new();
        let fetched = store
            .fetch_resource("purchase_request", "pr-1")
            .await
            .expect("fetch");
        assert!(fetched.is_none());
    }
}
