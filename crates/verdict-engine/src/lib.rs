//! # verdict-engine: The policy decision point
//!
//! Evaluates access requests against attribute-based policies:
//!
//! ```text
//!   AccessRequest
//!        │
//!        ▼
//!  PermissionService ──► AttributeResolver (verdict-resolver)
//!        │                       │
//!        │               ResolvedAttributes
//!        ▼                       │
//!   PolicyEngine ◄───────────────┘
//!        │  applicability → rule evaluation → combining
//!        ▼
//!   AccessDecision (effect, reason, trail, obligations)
//! ```
//!
//! The engine is fail-closed end to end: no applicable policy, a failed
//! attribute resolution, or a defective policy all land on deny. The only
//! errors surfaced to hosts are construction-time ([`ConfigError`]) and
//! load-time ([`PolicyLoadError`]) ones.

pub mod applicability;
pub mod audit;
pub mod combining;
pub mod decision;
pub mod engine;
pub mod error;
pub mod policy;
pub mod service;

pub use audit::{AuditEntry, AuditLog, AuditStats};
pub use combining::CombinedVerdict;
pub use decision::{AccessDecision, EvaluationResult, RuleResult};
pub use engine::{EngineConfig, PolicyEngine};
pub use error::{ConfigError, PolicyLoadError};
pub use policy::{
    ActionTarget, CombiningAlgorithm, DayOfWeek, EnvironmentTarget, Policy, PolicyRule,
    PolicyTarget, ResourceTarget, SubjectTarget, TimeWindow, validate_policies,
};
pub use service::{
    AccessRequest, BulkCheckItem, EffectivePermissions, MemoryPolicyStore, PermissionCatalog,
    PermissionCheck, PermissionEntry, PermissionService, PolicyStore, ServiceConfig,
};
