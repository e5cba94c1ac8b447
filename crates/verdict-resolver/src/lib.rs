//! # verdict-resolver: Attribute resolution
//!
//! Gathers the four attribute namespaces for an access request:
//!
//! ```text
//!                 ┌──────────────────┐
//!   subject id ──►│                  │──► Subject    (roles flattened)
//!   resource  ───►│ AttributeResolver│──► Resource   (defaults + overlay)
//!   action    ───►│   (TTL caches)   │──► Action     (static table)
//!   context   ───►│                  │──► Environment(time + risk signals)
//!                 └────────┬─────────┘
//!                          │
//!                   AttributeStore (host adapter)
//! ```
//!
//! Raw records come from the host through the [`AttributeStore`] trait; the
//! resolver owns flattening, classification, enrichment, and caching. Every
//! snapshot flattens to an `AttributeMap` for condition evaluation.
//!
//! Resolution failures surface as [`ResolutionError`]; the decision layer
//! turns them into deny decisions, never into panics.

pub mod actions;
pub mod attributes;
pub mod cache;
pub mod enrichment;
pub mod resolver;
pub mod store;

pub use attributes::{
    Action, ActionClassification, Environment, RequestContext, ResolvedAttributes, Resource,
    Subject, is_business_hours,
};
pub use cache::CacheStats;
pub use enrichment::EnrichmentRegistry;
pub use resolver::{AttributeResolver, ResolverConfig, ResolverStats};
pub use store::{
    AccountStatus, AttributeStore, IdentityRecord, MemoryStore, ResolutionError, ResourceRecord,
    RoleRecord,
};
