//! Engine configuration and policy loading errors.
//!
//! These are the only fatal errors in the crate: a bad engine config or an
//! unparseable policy set is rejected at construction/load time. Once the
//! engine is running, every per-request failure degrades to a deny decision
//! instead of an error return.

use thiserror::Error;

/// Invalid engine configuration, rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The combining algorithm name is not recognized.
    #[error("unknown combining algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// The audit log capacity must be non-zero when auditing is enabled.
    #[error("audit log capacity must be non-zero when auditing is enabled")]
    ZeroAuditCapacity,
}

/// A policy definition that cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyLoadError {
    /// Two policies in one load share an id.
    #[error("duplicate policy id '{0}'")]
    DuplicateId(String),

    /// A policy's validity window is inverted.
    #[error("policy '{0}': validFrom is not before validUntil")]
    InvertedValidity(String),

    /// Policy JSON did not deserialize.
    #[error("malformed policy definition: {0}")]
    Malformed(String),
}
