//! In-memory audit trail.
//!
//! Every evaluation appends a compact entry to a bounded ring; when the ring
//! is full the oldest entry is dropped. This is the engine's own decision
//! history for debugging and stats, not the host's compliance audit sink
//! (hosts act on `AccessDecision::audit_required` for that).

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use verdict_types::Effect;

use crate::decision::AccessDecision;

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Correlates with `AccessDecision::request_id`.
    pub request_id: Uuid,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Requesting subject.
    pub subject_id: String,
    /// Resource type.
    pub resource_type: String,
    /// Resource instance, when named.
    pub resource_id: Option<String>,
    /// Requested action.
    pub action: String,
    /// Final effect.
    pub effect: Effect,
    /// Final reason.
    pub reason: String,
    /// Evaluation wall time.
    pub evaluation_time: Duration,
}

/// Aggregates over the retained window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    /// Entries currently retained.
    pub total: usize,
    /// Permit decisions in the window.
    pub permits: usize,
    /// Deny decisions in the window.
    pub denies: usize,
    /// Mean evaluation time over the window.
    pub avg_evaluation_time: Duration,
}

/// Bounded ring of [`AuditEntry`] values.
#[derive(Debug)]
pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl AuditLog {
    /// Creates a log retaining at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Records a decision, dropping the oldest entry when full.
    pub fn record(
        &self,
        decision: &AccessDecision,
        subject_id: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        action: &str,
    ) {
        let entry = AuditEntry {
            request_id: decision.request_id,
            timestamp: decision.timestamp,
            subject_id: subject_id.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.map(str::to_string),
            action: action.to_string(),
            effect: decision.effect,
            reason: decision.reason.clone(),
            evaluation_time: decision.evaluation_time,
        };

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The most recent entries, newest last, up to `limit`.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// All retained entries for one subject, newest last.
    pub fn for_subject(&self, subject_id: &str) -> Vec<AuditEntry> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.subject_id == subject_id)
            .cloned()
            .collect()
    }

    /// Aggregates over the retained window.
    pub fn stats(&self) -> AuditStats {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let total = entries.len();
        let permits = entries
            .iter()
            .filter(|entry| entry.effect == Effect::Permit)
            .count();
        let summed: Duration = entries.iter().map(|entry| entry.evaluation_time).sum();
        AuditStats {
            total,
            permits,
            denies: total - permits,
            avg_evaluation_time: if total == 0 {
                Duration::ZERO
            } else {
                summed / total as u32
            },
        }
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
