//! Per-request attribute snapshots.
//!
//! The resolver produces four read-only snapshots per request: [`Subject`],
//! [`Resource`], [`Action`], and [`Environment`]. Each flattens into an
//! [`AttributeMap`] for condition evaluation; the typed forms are what the
//! applicability filter matches against. Snapshots are immutable and
//! discarded after the decision.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use verdict_types::{ActionCategory, AttributeMap, AttributeValue, DataClassification, RiskLevel, TrustLevel};

use crate::store::AccountStatus;

// ============================================================================
// Subject
// ============================================================================

/// The requesting user, with role hierarchy already flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Stable identity id.
    pub id: String,
    /// Display name.
    pub display_name: String,
    /// Flattened role-name closure (direct roles plus all ancestors).
    pub roles: Vec<String>,
    /// Highest role level in the closure.
    pub role_level: u8,
    /// Primary department.
    pub department: String,
    /// All department memberships.
    pub departments: Vec<String>,
    /// Primary location.
    pub location: String,
    /// Security clearance level.
    pub clearance_level: u8,
    /// Effective permissions: role-granted plus special grants, deduplicated.
    pub permissions: Vec<String>,
    /// Account lifecycle state.
    pub account_status: AccountStatus,
}

impl Subject {
    /// Flattens the subject into the `subject.*` attribute namespace.
    pub fn to_attributes(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("id".into(), AttributeValue::from(self.id.clone()));
        map.insert("name".into(), AttributeValue::from(self.display_name.clone()));
        map.insert("roles".into(), AttributeValue::from(self.roles.clone()));
        map.insert("roleLevel".into(), AttributeValue::from(u32::from(self.role_level)));
        map.insert("department".into(), AttributeValue::from(self.department.clone()));
        map.insert("departments".into(), AttributeValue::from(self.departments.clone()));
        map.insert("location".into(), AttributeValue::from(self.location.clone()));
        map.insert(
            "clearanceLevel".into(),
            AttributeValue::from(u32::from(self.clearance_level)),
        );
        map.insert("permissions".into(), AttributeValue::from(self.permissions.clone()));
        map.insert(
            "accountStatus".into(),
            AttributeValue::from(self.account_status.as_str()),
        );
        map.insert(
            "isActive".into(),
            AttributeValue::Bool(self.account_status == AccountStatus::Active),
        );
        map
    }
}

// ============================================================================
// Resource
// ============================================================================

/// The resource being accessed; type-level defaults when no instance id was
/// supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type (e.g. "purchase_request").
    pub resource_type: String,
    /// Instance id, when the request names one.
    pub resource_id: Option<String>,
    /// Sensitivity classification.
    pub data_classification: DataClassification,
    /// Owning department.
    pub owner_department: Option<String>,
    /// Owning location.
    pub owner_location: Option<String>,
    /// Workflow/document state.
    pub document_state: Option<String>,
    /// Monetary value, where applicable.
    pub total_value: Option<Decimal>,
    /// Enrichment output, exposed under `custom.` keys.
    pub custom: HashMap<String, AttributeValue>,
}

impl Resource {
    /// Type-level defaults for a resource type with no instance attributes.
    pub fn type_defaults(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            resource_id: None,
            data_classification: DataClassification::default(),
            owner_department: None,
            owner_location: None,
            document_state: None,
            total_value: None,
            custom: HashMap::new(),
        }
    }

    /// Flattens the resource into the `resource.*` attribute namespace.
    pub fn to_attributes(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("type".into(), AttributeValue::from(self.resource_type.clone()));
        map.insert("id".into(), AttributeValue::from(self.resource_id.clone()));
        map.insert(
            "dataClassification".into(),
            AttributeValue::from(self.data_classification.as_str()),
        );
        map.insert(
            "ownerDepartment".into(),
            AttributeValue::from(self.owner_department.clone()),
        );
        map.insert(
            "ownerLocation".into(),
            AttributeValue::from(self.owner_location.clone()),
        );
        map.insert(
            "documentState".into(),
            AttributeValue::from(self.document_state.clone()),
        );
        map.insert("totalValue".into(), AttributeValue::from(self.total_value));
        for (key, value) in &self.custom {
            map.insert(format!("custom.{key}"), value.clone());
        }
        map
    }
}

// ============================================================================
// Action
// ============================================================================

/// Derived classification of an action, from the static table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClassification {
    /// Coarse category.
    pub category: ActionCategory,
    /// Risk tier.
    pub risk: RiskLevel,
    /// Whether the action needs workflow approval.
    pub requires_approval: bool,
    /// Whether performing the action must be audited.
    pub requires_audit: bool,
    /// Canonical action type ("read", "write", "approve", ...).
    pub action_type: String,
    /// Whether this is an administrative action.
    pub is_admin: bool,
}

/// The requested operation plus its derived classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action name as requested.
    pub name: String,
    /// Classification from the static table.
    pub classification: ActionClassification,
}

impl Action {
    /// Flattens the action into the `action.*` attribute namespace.
    pub fn to_attributes(&self) -> AttributeMap {
        let c = &self.classification;
        let mut map = AttributeMap::new();
        map.insert("name".into(), AttributeValue::from(self.name.clone()));
        map.insert("type".into(), AttributeValue::from(c.action_type.clone()));
        map.insert("category".into(), AttributeValue::from(c.category.as_str()));
        map.insert("riskLevel".into(), AttributeValue::from(c.risk.as_str()));
        map.insert("requiresApproval".into(), AttributeValue::Bool(c.requires_approval));
        map.insert("auditRequired".into(), AttributeValue::Bool(c.requires_audit));
        map.insert("isRead".into(), AttributeValue::Bool(c.action_type == "read"));
        map.insert("isWrite".into(), AttributeValue::Bool(c.action_type == "write"));
        map.insert("isApproval".into(), AttributeValue::Bool(c.action_type == "approve"));
        map.insert("isAdmin".into(), AttributeValue::Bool(c.is_admin));
        map
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Caller-supplied ambient context for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Source IP address.
    pub ip_address: Option<String>,
    /// User agent string.
    pub user_agent: Option<String>,
    /// Session id.
    pub session_id: Option<String>,
    /// Device type hint ("desktop", "mobile", "server").
    pub device_type: Option<String>,
    /// Extra attributes; these override resolver defaults key-for-key.
    pub additional: HashMap<String, AttributeValue>,
}

/// Ambient attributes of the request: the shortest-lived snapshot, always
/// freshly derived from the request timestamp plus caller context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Request timestamp; also the PDP's notion of "now".
    pub timestamp: DateTime<Utc>,
    /// Whether the timestamp falls in business hours (Mon-Fri 09:00-17:00 UTC).
    pub is_business_hours: bool,
    /// Source IP address.
    pub ip_address: Option<String>,
    /// User agent string.
    pub user_agent: Option<String>,
    /// Session id.
    pub session_id: Option<String>,
    /// Device type hint.
    pub device_type: Option<String>,
    /// Risk score in [0, 1], higher is riskier.
    pub risk_score: f64,
    /// Trust level derived from the risk score.
    pub trust_level: TrustLevel,
    /// Caller-supplied extra attributes.
    pub extra: HashMap<String, AttributeValue>,
}

impl Environment {
    /// Builds the per-minute base environment with no caller context.
    pub fn base(timestamp: DateTime<Utc>) -> Self {
        let is_business_hours = is_business_hours(timestamp);
        let risk_score = risk_score(is_business_hours, None, None);
        Self {
            timestamp,
            is_business_hours,
            ip_address: None,
            user_agent: None,
            session_id: None,
            device_type: None,
            risk_score,
            trust_level: trust_level(risk_score),
            extra: HashMap::new(),
        }
    }

    /// Overlays caller context onto a base environment, recomputing the risk
    /// score and trust level from the context-bearing signals.
    pub fn with_context(mut self, context: &RequestContext) -> Self {
        self.ip_address = context.ip_address.clone();
        self.user_agent = context.user_agent.clone();
        self.session_id = context.session_id.clone();
        self.device_type = context.device_type.clone();
        self.risk_score = risk_score(
            self.is_business_hours,
            context.ip_address.as_deref(),
            context.user_agent.as_deref(),
        );
        self.trust_level = trust_level(self.risk_score);
        self.extra = context.additional.clone();
        self
    }

    /// Flattens the environment into the `environment.*` attribute namespace.
    ///
    /// Caller-supplied `extra` keys are inserted last and override defaults.
    pub fn to_attributes(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert(
            "timestamp".into(),
            AttributeValue::from(self.timestamp.to_rfc3339()),
        );
        map.insert(
            "timeOfDay".into(),
            AttributeValue::Int(i64::from(self.timestamp.hour())),
        );
        map.insert(
            "dayOfWeek".into(),
            AttributeValue::from(weekday_name(self.timestamp.weekday())),
        );
        map.insert(
            "isWeekend".into(),
            AttributeValue::Bool(matches!(
                self.timestamp.weekday(),
                Weekday::Sat | Weekday::Sun
            )),
        );
        map.insert(
            "isBusinessHours".into(),
            AttributeValue::Bool(self.is_business_hours),
        );
        map.insert("ipAddress".into(), AttributeValue::from(self.ip_address.clone()));
        map.insert("userAgent".into(), AttributeValue::from(self.user_agent.clone()));
        map.insert("sessionId".into(), AttributeValue::from(self.session_id.clone()));
        map.insert("deviceType".into(), AttributeValue::from(self.device_type.clone()));
        map.insert("riskScore".into(), AttributeValue::Float(self.risk_score));
        map.insert(
            "trustLevel".into(),
            AttributeValue::from(self.trust_level.as_str()),
        );
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

/// Business hours: Monday-Friday, 09:00 inclusive to 17:00 exclusive, UTC.
pub fn is_business_hours(ts: DateTime<Utc>) -> bool {
    let weekday = !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
    weekday && (9..17).contains(&ts.hour())
}

/// Lowercase weekday name for attribute maps.
fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Additive risk score over network, time, and automation signals, capped at 1.
fn risk_score(business_hours: bool, ip: Option<&str>, user_agent: Option<&str>) -> f64 {
    let mut score: f64 = 0.0;
    if let Some(ip) = ip {
        if ip.starts_with("10.") || ip.starts_with("192.168.") || ip.starts_with("127.") {
            score += 0.1;
        } else {
            score += 0.3;
        }
    }
    if !business_hours {
        score += 0.2;
    }
    if user_agent.is_some_and(|ua| ua.to_ascii_lowercase().contains("bot")) {
        score += 0.5;
    }
    score.min(1.0)
}

/// Maps a risk score onto a trust level.
fn trust_level(score: f64) -> TrustLevel {
    if score < 0.3 {
        TrustLevel::High
    } else if score < 0.6 {
        TrustLevel::Medium
    } else {
        TrustLevel::Low
    }
}

// ============================================================================
// Composite
// ============================================================================

/// The four snapshots for one request, assembled by `resolve_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedAttributes {
    /// The requesting user.
    pub subject: Subject,
    /// The resource being accessed.
    pub resource: Resource,
    /// The requested operation.
    pub action: Action,
    /// Ambient request context.
    pub environment: Environment,
}

// ============================================================================
// Tests
// ============================================================================
