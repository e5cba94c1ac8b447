//! Static action classification.
//!
//! Action attributes are derived from the action name alone, via a fixed
//! table. Unknown names degrade to the most conservative defaults rather
//! than erroring, so a policy can still target them by name.

use verdict_types::{ActionCategory, RiskLevel};

use crate::attributes::{Action, ActionClassification};

/// Classifies an action name into its derived attributes.
pub fn classify(name: &str) -> Action {
    let classification = match name {
        "read" | "view" | "list" | "search" => ActionClassification {
            category: ActionCategory::Access,
            risk: RiskLevel::Low,
            requires_approval: false,
            requires_audit: false,
            action_type: "read".to_string(),
            is_admin: false,
        },
        "create" | "update" | "modify" => ActionClassification {
            category: ActionCategory::Modification,
            risk: RiskLevel::Medium,
            requires_approval: false,
            requires_audit: true,
            action_type: "write".to_string(),
            is_admin: false,
        },
        "delete" => ActionClassification {
            category: ActionCategory::Destruction,
            risk: RiskLevel::High,
            requires_approval: true,
            requires_audit: true,
            action_type: "write".to_string(),
            is_admin: false,
        },
        "purge" | "configure" | "disable" => ActionClassification {
            category: ActionCategory::Administration,
            risk: RiskLevel::Critical,
            requires_approval: name != "disable",
            requires_audit: true,
            action_type: "admin".to_string(),
            is_admin: true,
        },
        "approve" | "reject" | "authorize" => ActionClassification {
            category: ActionCategory::Approval,
            risk: RiskLevel::High,
            requires_approval: name != "authorize",
            requires_audit: true,
            action_type: "approve".to_string(),
            is_admin: false,
        },
        "submit" | "cancel" => ActionClassification {
            category: ActionCategory::Workflow,
            risk: RiskLevel::Medium,
            requires_approval: false,
            requires_audit: false,
            action_type: "write".to_string(),
            is_admin: false,
        },
        "export" | "import" => ActionClassification {
            category: ActionCategory::DataTransfer,
            risk: RiskLevel::High,
            requires_approval: false,
            requires_audit: true,
            action_type: "write".to_string(),
            is_admin: false,
        },
        // Unknown actions: assume write-shaped and audit them.
        _ => ActionClassification {
            category: ActionCategory::General,
            risk: RiskLevel::Medium,
            requires_approval: false,
            requires_audit: true,
            action_type: "write".to_string(),
            is_admin: false,
        },
    };

    Action {
        name: name.to_string(),
        classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("read", ActionCategory::Access, RiskLevel::Low, "read"; "read is low risk access")]
    #[test_case("search", ActionCategory::Access, RiskLevel::Low, "read"; "search is read shaped")]
    #[test_case("update", ActionCategory::Modification, RiskLevel::Medium, "write"; "update is medium write")]
    #[test_case("delete", ActionCategory::Destruction, RiskLevel::High, "write"; "delete is high risk")]
    #[test_case("purge", ActionCategory::Administration, RiskLevel::Critical, "admin"; "purge is critical admin")]
    #[test_case("approve", ActionCategory::Approval, RiskLevel::High, "approve"; "approve is approval typed")]
    #[test_case("export", ActionCategory::DataTransfer, RiskLevel::High, "write"; "export is data transfer")]
    fn test_classification_table(
        name: &str,
        category: ActionCategory,
        risk: RiskLevel,
        action_type: &str,
    ) {
        let action = classify(name);
        assert_eq!(action.classification.category, category);
        assert_eq!(action.classification.risk, risk);
        assert_eq!(action.classification.action_type, action_type);
    }

    #[test]
    fn test_approval_and_audit_flags() {
        assert!(classify("delete").classification.requires_approval);
        assert!(classify("approve").classification.requires_approval);
        assert!(!classify("read").classification.requires_approval);

        assert!(classify("create").classification.requires_audit);
        assert!(classify("export").classification.requires_audit);
        assert!(!classify("read").classification.requires_audit);
    }

    #[test]
    fn test_unknown_action_gets_conservative_defaults() {
        let action = classify("frobnicate");
        assert_eq!(action.name, "frobnicate");
        assert_eq!(action.classification.risk, RiskLevel::Medium);
        assert!(action.classification.requires_audit);
        assert!(!action.classification.is_admin);
    }
}
