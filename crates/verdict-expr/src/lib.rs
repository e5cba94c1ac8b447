//! # verdict-expr: Condition expression language
//!
//! Parses and evaluates the boolean condition expressions attached to policy
//! rules. Policy text is untrusted input authored by non-engineers, so the
//! language is a closed grammar over a fixed allow-list:
//!
//! - Dotted attribute access into the four namespaces
//!   (`subject.*`, `resource.*`, `action.*`, `environment.*`)
//! - Equality and relational comparisons, `&&`, `||`, `!`, parentheses
//! - String/number/boolean/null literals
//! - A fixed predicate set: `hasRole`, `hasPermission`, `inDepartment`,
//!   `resourceType`, `actionType`, `isWorkingHours`
//!
//! ## Fail-closed contract
//!
//! [`evaluate`] never panics and never propagates an error: malformed syntax,
//! unknown identifiers/predicates, and type mismatches all yield
//! `matched = false` plus a diagnostic. A defective rule degrades to a
//! non-match; it cannot crash a request or grant access.
//!
//! ## Examples
//!
//! ```
//! use verdict_expr::{EvalContext, evaluate};
//! use verdict_types::{AttributeMap, AttributeValue};
//!
//! let subject = AttributeMap::from([
//!     ("roles".to_string(), AttributeValue::from(vec!["staff"])),
//! ]);
//! let empty = AttributeMap::new();
//! let ctx = EvalContext::new(&subject, &empty, &empty, &empty);
//!
//! assert!(evaluate("hasRole('staff')", &ctx).matched);
//! assert!(!evaluate("hasRole('admin')", &ctx).matched);
//!
//! // Malformed text is a non-match, not a crash.
//! let outcome = evaluate("hasRole('staff'", &ctx);
//! assert!(!outcome.matched);
//! assert!(outcome.diagnostic.is_some());
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod token;

pub use ast::{BinaryOp, Expr, Namespace, parse};
pub use error::ExpressionError;
pub use eval::{ConditionOutcome, EvalContext, checked_evaluate, evaluate};
