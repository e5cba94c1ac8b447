//! Expression error types.

use thiserror::Error;

/// Error raised while parsing or evaluating a condition expression.
///
/// Policy text is authored by non-engineers and treated as untrusted input:
/// none of these variants ever escapes the top-level [`crate::evaluate`]
/// entry point. They degrade to a non-matching rule with a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// Malformed source text (unterminated string, stray character, unbalanced parens).
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the condition text.
        offset: usize,
        /// What the lexer or parser expected.
        message: String,
    },

    /// An identifier that is neither a namespace root nor a predicate call.
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Dotted access to an attribute the context does not carry.
    #[error("unknown attribute '{namespace}.{path}'")]
    UnknownAttribute {
        /// Namespace root (subject, resource, action, environment).
        namespace: &'static str,
        /// Dotted remainder of the access.
        path: String,
    },

    /// A call to a predicate outside the fixed allow-list.
    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),

    /// A predicate called with the wrong number or type of arguments.
    #[error("predicate '{name}' expects {expected}, got {got}")]
    BadPredicateArgs {
        /// Predicate name.
        name: String,
        /// Human-readable expectation, e.g. "1 string argument".
        expected: &'static str,
        /// What was actually supplied.
        got: String,
    },

    /// An operator applied to operands it cannot work on.
    #[error("type mismatch: cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        /// Operator text.
        op: &'static str,
        /// Left operand type name.
        lhs: &'static str,
        /// Right operand type name.
        rhs: &'static str,
    },

    /// The whole expression evaluated to a non-boolean value.
    #[error("condition must evaluate to a boolean, got {0}")]
    NonBooleanCondition(&'static str),
}
