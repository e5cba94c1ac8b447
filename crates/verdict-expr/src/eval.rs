//! Tree-walking evaluator for condition expressions.
//!
//! The evaluator walks a parsed [`Expr`] against the four attribute
//! namespaces. It is total: every failure mode (unknown attribute, unknown
//! predicate, type mismatch) is an [`ExpressionError`], and the top-level
//! [`evaluate`] entry point converts any error into a non-match with a
//! diagnostic. Policy text can never crash a request.

use verdict_types::{AttributeMap, AttributeValue};

use crate::ast::{BinaryOp, Expr, Namespace, parse};
use crate::error::ExpressionError;

// ============================================================================
// Context
// ============================================================================

/// The four attribute namespaces a condition evaluates against.
///
/// Predicates read well-known keys:
/// - `subject.roles` / `subject.permissions` (lists), `subject.department`
/// - `resource.type`
/// - `action.name`, `action.type`
/// - `environment.isBusinessHours`
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Subject (user) attributes.
    pub subject: &'a AttributeMap,
    /// Resource attributes.
    pub resource: &'a AttributeMap,
    /// Action attributes.
    pub action: &'a AttributeMap,
    /// Environment attributes.
    pub environment: &'a AttributeMap,
}

impl<'a> EvalContext<'a> {
    /// Creates a context over the four resolved attribute maps.
    pub fn new(
        subject: &'a AttributeMap,
        resource: &'a AttributeMap,
        action: &'a AttributeMap,
        environment: &'a AttributeMap,
    ) -> Self {
        Self { subject, resource, action, environment }
    }

    fn namespace(&self, ns: Namespace) -> &AttributeMap {
        match ns {
            Namespace::Subject => self.subject,
            Namespace::Resource => self.resource,
            Namespace::Action => self.action,
            Namespace::Environment => self.environment,
        }
    }

    fn lookup(&self, ns: Namespace, path: &str) -> Result<AttributeValue, ExpressionError> {
        self.namespace(ns).get(path).cloned().ok_or_else(|| {
            ExpressionError::UnknownAttribute { namespace: ns.as_str(), path: path.to_string() }
        })
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// The fail-closed result of evaluating one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    /// Whether the condition evaluated to `true`.
    pub matched: bool,
    /// Diagnostic when the condition errored and was treated as a non-match.
    pub diagnostic: Option<String>,
}

impl ConditionOutcome {
    fn matched(matched: bool) -> Self {
        Self { matched, diagnostic: None }
    }

    fn failed(err: &ExpressionError) -> Self {
        Self { matched: false, diagnostic: Some(err.to_string()) }
    }
}

/// Evaluates a condition expression against the attribute context.
///
/// Never panics and never returns an error: malformed or unresolvable
/// conditions produce `matched = false` with a diagnostic, so a bad rule
/// degrades to a non-match instead of failing the request.
pub fn evaluate(source: &str, ctx: &EvalContext<'_>) -> ConditionOutcome {
    match checked_evaluate(source, ctx) {
        Ok(matched) => ConditionOutcome::matched(matched),
        Err(err) => {
            tracing::debug!(condition = source, error = %err, "condition treated as non-match");
            ConditionOutcome::failed(&err)
        }
    }
}

/// Evaluates a condition, surfacing the error instead of absorbing it.
///
/// Used by policy validation tooling; the decision path goes through
/// [`evaluate`].
pub fn checked_evaluate(source: &str, ctx: &EvalContext<'_>) -> Result<bool, ExpressionError> {
    let expr = parse(source)?;
    match eval_expr(&expr, ctx)? {
        AttributeValue::Bool(b) => Ok(b),
        other => Err(ExpressionError::NonBooleanCondition(other.type_name())),
    }
}

// ============================================================================
// Walker
// ============================================================================

/// Evaluates a parsed expression to a value.
pub fn eval_expr(expr: &Expr, ctx: &EvalContext<'_>) -> Result<AttributeValue, ExpressionError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Attribute { namespace, path } => ctx.lookup(*namespace, path),
        Expr::Call { name, args } => eval_predicate(name, args, ctx),
        Expr::Not(inner) => match eval_expr(inner, ctx)? {
            AttributeValue::Bool(b) => Ok(AttributeValue::Bool(!b)),
            other => Err(ExpressionError::TypeMismatch {
                op: "!",
                lhs: other.type_name(),
                rhs: "-",
            }),
        },
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, ctx),
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<AttributeValue, ExpressionError> {
    // Boolean combinators short-circuit; both operands must be booleans.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let left = expect_bool(op, lhs, ctx)?;
        let result = match op {
            BinaryOp::And => left && expect_bool(op, rhs, ctx)?,
            BinaryOp::Or => left || expect_bool(op, rhs, ctx)?,
            _ => unreachable!(),
        };
        return Ok(AttributeValue::Bool(result));
    }

    let left = eval_expr(lhs, ctx)?;
    let right = eval_expr(rhs, ctx)?;

    let result = match op {
        BinaryOp::Eq => left.loosely_equals(&right),
        BinaryOp::Ne => !left.loosely_equals(&right),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = left.compare(&right).ok_or(ExpressionError::TypeMismatch {
                op: op.as_str(),
                lhs: left.type_name(),
                rhs: right.type_name(),
            })?;
            match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            }
        }
        BinaryOp::And | BinaryOp::Or => unreachable!(),
    };
    Ok(AttributeValue::Bool(result))
}

fn expect_bool(
    op: BinaryOp,
    expr: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<bool, ExpressionError> {
    match eval_expr(expr, ctx)? {
        AttributeValue::Bool(b) => Ok(b),
        other => Err(ExpressionError::TypeMismatch {
            op: op.as_str(),
            lhs: other.type_name(),
            rhs: "bool",
        }),
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Evaluates one of the fixed predicates. Anything outside the allow-list is
/// an `UnknownPredicate` error (and therefore a non-match).
fn eval_predicate(
    name: &str,
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> Result<AttributeValue, ExpressionError> {
    match name {
        "hasRole" => {
            let role = string_arg(name, args, ctx)?;
            let roles = ctx.subject.get("roles").cloned().unwrap_or(AttributeValue::Null);
            Ok(AttributeValue::Bool(roles.contains(&AttributeValue::Str(role))))
        }
        "hasPermission" => {
            let perm = string_arg(name, args, ctx)?;
            let perms = ctx
                .subject
                .get("permissions")
                .cloned()
                .unwrap_or(AttributeValue::Null);
            Ok(AttributeValue::Bool(perms.contains(&AttributeValue::Str(perm))))
        }
        "inDepartment" => {
            let dept = string_arg(name, args, ctx)?;
            let direct = ctx
                .subject
                .get("department")
                .and_then(AttributeValue::as_str)
                .is_some_and(|d| d == dept);
            let member = ctx
                .subject
                .get("departments")
                .is_some_and(|ds| ds.contains(&AttributeValue::Str(dept.clone())));
            Ok(AttributeValue::Bool(direct || member))
        }
        "resourceType" => {
            let wanted = string_arg(name, args, ctx)?;
            let actual = ctx.resource.get("type").and_then(AttributeValue::as_str);
            Ok(AttributeValue::Bool(actual.is_some_and(|t| t == wanted)))
        }
        "actionType" => {
            // Matches either the action's raw name or its derived type.
            let wanted = string_arg(name, args, ctx)?;
            let matches = ["name", "type"].iter().any(|key| {
                ctx.action
                    .get(*key)
                    .and_then(AttributeValue::as_str)
                    .is_some_and(|v| v == wanted)
            });
            Ok(AttributeValue::Bool(matches))
        }
        "isWorkingHours" => {
            if !args.is_empty() {
                return Err(ExpressionError::BadPredicateArgs {
                    name: name.to_string(),
                    expected: "no arguments",
                    got: format!("{} argument(s)", args.len()),
                });
            }
            let flag = ctx
                .environment
                .get("isBusinessHours")
                .cloned()
                .unwrap_or(AttributeValue::Bool(false));
            Ok(AttributeValue::Bool(flag.is_truthy()))
        }
        _ => Err(ExpressionError::UnknownPredicate(name.to_string())),
    }
}

/// Extracts a single string argument for a predicate.
fn string_arg(
    name: &str,
    args: &[Expr],
    ctx: &EvalContext<'_>,
) -> Result<String, ExpressionError> {
    if args.len() != 1 {
        return Err(ExpressionError::BadPredicateArgs {
            name: name.to_string(),
            expected: "1 string argument",
            got: format!("{} argument(s)", args.len()),
        });
    }
    match eval_expr(&args[0], ctx)? {
        AttributeValue::Str(s) => Ok(s),
        other => Err(ExpressionError::BadPredicateArgs {
            name: name.to_string(),
            expected: "1 string argument",
            got: other.type_name().to_string(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
