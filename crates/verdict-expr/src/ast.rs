//! Expression tree and recursive-descent parser.
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! expr       := or
//! or         := and ('||' and)*
//! and        := equality ('&&' equality)*
//! equality   := relational (('==' | '!=') relational)*
//! relational := unary (('<' | '<=' | '>' | '>=') unary)*
//! unary      := '!' unary | primary
//! primary    := literal | attribute | call | '(' expr ')'
//! attribute  := namespace '.' ident ('.' ident)*
//! call       := ident '(' (expr (',' expr)*)? ')'
//! ```
//!
//! Condition text is data, never code: the parser builds a tree that the
//! evaluator walks against the attribute context. Nothing is compiled or
//! handed to a host-language interpreter.

use verdict_types::AttributeValue;

use crate::error::ExpressionError;
use crate::token::{Token, TokenKind, tokenize};

// ============================================================================
// AST
// ============================================================================

/// One of the four attribute namespaces a condition may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// The requesting user.
    Subject,
    /// The thing being accessed.
    Resource,
    /// The requested operation.
    Action,
    /// Ambient request context.
    Environment,
}

impl Namespace {
    /// Parses a namespace root identifier.
    fn from_ident(name: &str) -> Option<Self> {
        match name {
            "subject" => Some(Self::Subject),
            "resource" => Some(Self::Resource),
            "action" => Some(Self::Action),
            "environment" => Some(Self::Environment),
            _ => None,
        }
    }

    /// Namespace root as written in policy text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Resource => "resource",
            Self::Action => "action",
            Self::Environment => "environment",
        }
    }
}

/// Binary operators of the condition grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl BinaryOp {
    /// Operator text for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "&&",
            Self::Or => "||",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(AttributeValue),
    /// Dotted attribute access, e.g. `resource.dataClassification`.
    Attribute {
        /// Namespace root.
        namespace: Namespace,
        /// Dotted path inside the namespace, joined for flat-map lookup.
        path: String,
    },
    /// A predicate call, e.g. `hasRole('admin')`. Names are validated against
    /// the fixed predicate set at evaluation time.
    Call {
        /// Predicate name as written.
        name: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

/// Parses condition source text into an expression tree.
///
/// # Errors
///
/// [`ExpressionError::Syntax`] for lexical/structural errors,
/// [`ExpressionError::UnknownIdentifier`] for bare identifiers that are
/// neither a namespace root nor a call.
pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(ExpressionError::Syntax {
            offset: tok.offset,
            message: "unexpected trailing input".to_string(),
        });
    }
    Ok(expr)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), ExpressionError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error_here(&format!("expected {what}")))
        }
    }

    fn error_here(&self, message: &str) -> ExpressionError {
        let offset = self.peek().map_or_else(|| self.end_offset(), |t| t.offset);
        ExpressionError::Syntax { offset, message: message.to_string() }
    }

    fn end_offset(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.offset + 1)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary { op: BinaryOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary { op: BinaryOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = if self.eat(&TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.eat(&TokenKind::NotEq) {
                BinaryOp::Ne
            } else {
                break;
            };
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = if self.eat(&TokenKind::Le) {
                BinaryOp::Le
            } else if self.eat(&TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.eat(&TokenKind::Ge) {
                BinaryOp::Ge
            } else if self.eat(&TokenKind::Gt) {
                BinaryOp::Gt
            } else {
                break;
            };
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&TokenKind::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let Some(tok) = self.advance() else {
            return Err(ExpressionError::Syntax {
                offset: self.end_offset(),
                message: "unexpected end of expression".to_string(),
            });
        };

        match tok.kind {
            TokenKind::Int(i) => Ok(Expr::Literal(AttributeValue::Int(i))),
            TokenKind::Float(f) => Ok(Expr::Literal(AttributeValue::Float(f))),
            TokenKind::Str(s) => Ok(Expr::Literal(AttributeValue::Str(s))),
            TokenKind::True => Ok(Expr::Literal(AttributeValue::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(AttributeValue::Bool(false))),
            TokenKind::Null => Ok(Expr::Literal(AttributeValue::Null)),
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.parse_ident(name),
            _ => Err(ExpressionError::Syntax {
                offset: tok.offset,
                message: "expected a literal, attribute, predicate, or '('".to_string(),
            }),
        }
    }

    /// Disambiguates an identifier: call, attribute access, or error.
    fn parse_ident(&mut self, name: String) -> Result<Expr, ExpressionError> {
        if self.eat(&TokenKind::LParen) {
            let mut args = Vec::new();
            if !self.eat(&TokenKind::RParen) {
                loop {
                    args.push(self.parse_or()?);
                    if self.eat(&TokenKind::RParen) {
                        break;
                    }
                    self.expect(&TokenKind::Comma, "',' or ')'")?;
                }
            }
            return Ok(Expr::Call { name, args });
        }

        if let Some(namespace) = Namespace::from_ident(&name) {
            self.expect(&TokenKind::Dot, "'.' after namespace")?;
            let mut segments = vec![self.expect_ident()?];
            while self.eat(&TokenKind::Dot) {
                segments.push(self.expect_ident()?);
            }
            return Ok(Expr::Attribute { namespace, path: segments.join(".") });
        }

        Err(ExpressionError::UnknownIdentifier(name))
    }

    fn expect_ident(&mut self) -> Result<String, ExpressionError> {
        match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::Ident(name)) => {
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here("expected attribute name")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
