//! Lexer for condition expressions.
//!
//! Produces a flat token stream for the recursive-descent parser. The token
//! set is deliberately closed: there is no way to express anything beyond
//! attribute access, literals, comparisons, boolean combinators, and calls.

use crate::error::ExpressionError;

/// A single lexical token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Byte offset where the token starts (for diagnostics).
    pub offset: usize,
    /// The token itself.
    pub kind: TokenKind,
}

/// The kinds of token the condition grammar recognizes.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier: namespace root, attribute segment, or predicate name.
    Ident(String),
    /// String literal (single- or double-quoted).
    Str(String),
    /// Integer literal.
    Int(i64),
    /// Floating-point literal.
    Float(f64),
    /// `true` keyword.
    True,
    /// `false` keyword.
    False,
    /// `null` keyword.
    Null,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `.`
    Dot,
    /// `,`
    Comma,
}

/// Tokenizes a condition expression.
///
/// # Errors
///
/// Returns [`ExpressionError::Syntax`] on any character outside the grammar,
/// an unterminated string, or a malformed number.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
            }
            b'(' => {
                tokens.push(Token { offset: start, kind: TokenKind::LParen });
                i += 1;
            }
            b')' => {
                tokens.push(Token { offset: start, kind: TokenKind::RParen });
                i += 1;
            }
            b'.' => {
                tokens.push(Token { offset: start, kind: TokenKind::Dot });
                i += 1;
            }
            b',' => {
                tokens.push(Token { offset: start, kind: TokenKind::Comma });
                i += 1;
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Token { offset: start, kind: TokenKind::AndAnd });
                    i += 2;
                } else {
                    return Err(syntax(start, "expected '&&'"));
                }
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Token { offset: start, kind: TokenKind::OrOr });
                    i += 2;
                } else {
                    return Err(syntax(start, "expected '||'"));
                }
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { offset: start, kind: TokenKind::EqEq });
                    i += 2;
                } else {
                    return Err(syntax(start, "expected '==' (assignment is not supported)"));
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { offset: start, kind: TokenKind::NotEq });
                    i += 2;
                } else {
                    tokens.push(Token { offset: start, kind: TokenKind::Bang });
                    i += 1;
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { offset: start, kind: TokenKind::Le });
                    i += 2;
                } else {
                    tokens.push(Token { offset: start, kind: TokenKind::Lt });
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { offset: start, kind: TokenKind::Ge });
                    i += 2;
                } else {
                    tokens.push(Token { offset: start, kind: TokenKind::Gt });
                    i += 1;
                }
            }
            b'\'' | b'"' => {
                let (literal, next) = lex_string(source, i)?;
                tokens.push(Token { offset: start, kind: TokenKind::Str(literal) });
                i = next;
            }
            b'0'..=b'9' => {
                let (kind, next) = lex_number(source, i)?;
                tokens.push(Token { offset: start, kind });
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                let word = &source[i..end];
                let kind = match word {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Ident(word.to_string()),
                };
                tokens.push(Token { offset: start, kind });
                i = end;
            }
            other => {
                return Err(syntax(start, &format!("unexpected character '{}'", other as char)));
            }
        }
    }

    Ok(tokens)
}

fn syntax(offset: usize, message: &str) -> ExpressionError {
    ExpressionError::Syntax { offset, message: message.to_string() }
}

/// Lexes a quoted string starting at `start`. Supports `\` escapes for the
/// quote character and backslash itself.
fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExpressionError> {
    let bytes = source.as_bytes();
    let quote = bytes[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                match bytes.get(i + 1) {
                    Some(&c) if c == quote || c == b'\\' => {
                        out.push(c as char);
                        i += 2;
                    }
                    _ => return Err(syntax(i, "invalid escape sequence")),
                }
            }
            c if c == quote => return Ok((out, i + 1)),
            _ => {
                // Advance one full UTF-8 character, not one byte.
                let ch = source[i..].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    Err(syntax(start, "unterminated string literal"))
}

/// Lexes an integer or decimal number starting at `start`.
fn lex_number(source: &str, start: usize) -> Result<(TokenKind, usize), ExpressionError> {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    let mut is_float = false;
    if end < bytes.len() && bytes[end] == b'.' && bytes.get(end + 1).is_some_and(u8::is_ascii_digit)
    {
        is_float = true;
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    let text = &source[start..end];
    let kind = if is_float {
        TokenKind::Float(
            text.parse()
                .map_err(|_| syntax(start, "malformed number"))?,
        )
    } else {
        TokenKind::Int(
            text.parse()
                .map_err(|_| syntax(start, "integer out of range"))?,
        )
    };
    Ok((kind, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_and_parens() {
        assert_eq!(
            kinds("(a && b) || !c"),
            vec![
                TokenKind::LParen,
                TokenKind::Ident("a".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("b".into()),
                TokenKind::RParen,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            kinds("x == 1 != 2 < 3 <= 4 > 5 >= 6"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::EqEq,
                TokenKind::Int(1),
                TokenKind::NotEq,
                TokenKind::Int(2),
                TokenKind::Lt,
                TokenKind::Int(3),
                TokenKind::Le,
                TokenKind::Int(4),
                TokenKind::Gt,
                TokenKind::Int(5),
                TokenKind::Ge,
                TokenKind::Int(6),
            ]
        );
    }

    #[test]
    fn test_string_literals_both_quotes() {
        assert_eq!(
            kinds(r#"'restricted' "admin""#),
            vec![
                TokenKind::Str("restricted".into()),
                TokenKind::Str("admin".into()),
            ]
        );
    }

    #[test]
    fn test_string_escape() {
        assert_eq!(kinds(r"'it\'s'"), vec![TokenKind::Str("it's".into())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5"),
            vec![TokenKind::Int(42), TokenKind::Float(3.5)]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("true false null"),
            vec![TokenKind::True, TokenKind::False, TokenKind::Null]
        );
    }

    #[test]
    fn test_dotted_access() {
        assert_eq!(
            kinds("resource.dataClassification"),
            vec![
                TokenKind::Ident("resource".into()),
                TokenKind::Dot,
                TokenKind::Ident("dataClassification".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(matches!(
            tokenize("'oops"),
            Err(ExpressionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_single_ampersand_is_error() {
        assert!(matches!(
            tokenize("a & b"),
            Err(ExpressionError::Syntax { .. })
        ));
    }

    #[test]
    fn test_unexpected_character_is_error() {
        assert!(matches!(
            tokenize("a ; b"),
            Err(ExpressionError::Syntax { .. })
        ));
    }
}
