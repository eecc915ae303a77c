//! Recursive-descent parser for ClickHouse type signatures.
//!
//! Grammar (whitespace only separates tokens):
//!
//! ```text
//! Type     := Name [ '(' Arg { ',' Arg } ')' ]
//! Arg      := [FieldName] Type | Literal [ '=' Number ]
//! Literal  := Number | 'quoted string'
//! ```
//!
//! Literal arguments keep their source text verbatim (quotes included), so a consumer such as
//! the `Enum8` descriptor can strip quotes and split `'a' = 1` pairs itself.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Deepest nesting accepted before the parser gives up.
///
/// Real server signatures are far shallower; the bound keeps hostile input from exhausting the
/// stack.
pub const MAX_SIGNATURE_DEPTH: usize = 256;

/// A syntax error in a type signature. No partial tree is ever returned alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type signature {input:?} at byte {position}: {message}")]
pub struct ParseError {
    pub input: String,
    pub position: usize,
    pub message: String,
}

/// One node of a parsed signature.
///
/// `value` is a type name (`Array`), a bare identifier argument (`any` in
/// `SimpleAggregateFunction(any, UInt64)`), or the verbatim text of a literal argument
/// (`'Europe/Berlin'`, `18`, `'a' = 1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxTreeNode {
    pub value: String,
    /// Element name for named tuple/nested elements (`a` in `Tuple(a Int32)`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxTreeNode>,
}

impl SyntaxTreeNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            field_name: None,
            children: Vec::new(),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// The only child of a one-argument type such as `Array(T)` or `Nullable(T)`.
    pub fn single_child(&self) -> Option<&SyntaxTreeNode> {
        match self.children.as_slice() {
            [child] => Some(child),
            _ => None,
        }
    }

    /// True when the node is a quoted string literal.
    pub fn is_string_literal(&self) -> bool {
        self.children.is_empty() && self.value.len() >= 2 && self.value.starts_with('\'')
    }

    /// The literal with surrounding quotes removed and escapes resolved.
    pub fn unquoted(&self) -> String {
        unquote(&self.value)
    }
}

impl fmt::Display for SyntaxTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.field_name {
            write!(f, "{name} ")?;
        }
        f.write_str(&self.value)?;
        if !self.children.is_empty() {
            f.write_str("(")?;
            for (idx, child) in self.children.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Strip one pair of surrounding single quotes and resolve `\x` and `''` escapes.
///
/// Text that is not quoted is returned trimmed but otherwise unchanged.
pub fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    let Some(inner) = raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    else {
        return raw.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            other => out.push(other),
        }
    }
    out
}

/// Quote a string for inclusion in a signature (`it's` -> `'it\'s'`).
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Parse a type signature into a syntax tree.
pub fn parse_signature(input: &str) -> Result<SyntaxTreeNode, ParseError> {
    let mut parser = Parser::new(input)?;
    if parser.lookahead.kind == TokenKind::Eof {
        return Err(parser.error_at(0, "empty type signature"));
    }
    let node = parser.parse_type(0)?;
    if parser.lookahead.kind != TokenKind::Eof {
        return Err(parser.error_at(
            parser.lookahead.start,
            format!("unexpected trailing {}", parser.lookahead.kind.describe()),
        ));
    }
    Ok(node)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Identifier,
    Number,
    String,
    LParen,
    RParen,
    Comma,
    Equals,
    Eof,
}

impl TokenKind {
    fn describe(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string literal",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Equals => "'='",
            TokenKind::Eof => "end of input",
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, position: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            input: self.input.to_string(),
            position,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(b) = self.peek_byte() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                start,
                end: start,
            });
        };

        let kind = match b {
            b'(' => {
                self.pos += 1;
                TokenKind::LParen
            }
            b')' => {
                self.pos += 1;
                TokenKind::RParen
            }
            b',' => {
                self.pos += 1;
                TokenKind::Comma
            }
            b'=' => {
                self.pos += 1;
                TokenKind::Equals
            }
            b'\'' => {
                self.pos += 1;
                loop {
                    match self.peek_byte() {
                        None => return Err(self.error(start, "unterminated string literal")),
                        Some(b'\\') => {
                            // Skip the escaped byte; a trailing backslash hits the `None` arm.
                            self.pos += 1;
                            if self.peek_byte().is_some() {
                                self.pos += 1;
                            }
                        }
                        Some(b'\'') => {
                            self.pos += 1;
                            if self.peek_byte() == Some(b'\'') {
                                self.pos += 1;
                                continue;
                            }
                            break;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
                TokenKind::String
            }
            b'`' => {
                // Backquoted identifiers appear as field names in named tuples.
                self.pos += 1;
                loop {
                    match self.peek_byte() {
                        None => return Err(self.error(start, "unterminated quoted identifier")),
                        Some(b'`') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => self.pos += 1,
                    }
                }
                TokenKind::Identifier
            }
            b'-' | b'+' | b'0'..=b'9' => {
                self.pos += 1;
                while matches!(self.peek_byte(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
                if self.pos - start == 1 && !b.is_ascii_digit() {
                    return Err(self.error(start, "expected digits after sign"));
                }
                TokenKind::Number
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric() || b == b'_')
                {
                    self.pos += 1;
                }
                TokenKind::Identifier
            }
            _ => {
                let ch = self.input[start..].chars().next().unwrap_or('\u{FFFD}');
                return Err(self.error(start, format!("unexpected character {ch:?}")));
            }
        };

        Ok(Token {
            kind,
            start,
            end: self.pos,
        })
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(input);
        let lookahead = lexer.next_token()?;
        Ok(Self { lexer, lookahead })
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> ParseError {
        self.lexer.error(position, message)
    }

    fn text(&self, token: Token) -> &'a str {
        &self.lexer.input[token.start..token.end]
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.lookahead.kind == kind {
            self.bump()
        } else {
            Err(self.error_at(
                self.lookahead.start,
                format!(
                    "expected {}, found {}",
                    kind.describe(),
                    self.lookahead.kind.describe()
                ),
            ))
        }
    }

    fn parse_type(&mut self, depth: usize) -> Result<SyntaxTreeNode, ParseError> {
        if depth > MAX_SIGNATURE_DEPTH {
            return Err(self.error_at(self.lookahead.start, "type signature nested too deeply"));
        }
        let name = self.expect(TokenKind::Identifier)?;
        let mut node = SyntaxTreeNode::leaf(identifier_text(self.text(name)));
        if node.value.is_empty() {
            return Err(self.error_at(name.start, "empty type name"));
        }

        if self.lookahead.kind == TokenKind::LParen {
            let open = self.bump()?;
            if self.lookahead.kind == TokenKind::RParen {
                // `Tuple()` is legal and means "no elements".
                self.bump()?;
                return Ok(node);
            }
            loop {
                node.children.push(self.parse_argument(depth + 1)?);
                match self.lookahead.kind {
                    TokenKind::Comma => {
                        self.bump()?;
                    }
                    TokenKind::RParen => {
                        self.bump()?;
                        break;
                    }
                    TokenKind::Eof => {
                        return Err(self.error_at(open.start, "unbalanced parentheses"));
                    }
                    other => {
                        return Err(self.error_at(
                            self.lookahead.start,
                            format!("expected ',' or ')', found {}", other.describe()),
                        ));
                    }
                }
            }
        }
        Ok(node)
    }

    fn parse_argument(&mut self, depth: usize) -> Result<SyntaxTreeNode, ParseError> {
        match self.lookahead.kind {
            TokenKind::Number | TokenKind::String => {
                let first = self.bump()?;
                let mut end = first.end;
                if self.lookahead.kind == TokenKind::Equals {
                    // Enum pair: `'name' = code`.
                    self.bump()?;
                    let code = self.expect(TokenKind::Number)?;
                    end = code.end;
                }
                Ok(SyntaxTreeNode::leaf(&self.lexer.input[first.start..end]))
            }
            TokenKind::Identifier => {
                // `name Type` is a named element; a lone identifier is a type (or bare word).
                let next_is_identifier = {
                    let mut probe = Lexer {
                        input: self.lexer.input,
                        pos: self.lexer.pos,
                    };
                    probe.next_token()?.kind == TokenKind::Identifier
                };
                if next_is_identifier {
                    let field = self.bump()?;
                    let field_name = identifier_text(self.text(field));
                    let mut node = self.parse_type(depth)?;
                    node.field_name = Some(field_name);
                    Ok(node)
                } else {
                    self.parse_type(depth)
                }
            }
            TokenKind::RParen | TokenKind::Comma => Err(self.error_at(
                self.lookahead.start,
                format!("empty argument before {}", self.lookahead.kind.describe()),
            )),
            TokenKind::Eof => Err(self.error_at(self.lookahead.start, "unbalanced parentheses")),
            other => Err(self.error_at(
                self.lookahead.start,
                format!("unexpected {} in argument list", other.describe()),
            )),
        }
    }
}

fn identifier_text(raw: &str) -> String {
    raw.strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .unwrap_or(raw)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_bare_name() {
        let node = parse_signature("  Int32 ").unwrap();
        assert_eq!(node, SyntaxTreeNode::leaf("Int32"));
    }

    #[test]
    fn nested_commas_do_not_split_outer_list() {
        let node = parse_signature("Tuple(Decimal(18, 4), Map(String, Array(Int8)))").unwrap();
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].children.len(), 2);
        assert_eq!(node.children[1].children[1].value, "Array");
    }

    #[test]
    fn literals_keep_quotes() {
        let node = parse_signature("DateTime64(3, 'Europe/Berlin')").unwrap();
        assert_eq!(node.children[0].value, "3");
        assert_eq!(node.children[1].value, "'Europe/Berlin'");
        assert!(node.children[1].is_string_literal());
        assert_eq!(node.children[1].unquoted(), "Europe/Berlin");
    }

    #[test]
    fn enum_pairs_are_kept_verbatim() {
        let node = parse_signature("Enum8('a' = 1, 'b'=-2)").unwrap();
        assert_eq!(node.children[0].value, "'a' = 1");
        assert_eq!(node.children[1].value, "'b'=-2");
    }

    #[test]
    fn named_elements_record_field_name() {
        let node = parse_signature("Nested(id UInt64, `tags` Array(String))").unwrap();
        assert_eq!(node.children[0].field_name.as_deref(), Some("id"));
        assert_eq!(node.children[1].field_name.as_deref(), Some("tags"));
        assert_eq!(node.children[1].value, "Array");
    }

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote(r"'it\'s'"), "it's");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(quote("it's"), r"'it\'s'");
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in [
            "",
            "   ",
            "Array(",
            "Array(Int32",
            "Array(Int32))",
            "Array()Int32",
            "(Int32)",
            "Tuple(Int32,)",
            "Tuple(,Int32)",
            "Enum8('a = 1)",
            "Decimal(18 4)",
        ] {
            assert!(parse_signature(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn error_reports_position() {
        let err = parse_signature("Array(Int32").unwrap_err();
        assert_eq!(err.input, "Array(Int32");
        assert_eq!(err.position, 5);
    }

    #[test]
    fn depth_is_bounded() {
        let deep = format!("{}Int8{}", "Array(".repeat(300), ")".repeat(300));
        assert!(parse_signature(&deep).is_err());
        let ok = format!("{}Int8{}", "Array(".repeat(50), ")".repeat(50));
        assert!(parse_signature(&ok).is_ok());
    }
}
