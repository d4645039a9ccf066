//! Lexical token model shared by the scanner and the structural parser.

use serde::Serialize;

/// SQL keywords recognized case-insensitively. Everything else that
/// looks like a word is an identifier.
const KEYWORDS: &[&str] = &[
    "AS", "FROM", "WHERE", "AND", "OR", "GROUP", "BY", "HAVING", "ORDER", "JOIN", "IN", "NOT",
    "ANY", "ALL", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "USING", "ON", "UNION",
    "LIMIT", "SELECT", "DISTINCT", "PREWHERE", "GLOBAL", "BETWEEN", "LIKE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    /// Single-quoted literal, quotes included.
    StringLiteral,
    Operator,
    LParen,
    RParen,
    Comma,
    /// `$identifier`: a macro name or an opaque dashboard placeholder
    /// such as `$timeFilter`. The scanner does not tell them apart.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character in the source text.
    pub position: usize,
}

impl Token {
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text.eq_ignore_ascii_case(word)
    }

    /// Byte offset one past the last character of this token.
    pub fn end(&self) -> usize {
        self.position + self.text.len()
    }
}

pub(crate) fn is_sql_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}
