//! Tokenizer for macro-bearing ClickHouse queries.
//!
//! The scanner is deliberately permissive: any character it does not
//! recognize becomes a best-effort operator token, so exotic SQL
//! expressions (ternaries, custom operators) still round-trip as text.
//! The one fatal condition is an unterminated string literal.

use crate::{
    error::{QueryError, Result},
    token::{is_sql_keyword, Token, TokenKind},
};

pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    Scanner::new(input).run()
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump(ch);
                continue;
            }
            tokens.push(self.next_token(ch)?);
        }
        Ok(tokens)
    }

    fn next_token(&mut self, ch: char) -> Result<Token> {
        let start = self.pos;
        match ch {
            '\'' => self.string_literal(start),
            '$' => Ok(self.placeholder(start)),
            '(' => Ok(self.single(ch, start, TokenKind::LParen)),
            ')' => Ok(self.single(ch, start, TokenKind::RParen)),
            ',' => Ok(self.single(ch, start, TokenKind::Comma)),
            c if c.is_ascii_digit() => Ok(self.number(start)),
            c if is_ident_start(c) => Ok(self.word(start)),
            _ => Ok(self.operator(ch, start)),
        }
    }

    /// Scans a single-quoted literal. `\'` escapes and doubled `''`
    /// stay inside the literal; the quotes are kept in the token text.
    fn string_literal(&mut self, start: usize) -> Result<Token> {
        self.bump('\'');
        while let Some(ch) = self.peek() {
            self.bump(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.bump(escaped);
                    }
                }
                '\'' => {
                    if self.peek() == Some('\'') {
                        self.bump('\'');
                    } else {
                        return Ok(self.token(start, TokenKind::StringLiteral));
                    }
                }
                _ => {}
            }
        }
        Err(QueryError::UnterminatedLiteral(start))
    }

    /// `$` followed by an identifier is one placeholder token; a lone
    /// `$` degrades to an operator.
    fn placeholder(&mut self, start: usize) -> Token {
        self.bump('$');
        if !self.peek().is_some_and(is_ident_start) {
            return self.token(start, TokenKind::Operator);
        }
        while let Some(ch) = self.peek() {
            if !is_ident_continue(ch) {
                break;
            }
            self.bump(ch);
        }
        self.token(start, TokenKind::Placeholder)
    }

    fn number(&mut self, start: usize) -> Token {
        self.digits();
        let mut rest = self.src[self.pos..].chars();
        if rest.next() == Some('.') && rest.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump('.');
            self.digits();
        }
        self.token(start, TokenKind::Number)
    }

    fn digits(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.bump(ch);
        }
    }

    fn word(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if !is_ident_continue(ch) {
                break;
            }
            self.bump(ch);
        }
        let kind = if is_sql_keyword(&self.src[start..self.pos]) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.token(start, kind)
    }

    fn operator(&mut self, ch: char, start: usize) -> Token {
        self.bump(ch);
        if let Some(next) = self.peek() {
            if matches!(
                (ch, next),
                ('!', '=') | ('<', '=') | ('>', '=') | ('<', '>') | ('|', '|')
            ) {
                self.bump(next);
            }
        }
        self.token(start, TokenKind::Operator)
    }

    fn single(&mut self, ch: char, start: usize, kind: TokenKind) -> Token {
        self.bump(ch);
        self.token(start, kind)
    }

    fn token(&self, start: usize, kind: TokenKind) -> Token {
        Token {
            kind,
            text: self.src[start..self.pos].to_string(),
            position: start,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self, ch: char) {
        self.pos += ch.len_utf8();
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
