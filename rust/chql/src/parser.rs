//! Structural parser turning a tokenized query into a [`ParsedQuery`].
//!
//! Only the macro head of the query is given structure: the name, the
//! argument list with optional aliases, and the raw tail from FROM
//! onward. Argument expressions stay opaque text; deeper SQL parsing is
//! out of scope.

use crate::{
    error::{QueryError, Result},
    scanner::tokenize,
    token::{Token, TokenKind},
};
use serde::Serialize;
use tracing::debug;

/// One macro argument. `text` is the argument as written (alias style
/// preserved), `expression` is the text minus any trailing alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Argument {
    pub text: String,
    pub expression: String,
    pub alias: Option<String>,
}

impl Argument {
    /// Name the generated SQL uses to refer to this argument: the alias
    /// when one was written, the expression itself otherwise.
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.expression)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuery {
    /// Macro name without the leading `$`, or `None` for a query that
    /// does not start with `$name(`.
    pub macro_name: Option<String>,
    pub args: Vec<Argument>,
    /// Everything after the macro's close paren, verbatim and trimmed:
    /// FROM/JOIN/WHERE/GROUP BY/HAVING/ORDER BY clauses. For macro-less
    /// input this is the whole query.
    pub tail: String,
}

impl ParsedQuery {
    fn passthrough(input: &str) -> Self {
        Self {
            macro_name: None,
            args: Vec::new(),
            tail: input.to_string(),
        }
    }
}

/// Parses a query into its macro structure. Queries that do not start
/// with `$name(`, and malformed invocations with no matching close
/// paren, come back as macro-less passthrough. Only a lexical error
/// (unterminated literal) is surfaced.
pub fn parse(input: &str) -> Result<ParsedQuery> {
    let tokens = tokenize(input)?;
    match parse_macro(input, &tokens) {
        Ok(Some(ast)) => Ok(ast),
        Ok(None) => Ok(ParsedQuery::passthrough(input)),
        Err(QueryError::UnbalancedParens) => {
            debug!(query = %input, "unbalanced macro parentheses, treating query as macro-less");
            Ok(ParsedQuery::passthrough(input))
        }
        Err(err) => Err(err),
    }
}

/// Returns `Ok(None)` unless the token stream begins with a placeholder
/// immediately followed by its opening paren.
fn parse_macro(input: &str, tokens: &[Token]) -> Result<Option<ParsedQuery>> {
    let name = match tokens {
        [name, lparen, ..]
            if name.kind == TokenKind::Placeholder
                && lparen.kind == TokenKind::LParen
                && lparen.position == name.end() =>
        {
            name
        }
        _ => return Ok(None),
    };

    let mut depth = 0usize;
    let mut close = None;
    for (idx, tok) in tokens.iter().enumerate().skip(1) {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close.ok_or(QueryError::UnbalancedParens)?;

    Ok(Some(ParsedQuery {
        macro_name: Some(name.text[1..].to_string()),
        args: split_arguments(&tokens[2..close]),
        tail: input[tokens[close].end()..].trim().to_string(),
    }))
}

/// Splits the argument region on commas at the region's own paren depth;
/// commas nested inside argument expressions do not split.
fn split_arguments(region: &[Token]) -> Vec<Argument> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (idx, tok) in region.iter().enumerate() {
        match tok.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                if idx > start {
                    args.push(argument(&region[start..idx]));
                }
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < region.len() {
        args.push(argument(&region[start..]));
    }
    args
}

fn argument(tokens: &[Token]) -> Argument {
    let text = render(tokens);

    if let [head @ .., kw, alias] = tokens {
        if !head.is_empty() && kw.is_keyword("AS") && alias.kind == TokenKind::Identifier {
            return Argument {
                text,
                expression: render(head),
                alias: Some(alias.text.clone()),
            };
        }
    }

    if let [.., prev, alias] = tokens {
        if alias.kind == TokenKind::Identifier && ends_expression(prev) {
            return Argument {
                expression: render(&tokens[..tokens.len() - 1]),
                alias: Some(alias.text.clone()),
                text,
            };
        }
    }

    Argument {
        expression: text.clone(),
        text,
        alias: None,
    }
}

/// A bare trailing identifier is an alias only when the token before it
/// can end an expression on its own; after an operator or keyword it is
/// still part of the expression.
fn ends_expression(tok: &Token) -> bool {
    matches!(
        tok.kind,
        TokenKind::Identifier
            | TokenKind::RParen
            | TokenKind::StringLiteral
            | TokenKind::Number
            | TokenKind::Placeholder
    )
}

/// Re-renders a token slice as expression text with canonical spacing:
/// one space between tokens, none after an opening paren or before a
/// closing one, commas tight on the left, call parens tight on the
/// function name, dots tight on both sides.
fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (idx, tok) in tokens.iter().enumerate() {
        if idx > 0 && needs_space(&tokens[idx - 1], tok) {
            out.push(' ');
        }
        out.push_str(&tok.text);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    if prev.text == "." || next.text == "." {
        return false;
    }
    match next.kind {
        TokenKind::Comma | TokenKind::RParen => false,
        TokenKind::LParen => !matches!(prev.kind, TokenKind::Identifier | TokenKind::Placeholder),
        _ => prev.kind != TokenKind::LParen,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_macro_with_as_aliases() {
        let ast =
            parse("$rate(countIf(Type = 200) AS good, countIf(Type != 200) AS bad) FROM requests")
                .unwrap();
        assert_eq!(ast.macro_name.as_deref(), Some("rate"));
        assert_eq!(ast.args.len(), 2);
        assert_eq!(ast.args[0].expression, "countIf(Type = 200)");
        assert_eq!(ast.args[0].alias.as_deref(), Some("good"));
        assert_eq!(ast.args[0].text, "countIf(Type = 200) AS good");
        assert_eq!(ast.args[1].alias.as_deref(), Some("bad"));
        assert_eq!(ast.tail, "FROM requests");
    }

    #[test]
    fn parses_bare_aliases() {
        let ast = parse("$columns(from_OSName, count(*) c) FROM requests").unwrap();
        assert_eq!(ast.args[0].alias, None);
        assert_eq!(ast.args[0].key(), "from_OSName");
        assert_eq!(ast.args[1].expression, "count(*)");
        assert_eq!(ast.args[1].alias.as_deref(), Some("c"));
        assert_eq!(ast.args[1].text, "count(*) c");
    }

    #[test]
    fn trailing_identifier_after_operator_is_not_an_alias() {
        let ast = parse("$rate(a + b) FROM requests").unwrap();
        assert_eq!(ast.args[0].alias, None);
        assert_eq!(ast.args[0].expression, "a + b");
    }

    #[test]
    fn nested_commas_do_not_split_arguments() {
        let ast = parse("$perSecondColumns(concat('test',type) AS alias, total) FROM t").unwrap();
        assert_eq!(ast.args.len(), 2);
        assert_eq!(ast.args[0].expression, "concat('test', type)");
        assert_eq!(ast.args[0].alias.as_deref(), Some("alias"));
    }

    #[test]
    fn ternary_expressions_stay_opaque() {
        let ast = parse("$rateColumns((AppType = '' ? 'undefined' : AppType) from_type, sum(Hits) from_hits) FROM table_all").unwrap();
        assert_eq!(
            ast.args[0].expression,
            "(AppType = '' ? 'undefined' : AppType)"
        );
        assert_eq!(ast.args[0].alias.as_deref(), Some("from_type"));
        assert_eq!(ast.args[1].text, "sum(Hits) from_hits");
    }

    #[test]
    fn macroless_query_is_passthrough() {
        let input = "SELECT 1 FROM system.one";
        let ast = parse(input).unwrap();
        assert_eq!(ast.macro_name, None);
        assert!(ast.args.is_empty());
        assert_eq!(ast.tail, input);
    }

    #[test]
    fn placeholder_without_call_parens_is_not_a_macro() {
        let ast = parse("$timeFilter AND x = 1").unwrap();
        assert_eq!(ast.macro_name, None);
    }

    #[test]
    fn space_before_paren_is_not_a_macro() {
        let ast = parse("$rate (x) FROM requests").unwrap();
        assert_eq!(ast.macro_name, None);
    }

    #[test]
    fn unbalanced_parens_recover_to_passthrough() {
        let input = "$rate(countIf(Type = 200) FROM requests";
        let ast = parse(input).unwrap();
        assert_eq!(ast.macro_name, None);
        assert_eq!(ast.tail, input);
    }

    #[test]
    fn lex_errors_propagate() {
        let err = parse("$rate(countIf(x = 'open)) FROM requests").unwrap_err();
        assert!(matches!(err, QueryError::UnterminatedLiteral(_)));
    }

    #[test]
    fn empty_argument_list_parses() {
        let ast = parse("$rate() FROM requests").unwrap();
        assert_eq!(ast.macro_name.as_deref(), Some("rate"));
        assert!(ast.args.is_empty());
        assert_eq!(ast.tail, "FROM requests");
    }

    #[test]
    fn tail_keeps_clause_text_verbatim() {
        let ast = parse(
            "$perSecondColumns(x, y)  FROM requests WHERE type IN ('udp', 'tcp') HAVING c > 1",
        )
        .unwrap();
        assert_eq!(
            ast.tail,
            "FROM requests WHERE type IN ('udp', 'tcp') HAVING c > 1"
        );
    }

    #[test]
    fn dotted_names_render_tight() {
        let ast = parse("$rate(sum(t.Hits) AS hits) FROM db.requests").unwrap();
        assert_eq!(ast.args[0].expression, "sum(t.Hits)");
        assert_eq!(ast.tail, "FROM db.requests");
    }

    #[test]
    fn ast_serializes_for_diagnostics() {
        let ast = parse("$rate(x AS total) FROM requests").unwrap();
        let value = serde_json::to_value(&ast).unwrap();
        assert_eq!(value["macro_name"], "rate");
        assert_eq!(value["args"][0]["alias"], "total");
        assert_eq!(value["tail"], "FROM requests");
    }
}
