//! Macro builders expanding `$name(...)` invocations into nested
//! ClickHouse SQL.
//!
//! Every builder is a pure function from (original text, parsed query)
//! to rewritten text. A builder whose macro name does not match returns
//! the input untouched, so unrelated or misspelled macros are never
//! mangled; [`apply`] dispatches through a name registry and falls back
//! to the same passthrough for unknown names.

pub mod columns;
pub mod per_second;
pub mod per_second_columns;
pub mod rate;
pub mod rate_columns;

use crate::{error::Result, parser::ParsedQuery};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

pub type MacroBuilder = fn(&str, &ParsedQuery) -> Result<String>;

static BUILDERS: Lazy<HashMap<&'static str, MacroBuilder>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, MacroBuilder> = HashMap::new();
    map.insert("rate", rate::build as MacroBuilder);
    map.insert("rateColumns", rate_columns::build);
    map.insert("columns", columns::build);
    map.insert("perSecond", per_second::build);
    map.insert("perSecondColumns", per_second_columns::build);
    map
});

/// Expands whichever supported macro the parsed query names; queries
/// with no macro, or an unrecognized one, come back unchanged.
pub fn apply(query: &str, ast: &ParsedQuery) -> Result<String> {
    let Some(name) = ast.macro_name.as_deref() else {
        return Ok(query.to_string());
    };
    match BUILDERS.get(name) {
        Some(build) => {
            debug!(macro_name = name, "expanding query macro");
            build(query, ast)
        }
        None => Ok(query.to_string()),
    }
}

/// Tail clauses a builder reuses: the FROM/JOIN text kept verbatim, the
/// WHERE predicate to conjoin with `$timeFilter`, and any HAVING
/// expression. GROUP BY and ORDER BY text in the tail is superseded by
/// the grouping each macro emits itself.
pub(crate) struct TailClauses {
    pub from: String,
    pub predicate: Option<String>,
    pub having: Option<String>,
}

pub(crate) fn split_tail(tail: &str) -> TailClauses {
    let where_at = find_top_level_keyword(tail, "WHERE");
    let group_at = find_top_level_keyword(tail, "GROUP");
    let having_at = find_top_level_keyword(tail, "HAVING");
    let order_at = find_top_level_keyword(tail, "ORDER");

    let next_after = |at: usize, candidates: &[Option<usize>]| {
        candidates
            .iter()
            .flatten()
            .copied()
            .filter(|&pos| pos > at)
            .min()
            .unwrap_or(tail.len())
    };

    let boundary = [where_at, group_at, having_at, order_at]
        .iter()
        .flatten()
        .copied()
        .min()
        .unwrap_or(tail.len());

    let predicate = where_at
        .map(|at| {
            let end = next_after(at, &[group_at, having_at, order_at]);
            tail[at + "WHERE".len()..end].trim().to_string()
        })
        .filter(|pred| !pred.is_empty());

    let having = having_at
        .map(|at| {
            let end = next_after(at, &[order_at]);
            tail[at + "HAVING".len()..end].trim().to_string()
        })
        .filter(|having| !having.is_empty());

    TailClauses {
        from: tail[..boundary].trim_end().to_string(),
        predicate,
        having,
    }
}

/// First top-level occurrence of a keyword: outside string literals,
/// outside parens, case-insensitive, word-bounded. This is the only
/// structural look the builders take at the tail.
fn find_top_level_keyword(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let w = word.as_bytes();
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => i = skip_literal(bytes, i),
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            _ => {
                if depth == 0
                    && i + w.len() <= bytes.len()
                    && bytes[i..i + w.len()].eq_ignore_ascii_case(w)
                    && (i == 0 || !is_word_byte(bytes[i - 1]))
                    && bytes.get(i + w.len()).map_or(true, |&b| !is_word_byte(b))
                {
                    return Some(i);
                }
                i += 1;
            }
        }
    }
    None
}

/// Advances past a single-quoted literal starting at `start`, honoring
/// `\'` escapes and doubled `''`.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\'' => {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    i
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// The innermost time-bucketed SELECT every macro shares: `$timeSeries`
/// bucketing aliased `t`, the macro arguments, the original FROM/JOIN
/// text, and `$timeFilter` conjoined with any predicate the query
/// already had.
pub(crate) fn inner_select(
    columns: &[String],
    clauses: &TailClauses,
    group_by: &str,
    order_by: &str,
) -> String {
    let mut sql = format!("SELECT $timeSeries AS t, {}", columns.join(", "));
    if !clauses.from.is_empty() {
        sql.push(' ');
        sql.push_str(&clauses.from);
    }
    sql.push_str(" WHERE $timeFilter");
    if let Some(pred) = &clauses.predicate {
        sql.push_str(" AND ");
        sql.push_str(pred);
    }
    sql.push_str(" GROUP BY ");
    sql.push_str(group_by);
    if let Some(having) = &clauses.having {
        sql.push_str(" HAVING ");
        sql.push_str(having);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order_by);
    sql
}

/// Per-second rate of a monotonic counter; `nan` when the counter reset
/// between buckets.
pub(crate) fn guarded_rate(index: usize) -> String {
    format!(
        "if(runningDifference(max_{index}) < 0, nan, runningDifference(max_{index}) / runningDifference(t/1000)) AS max_{index}_Rate"
    )
}
