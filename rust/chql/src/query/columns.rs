//! `$columns(...)` pivots grouped rows into one array of (category,
//! value) pairs per time bucket.

use super::{inner_select, split_tail};
use crate::{
    error::{QueryError, Result},
    parser::ParsedQuery,
};

pub fn build(query: &str, ast: &ParsedQuery) -> Result<String> {
    if ast.macro_name.as_deref() != Some("columns") {
        return Ok(query.to_string());
    }
    body(ast, "$columns")
}

/// The two-level pivot query. `$rateColumns` wraps this exact text in a
/// rate projection, so any whitespace change here is a contract change
/// for both macros.
pub(super) fn body(ast: &ParsedQuery, macro_name: &str) -> Result<String> {
    let [pivot, value] = ast.args.as_slice() else {
        return Err(QueryError::MalformedArgs(format!(
            "{macro_name} expects exactly two arguments: a pivot expression and a value expression"
        )));
    };

    let clauses = split_tail(&ast.tail);
    let keys = format!("t, {}", pivot.key());
    let inner = inner_select(
        &[pivot.text.clone(), value.text.clone()],
        &clauses,
        &keys,
        &keys,
    );

    Ok(format!(
        "SELECT t, groupArray(({pivot}, {value})) AS groupArr FROM ( {inner}) GROUP BY t ORDER BY t",
        pivot = pivot.key(),
        value = value.key(),
    ))
}
