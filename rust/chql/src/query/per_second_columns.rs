//! `$perSecondColumns(...)` pivots guarded counter rates: the first
//! argument names the pivot category, the rest are counters.

use super::{guarded_rate, inner_select, split_tail};
use crate::{
    error::{QueryError, Result},
    parser::ParsedQuery,
};

pub fn build(query: &str, ast: &ParsedQuery) -> Result<String> {
    if ast.macro_name.as_deref() != Some("perSecondColumns") {
        return Ok(query.to_string());
    }
    let Some((pivot, metrics)) = ast.args.split_first() else {
        return Err(malformed());
    };
    if metrics.is_empty() {
        return Err(malformed());
    }

    let clauses = split_tail(&ast.tail);
    let key = pivot.key();

    let mut selected = vec![pivot.text.clone()];
    selected.extend(
        metrics
            .iter()
            .enumerate()
            .map(|(idx, metric)| format!("max({}) AS max_{idx}", metric.expression)),
    );

    let inner = inner_select(
        &selected,
        &clauses,
        &format!("t, {key}"),
        &format!("{key}, t"),
    );

    let rates: Vec<String> = (0..metrics.len()).map(guarded_rate).collect();
    let middle = format!("SELECT t, {key}, {rates} FROM ( {inner})", rates = rates.join(", "));

    let rate_aliases: Vec<String> = (0..metrics.len())
        .map(|idx| format!("max_{idx}_Rate"))
        .collect();

    Ok(format!(
        "SELECT t, groupArray(({key}, {aliases})) AS groupArr FROM ( {middle}) GROUP BY t ORDER BY t",
        aliases = rate_aliases.join(", "),
    ))
}

fn malformed() -> QueryError {
    QueryError::MalformedArgs(
        "$perSecondColumns expects a pivot expression followed by at least one counter expression"
            .into(),
    )
}
