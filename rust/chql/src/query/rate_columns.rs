//! `$rateColumns(...)` applies the `$columns` pivot and maps every value
//! to a per-second rate.

use super::columns;
use crate::{error::Result, parser::ParsedQuery};

pub fn build(query: &str, ast: &ParsedQuery) -> Result<String> {
    if ast.macro_name.as_deref() != Some("rateColumns") {
        return Ok(query.to_string());
    }
    let pivoted = columns::body(ast, "$rateColumns")?;
    Ok(format!(
        "SELECT t, arrayMap(a -> (a.1, a.2/runningDifference( t/1000 )), groupArr) FROM ({pivoted})"
    ))
}
