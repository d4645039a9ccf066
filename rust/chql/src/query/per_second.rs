//! `$perSecond(...)` emits one guarded counter rate per metric argument.

use super::{guarded_rate, inner_select, split_tail};
use crate::{
    error::{QueryError, Result},
    parser::ParsedQuery,
};

pub fn build(query: &str, ast: &ParsedQuery) -> Result<String> {
    if ast.macro_name.as_deref() != Some("perSecond") {
        return Ok(query.to_string());
    }
    if ast.args.is_empty() {
        return Err(QueryError::MalformedArgs(
            "$perSecond expects at least one counter expression".into(),
        ));
    }

    let clauses = split_tail(&ast.tail);
    let maxes: Vec<String> = ast
        .args
        .iter()
        .enumerate()
        .map(|(idx, arg)| format!("max({}) AS max_{idx}", arg.expression))
        .collect();
    let rates: Vec<String> = (0..ast.args.len()).map(guarded_rate).collect();

    Ok(format!(
        "SELECT t, {rates} FROM ( {inner})",
        rates = rates.join(", "),
        inner = inner_select(&maxes, &clauses, "t", "t"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn other_macros_pass_through() {
        let query = "$rate(x AS total) FROM requests";
        let ast = parse(query).unwrap();
        assert_eq!(build(query, &ast).unwrap(), query);
    }

    #[test]
    fn aliases_metrics_positionally() {
        let query = "$perSecond(a, b, c) FROM requests";
        let ast = parse(query).unwrap();
        let sql = build(query, &ast).unwrap();
        assert!(sql.contains("max(a) AS max_0"));
        assert!(sql.contains("max(b) AS max_1"));
        assert!(sql.contains("max(c) AS max_2"));
        assert!(sql.contains("AS max_2_Rate"));
    }

    #[test]
    fn guards_against_counter_resets() {
        let query = "$perSecond(total) FROM requests";
        let ast = parse(query).unwrap();
        let sql = build(query, &ast).unwrap();
        assert!(sql.contains("if(runningDifference(max_0) < 0, nan,"));
    }

    #[test]
    fn rejects_empty_argument_list() {
        let query = "$perSecond() FROM requests";
        let ast = parse(query).unwrap();
        assert!(matches!(
            build(query, &ast),
            Err(QueryError::MalformedArgs(_))
        ));
    }
}
