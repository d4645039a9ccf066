//! `$rate(...)` expands to a time derivative per argument over one
//! shared bucket column.

use super::{inner_select, split_tail};
use crate::{
    error::{QueryError, Result},
    parser::ParsedQuery,
};

pub fn build(query: &str, ast: &ParsedQuery) -> Result<String> {
    if ast.macro_name.as_deref() != Some("rate") {
        return Ok(query.to_string());
    }
    if ast.args.is_empty() {
        return Err(QueryError::MalformedArgs(
            "$rate expects at least one aggregated expression".into(),
        ));
    }

    let clauses = split_tail(&ast.tail);
    let selected: Vec<String> = ast.args.iter().map(|arg| arg.text.clone()).collect();
    let rates: Vec<String> = ast
        .args
        .iter()
        .map(|arg| {
            let key = arg.key();
            format!("{key}/runningDifference(t/1000) {key}Rate")
        })
        .collect();

    Ok(format!(
        "SELECT t, {rates} FROM ( {inner})",
        rates = rates.join(", "),
        inner = inner_select(&selected, &clauses, "t", "t"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn other_macros_pass_through() {
        let query = "$columns(from_OSName, count(*) c) FROM requests";
        let ast = parse(query).unwrap();
        assert_eq!(build(query, &ast).unwrap(), query);
    }

    #[test]
    fn rejects_empty_argument_list() {
        let query = "$rate() FROM requests";
        let ast = parse(query).unwrap();
        assert!(matches!(
            build(query, &ast),
            Err(QueryError::MalformedArgs(_))
        ));
    }

    #[test]
    fn conjoins_existing_predicate_with_time_filter() {
        let query = "$rate(countIf(x) AS hits) FROM requests WHERE Type = 200";
        let ast = parse(query).unwrap();
        let sql = build(query, &ast).unwrap();
        assert!(sql.contains("WHERE $timeFilter AND Type = 200"));
    }

    #[test]
    fn rate_columns_preserve_argument_order() {
        let query = "$rate(b AS second, a AS first) FROM requests";
        let ast = parse(query).unwrap();
        let sql = build(query, &ast).unwrap();
        let second = sql.find("secondRate").unwrap();
        let first = sql.find("firstRate").unwrap();
        assert!(second < first);
    }
}
