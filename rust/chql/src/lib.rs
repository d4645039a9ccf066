//! Macro expansion for ClickHouse dashboard queries.
//!
//! A query may begin with one `$name(...)` macro invocation; [`expand`]
//! rewrites the supported macros (`rate`, `rateColumns`, `columns`,
//! `perSecond`, `perSecondColumns`) into nested, runnable SQL. The
//! dashboard-owned placeholders `$timeSeries` and `$timeFilter`, like
//! any other `$identifier` that is not a known macro, are opaque and
//! preserved verbatim for the caller to substitute later.

pub mod error;
pub mod parser;
pub mod query;
pub mod scanner;
pub mod token;

pub use error::{QueryError, Result};
pub use parser::{Argument, ParsedQuery};

/// Parses a query and expands whichever supported macro it starts with.
/// Queries with no recognized macro come back unchanged.
pub fn expand(query: &str) -> Result<String> {
    let ast = parser::parse(query)?;
    query::apply(query, &ast)
}
