use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The one fatal lexical condition: a string literal that never
    /// closes. The payload is the byte offset of the opening quote.
    #[error("unterminated string literal at byte offset {0}")]
    UnterminatedLiteral(usize),

    /// A leading `$name(` with no matching close paren. The parser
    /// recovers by treating the query as macro-less, so this never
    /// reaches callers.
    #[error("no matching close parenthesis for macro invocation")]
    UnbalancedParens,

    /// A recognized macro was invoked with an argument list its
    /// expansion cannot use.
    #[error("malformed macro arguments: {0}")]
    MalformedArgs(String),
}
