//! Error types for pattern compilation and navigation.

use thiserror::Error;

/// Errors raised while compiling a route pattern or building a path from one.
///
/// Reverse building (`Pattern::to_path`) never drops a bad value silently:
/// every mismatch between the supplied parameters and the pattern's keys
/// surfaces as one of these variants.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A required parameter was not supplied.
    #[error("expected \"{name}\" to be defined")]
    MissingParameter { name: String },

    /// A list of values was supplied for a parameter that does not repeat.
    #[error("expected \"{name}\" to not repeat, but received {count} values")]
    UnexpectedRepeat { name: String, count: usize },

    /// An empty list was supplied for a required repeating parameter.
    #[error("expected \"{name}\" to not be empty")]
    EmptyRepeat { name: String },

    /// The percent-encoded value does not satisfy the parameter's sub-pattern.
    #[error("expected \"{name}\" to match \"{pattern}\", but received \"{value}\"")]
    InvalidValue {
        name: String,
        pattern: String,
        value: String,
    },

    /// The assembled (or supplied) expression could not be compiled.
    #[error("invalid route expression `{source_text}`: {error}")]
    InvalidExpression {
        source_text: String,
        #[source]
        error: regex::Error,
    },

    /// Only single string patterns keep the tokens needed to rebuild a path.
    #[error("pattern `{0}` cannot be reversed into a path")]
    NotReversible(String),
}

/// Errors surfaced by navigation entry points (`show`, `replace`, `dispatch`, ...).
#[derive(Debug, Error)]
pub enum NavigationError {
    /// Registering a route failed because its pattern did not compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// A middleware returned an error; the dispatch pass stopped at that middleware.
    #[error("navigation handler failed: {0}")]
    Handler(#[from] anyhow::Error),
}
