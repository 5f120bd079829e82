//! Error types for query execution

use thiserror::Error;

/// Recoverable expression-evaluation failure.
///
/// Raised by [`crate::expression::Expression::evaluate`] when an expression
/// cannot produce a value for a given solution (unbound variable, type
/// mismatch, ...). Accumulators and the group-by engine recover from these
/// locally; they never abort the overall query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expression evaluation failed: {0}")]
pub struct EvalError(pub String);

impl EvalError {
    /// Create an evaluation error with a message
    pub fn new(msg: impl Into<String>) -> Self {
        EvalError(msg.into())
    }
}

/// Query execution errors
///
/// Contract violations (invalid construction arguments, lifecycle misuse)
/// are distinct variants from recoverable evaluation errors. Data absence
/// is never an error: empty scopes and non-matching patterns produce empty
/// result sequences.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Operator not opened
    #[error("Operator not opened - call open() before next()")]
    OperatorNotOpened,

    /// Operator already opened
    #[error("Operator already opened")]
    OperatorAlreadyOpened,

    /// Operator is closed
    #[error("Operator is closed")]
    OperatorClosed,

    /// Hash join built with no join variables
    ///
    /// A join with no shared variables is a cross product, not a hash join;
    /// model it with an explicit cross operator instead.
    #[error("Hash join requires at least one join variable")]
    ZeroJoinVariables,

    /// GROUP BY with neither grouping expressions nor aggregates
    #[error("GROUP BY requires at least one grouping expression or aggregate")]
    EmptyGroupBy,

    /// Variable not found
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    /// Invalid query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Expression evaluation error surfaced to the caller
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for query operations
pub type Result<T> = std::result::Result<T, QueryError>;
