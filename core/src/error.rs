use thiserror::Error;

use crate::operation::Operation;

#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The `executable` policy rejected the operation
    #[error("No permission: {operation} on {model}")]
    PermissionDenied { model: String, operation: Operation },

    /// Selection depth is above the configured `depthLimit`
    #[error("Depth limit exceeded: depth {depth} > limit {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },

    /// A filter, sort, selection or input named a field the model does not expose
    #[error("Unknown field `{field}` on {model}")]
    UnknownField { model: String, field: String },

    /// A filter operator bag carried a key that is not an operator
    #[error("Unknown operator `{operator}` on field `{field}`")]
    UnknownOperator { field: String, operator: String },

    /// Fragment spreads reference each other in a cycle
    #[error("Fragment cycle through `{0}`")]
    FragmentCycle(String),

    /// A fragment spread names a fragment that was not supplied
    #[error("Unknown fragment `{0}`")]
    UnknownFragment(String),

    /// No model is registered under this name
    #[error("Unknown model `{0}`")]
    UnknownModel(String),

    /// No root field is registered under this name
    #[error("Unknown operation `{0}`")]
    UnknownOperation(String),

    /// The model exists but the operation was not enabled for it
    #[error("Operation {operation} is not enabled for {model}")]
    OperationNotEnabled { model: String, operation: Operation },

    /// Caller argument of the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error building the model from the schema description
    #[error("Schema error: {0}")]
    Schema(String),

    /// Error executing a statement
    #[error("Execution error: {0}")]
    Execution(String),

    /// Error with transaction
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Error mapping storage values
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl GeneratorError {
    pub(crate) fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            model: model.into(),
            field: field.into(),
        }
    }
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;
