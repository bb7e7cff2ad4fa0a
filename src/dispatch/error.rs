use crate::{provider, registry, types};

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("contract violation: {0}")]
    ContractViolation(String),
    #[error("operation `{operation}` produced a `{actual}` result while `{expected}` was requested")]
    ShapeMismatch {
        operation: String,
        expected: types::Shape,
        actual: types::Shape,
    },
    /// Failures of the provider are reported as they are
    #[error(transparent)]
    Provider(#[from] provider::Error),
    #[error("override for `{operation}` failed :: {source}")]
    Override {
        operation: String,
        #[source]
        source: registry::FunctionError,
    },
    #[error("filter for `{operation}` failed :: {source}")]
    Filter {
        operation: String,
        #[source]
        source: registry::FunctionError,
    },
}
