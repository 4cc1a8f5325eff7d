// src/error.rs
//! Error types for the naming registry and the management facade.

/// Result type for registry operations.
pub type NamingResult<T> = Result<T, NamingError>;

/// Result type for facade operations.
pub type ManagementResult<T> = Result<T, ManagementError>;

/// Failures raised by a [`crate::registry::BindingRegistry`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NamingError {
    /// Binding name was empty.
    #[error("Invalid binding name: {0:?}")]
    InvalidName(String),

    /// The name is already bound in this context.
    #[error("The binding named [{name}] is already bound in context [{context}]")]
    NameAlreadyBound {
        /// Name that was rejected
        name: String,
        /// Identity of the owning context, or `<unregistered>`
        context: String,
    },

    /// No binding exists under the name.
    #[error("Name not found: [{0}]")]
    NotFound(String),

    /// The name is bound to a leaf value, not a context.
    #[error("Name [{0}] is not a context")]
    NotContext(String),

    /// The context was closed.
    #[error("Context has been closed")]
    Closed,

    /// Operation arguments did not match the operation's parameters.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

/// Why an operation invocation failed after it was resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvocationCause {
    /// The underlying naming operation failed.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// More than one operation shares the signature hash.
    #[error("Signature hash {hash} is shared by {candidates} operations")]
    AmbiguousSignature {
        /// Colliding dispatch key
        hash: i32,
        /// Number of entries under the key
        candidates: usize,
    },
}

/// Failures raised by the management facade of a binding context.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ManagementError {
    /// The attribute does not name a current binding.
    #[error("Attribute not found: [{0}]")]
    AttributeNotFound(String),

    /// The value cannot be assigned to the attribute.
    #[error("Invalid value for attribute [{name}]: expected {expected}, got {got}")]
    InvalidValue {
        /// Attribute name
        name: String,
        /// Declared type of the attribute
        expected: String,
        /// Type of the rejected value
        got: String,
    },

    /// No operation is registered for the signature.
    #[error("Operation not found: {name}({}) [hash {hash}]", .signature.join(", "))]
    OperationNotFound {
        /// Requested operation name
        name: String,
        /// Requested parameter type names
        signature: Vec<String>,
        /// Computed dispatch key
        hash: i32,
    },

    /// No constructor is registered for the signature.
    #[error("Constructor not found: ({}) [hash {hash}]", .signature.join(", "))]
    ConstructorNotFound {
        /// Requested parameter type names
        signature: Vec<String>,
        /// Computed dispatch key
        hash: i32,
    },

    /// The operation was resolved but failed.
    #[error("Invocation of [{operation}] failed: {cause}")]
    InvocationFailed {
        /// Operation name
        operation: String,
        /// Original failure
        #[source]
        cause: InvocationCause,
    },

    /// An identity string could not be parsed.
    #[error("Invalid object name [{name}]: {reason}")]
    InvalidObjectName {
        /// Offending input
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// A registration hook was called out of order.
    #[error("Registration rejected: {0}")]
    RegistrationRejected(String),
}

impl ManagementError {
    pub(crate) fn invocation(operation: &str, cause: impl Into<InvocationCause>) -> Self {
        ManagementError::InvocationFailed {
            operation: operation.to_string(),
            cause: cause.into(),
        }
    }
}
