//! # Error Types
//!
//! Errors raised by the binding, registration, and dispatch stages. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Propagation
//!
//! - [`BindingError`] aborts a call before validation runs.
//! - [`RegistryError`] aborts startup; a registry is never partially built.
//! - [`HandlerFault`] is the only error raised by handler bodies. The
//!   dispatcher does not recover from it; callers map it to a server error.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Failure while populating a request instance from raw call inputs.
#[derive(Error, Debug)]
pub enum BindingError {
    /// The body payload is not valid JSON.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The body payload is valid JSON but not a JSON object.
    #[error("request body must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },

    /// A route or query scalar could not be parsed by a strict binder.
    #[error("invalid value for '{key}': {value:?}")]
    InvalidScalar { key: String, value: String },

    /// A body field holds a value of the wrong type for its target.
    #[error("invalid value for body field '{key}': {source}")]
    InvalidField {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Startup-time configuration error in the handler/validator table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two handlers were registered for the same request type.
    #[error("duplicate handler for request type {request}: {existing} already registered, {rejected} rejected")]
    DuplicateHandler {
        request: &'static str,
        existing: &'static str,
        rejected: &'static str,
    },
}

/// Unexpected failure inside handler logic.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HandlerFault {
    message: String,
}

impl HandlerFault {
    /// Create a fault from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The fault message. Not meant for clients.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure to resolve or run the handler bound to a request type.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// No handler binding exists for the request type.
    #[error("no handler registered for request type {request}")]
    NoHandler { request: &'static str },

    /// The handler body failed.
    #[error("handler fault: {0}")]
    Fault(#[from] HandlerFault),

    /// The handler's result could not be serialized.
    #[error("result serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failure of one route's bind → validate → dispatch sequence.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Binding failed before validation.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// One or more validation rules failed; the handler was not invoked.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Handler resolution or execution failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;

    #[test]
    fn duplicate_handler_names_all_types() {
        let err = RegistryError::DuplicateHandler {
            request: "GetBlogRequest",
            existing: "GetBlog",
            rejected: "GetBlogAgain",
        };
        let msg = err.to_string();
        assert!(msg.contains("GetBlogRequest"));
        assert!(msg.contains("GetBlog"));
        assert!(msg.contains("GetBlogAgain"));
    }

    #[test]
    fn handler_fault_keeps_message() {
        let fault = HandlerFault::new("store unavailable");
        assert_eq!(fault.message(), "store unavailable");
        assert_eq!(fault.to_string(), "store unavailable");
    }

    #[test]
    fn dispatch_error_wraps_fault() {
        let err = DispatchError::from(HandlerFault::new("boom"));
        assert!(matches!(err, DispatchError::Fault(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn pipeline_error_displays_validation_messages() {
        let errors = ValidationErrors::from(vec![FieldError::new(
            "Id",
            "Id needs to be greater than 0",
        )]);
        let err = PipelineError::Validation(errors);
        assert!(err.to_string().contains("Id needs to be greater than 0"));
    }

    #[test]
    fn not_an_object_reports_kind() {
        let err = BindingError::NotAnObject { found: "array" };
        assert!(err.to_string().contains("array"));
    }
}
