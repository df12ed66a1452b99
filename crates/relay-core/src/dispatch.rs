//! # Dispatcher
//!
//! Resolves the handler bound to a request's type and runs it.
//!
//! The binding is looked up on every call rather than cached per route so
//! that each call constructs its own handler from its own scope. The result
//! is returned as an opaque `serde_json::Value`; callers only serialize it.

use std::sync::Arc;

use serde_json::Value;

use crate::capability::{short_type_name, Request};
use crate::error::DispatchError;
use crate::registry::Registry;

/// Handler resolution over a shared, immutable [`Registry`].
pub struct Dispatcher<S> {
    registry: Arc<Registry<S>>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<S: 'static> Dispatcher<S> {
    pub fn new(registry: Arc<Registry<S>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    /// Run the handler bound to `R` with a handler built from `scope`.
    ///
    /// Handler faults are returned unchanged as [`DispatchError::Fault`].
    pub async fn dispatch<R: Request>(&self, scope: &S, request: R) -> Result<Value, DispatchError> {
        let (handler, invoke) =
            self.registry
                .invoker::<R>()
                .ok_or(DispatchError::NoHandler {
                    request: short_type_name::<R>(),
                })?;

        tracing::debug!(request = short_type_name::<R>(), handler, "dispatching");
        let result = invoke(scope, request).await;
        if let Err(ref err) = result {
            tracing::warn!(handler, error = %err, "handler failed");
        }
        result
    }
}

impl<S> std::fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}
