//! # Route Pipeline
//!
//! The per-route closure a routing layer calls for every inbound call:
//!
//! ```text
//! bind ──BindingError──▶ reject
//!   │
//! validate ──non-empty──▶ reject (handler never runs)
//!   │
//! dispatch ──HandlerFault──▶ propagate
//!   │
//! serialized result
//! ```
//!
//! Each pipeline is closed over one concrete request type when the route is
//! registered. The routing layer sees only [`RoutePipeline`] and never
//! touches the request type itself.

use std::sync::Arc;

use serde_json::Value;

use crate::binder::{bind, RawInputs};
use crate::capability::{Capability, Request, RequestDescriptor};
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, PipelineError};
use crate::registry::BoxFuture;

/// Type-erased bind → validate → dispatch sequence for one route.
pub trait RoutePipeline<S>: Send + Sync {
    /// Short name of the request type this pipeline binds.
    fn request_name(&self) -> &'static str;

    fn capabilities(&self) -> Vec<Capability>;

    /// Run the full sequence for one call.
    fn run(&self, scope: S, inputs: RawInputs) -> BoxFuture<'static, Result<Value, PipelineError>>;
}

struct TypedPipeline<S, R> {
    descriptor: RequestDescriptor<R>,
    dispatcher: Dispatcher<S>,
}

impl<S, R> RoutePipeline<S> for TypedPipeline<S, R>
where
    S: Send + Sync + 'static,
    R: Request,
{
    fn request_name(&self) -> &'static str {
        self.descriptor.name()
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.descriptor.capabilities()
    }

    fn run(&self, scope: S, inputs: RawInputs) -> BoxFuture<'static, Result<Value, PipelineError>> {
        let descriptor = self.descriptor;
        let dispatcher = self.dispatcher.clone();
        Box::pin(async move {
            let request = bind(&descriptor, &inputs)?;

            let errors = dispatcher.registry().validate(&request);
            if !errors.is_empty() {
                tracing::debug!(
                    request = descriptor.name(),
                    failures = errors.len(),
                    "validation rejected request"
                );
                return Err(PipelineError::Validation(errors));
            }

            Ok(dispatcher.dispatch(&scope, request).await?)
        })
    }
}

/// Build the pipeline for request type `R`.
///
/// Fails with [`DispatchError::NoHandler`] when `R` has no handler binding,
/// so a route can never be wired to a request nothing handles.
pub fn pipeline_for<R, S>(dispatcher: &Dispatcher<S>) -> Result<Arc<dyn RoutePipeline<S>>, DispatchError>
where
    R: Request,
    S: Send + Sync + 'static,
{
    let descriptor = R::descriptor();
    if !dispatcher.registry().has_handler::<R>() {
        return Err(DispatchError::NoHandler {
            request: descriptor.name(),
        });
    }
    Ok(Arc::new(TypedPipeline {
        descriptor,
        dispatcher: dispatcher.clone(),
    }))
}
