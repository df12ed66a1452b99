//! # Handler & Validator Registry
//!
//! The registry maps each request type to exactly one handler and to zero or
//! more validators. It is assembled once at startup from an explicit
//! registration table and is read-only afterwards, so it is shared between
//! concurrent calls behind an `Arc` without any locking.
//!
//! ```text
//! RegistryBuilder::new()
//!     .handler::<GetBlog>()
//!     .validator(get_blog_rules())
//!     .build()?            // duplicate handler ⇒ RegistryError
//! ```
//!
//! Handlers are not stored as instances. Each binding stores a monomorphized
//! invoker that constructs a fresh handler from the call scope on every
//! dispatch, so handlers may hold call-scoped resources.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

use serde_json::Value;

use crate::capability::{short_type_name, Request};
use crate::error::{DispatchError, HandlerFault, RegistryError};
use crate::validation::{ValidationErrors, Validator};

/// Boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Business logic for exactly one request type.
///
/// `S` is the call scope a handler is built from (typically the
/// application state). A new handler is constructed for every call.
pub trait Handler<S>: Sized + Send + 'static {
    /// The request type this handler accepts.
    type Request: Request;

    /// Construct a handler for one call.
    fn from_scope(scope: &S) -> Self;

    /// Execute the request.
    fn run(
        self,
        request: Self::Request,
    ) -> impl Future<Output = Result<<Self::Request as Request>::Output, HandlerFault>> + Send;
}

/// Typed entry point stored (type-erased) in a handler binding.
pub(crate) type Invoker<S, R> = fn(&S, R) -> BoxFuture<'static, Result<Value, DispatchError>>;

fn invoke_handler<S: 'static, H: Handler<S>>(
    scope: &S,
    request: H::Request,
) -> BoxFuture<'static, Result<Value, DispatchError>> {
    let handler = H::from_scope(scope);
    Box::pin(async move {
        let output = handler.run(request).await?;
        serde_json::to_value(output).map_err(DispatchError::Serialize)
    })
}

struct HandlerBinding {
    handler: &'static str,
    invoker: Box<dyn Any + Send + Sync>,
}

type ValidatorChain<R> = Vec<Box<dyn Validator<Request = R>>>;

struct ValidatorBinding {
    count: usize,
    chain: Box<dyn Any + Send + Sync>,
}

/// Immutable request-type → handler / validator tables.
pub struct Registry<S> {
    handlers: HashMap<TypeId, HandlerBinding>,
    validators: HashMap<TypeId, ValidatorBinding>,
    _scope: PhantomData<fn(&S)>,
}

impl<S: 'static> Registry<S> {
    /// Start an empty registration table.
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder::new()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn has_handler<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Name of the handler bound to `R`, if any.
    pub fn handler_name<R: Request>(&self) -> Option<&'static str> {
        self.handlers.get(&TypeId::of::<R>()).map(|b| b.handler)
    }

    pub fn validator_count<R: Request>(&self) -> usize {
        self.validators
            .get(&TypeId::of::<R>())
            .map_or(0, |b| b.count)
    }

    /// Run every validator bound to `R`, in registration order.
    ///
    /// Does not stop at the first failing validator. A request type with no
    /// validators always passes.
    pub fn validate<R: Request>(&self, request: &R) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let chain = self
            .validators
            .get(&TypeId::of::<R>())
            .and_then(|b| b.chain.downcast_ref::<ValidatorChain<R>>());
        if let Some(chain) = chain {
            for validator in chain {
                errors.extend(validator.validate(request));
            }
        }
        errors
    }

    pub(crate) fn invoker<R: Request>(&self) -> Option<(&'static str, Invoker<S, R>)> {
        let binding = self.handlers.get(&TypeId::of::<R>())?;
        binding
            .invoker
            .downcast_ref::<Invoker<S, R>>()
            .map(|invoke| (binding.handler, *invoke))
    }
}

impl<S> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("handlers", &self.handlers.len())
            .field("validated_requests", &self.validators.len())
            .finish()
    }
}

/// Startup-time registration table.
///
/// Registration errors are collected and reported by [`build`](Self::build),
/// so the table reads as one chain.
pub struct RegistryBuilder<S> {
    registry: Registry<S>,
    errors: Vec<RegistryError>,
}

impl<S: 'static> RegistryBuilder<S> {
    pub fn new() -> Self {
        Self {
            registry: Registry {
                handlers: HashMap::new(),
                validators: HashMap::new(),
                _scope: PhantomData,
            },
            errors: Vec::new(),
        }
    }

    /// Bind handler `H` to its request type.
    pub fn handler<H: Handler<S>>(mut self) -> Self {
        let key = TypeId::of::<H::Request>();
        let request = short_type_name::<H::Request>();
        let handler = short_type_name::<H>();

        if let Some(existing) = self.registry.handlers.get(&key) {
            self.errors.push(RegistryError::DuplicateHandler {
                request,
                existing: existing.handler,
                rejected: handler,
            });
            return self;
        }

        let invoker: Invoker<S, H::Request> = invoke_handler::<S, H>;
        self.registry.handlers.insert(
            key,
            HandlerBinding {
                handler,
                invoker: Box::new(invoker),
            },
        );
        tracing::debug!(request, handler, "handler bound");
        self
    }

    /// Append a validator to its request type's chain.
    pub fn validator<V: Validator>(mut self, validator: V) -> Self {
        let request = short_type_name::<V::Request>();
        let binding = self
            .registry
            .validators
            .entry(TypeId::of::<V::Request>())
            .or_insert_with(|| ValidatorBinding {
                count: 0,
                chain: Box::new(ValidatorChain::<V::Request>::new()),
            });
        if let Some(chain) = binding.chain.downcast_mut::<ValidatorChain<V::Request>>() {
            chain.push(Box::new(validator));
            binding.count += 1;
        }
        tracing::debug!(request, validator = short_type_name::<V>(), "validator bound");
        self
    }

    /// Freeze the table. Fails on the first registration error.
    pub fn build(self) -> Result<Registry<S>, RegistryError> {
        if let Some(err) = self.errors.into_iter().next() {
            tracing::error!(error = %err, "handler registration failed");
            return Err(err);
        }
        tracing::info!(
            handlers = self.registry.handlers.len(),
            validated_requests = self.registry.validators.len(),
            "registry built"
        );
        Ok(self.registry)
    }
}

impl<S: 'static> Default for RegistryBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
