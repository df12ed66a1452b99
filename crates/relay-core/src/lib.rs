//! # relay-core — Request Binding, Registries, and Dispatch
//!
//! The framework-agnostic core of a handler-oriented HTTP backend. A call
//! flows through four stages, each owned by one module:
//!
//! ```text
//! raw inputs ─▶ binder ─▶ validation ─▶ dispatch ─▶ serde_json::Value
//!  (route, query, body, identity)
//! ```
//!
//! - [`capability`]: what a request type binds from, declared explicitly
//!   through a [`RequestDescriptor`].
//! - [`binder`]: builds the typed request in a fixed order, merging the
//!   JSON body without clobbering route or query values.
//! - [`registry`]: the startup-built request → handler / validator tables.
//! - [`validation`]: field-level rule chains.
//! - [`dispatch`]: per-call handler construction and invocation.
//! - [`pipeline`]: the type-erased per-route closure tying it together.
//!
//! ## Crate Policy
//!
//! - No HTTP framework dependency; the routing layer adapts its own request
//!   type into [`RawInputs`].
//! - The registry is immutable after [`RegistryBuilder::build`] and shared
//!   through `Arc` without locks.
//! - No `unsafe` code. No `.unwrap()` outside tests.

#![forbid(unsafe_code)]

pub mod binder;
pub mod capability;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod registry;
pub mod validation;

pub use binder::{bind, RawInputs};
pub use capability::{
    Capability, Claim, FromJsonBody, FromQuery, FromRoute, FromUserContext, JsonFields, ParamMap,
    Principal, QueryValues, Request, RequestDescriptor, RouteValues,
};
pub use dispatch::Dispatcher;
pub use error::{BindingError, DispatchError, HandlerFault, PipelineError, RegistryError};
pub use pipeline::{pipeline_for, RoutePipeline};
pub use registry::{BoxFuture, Handler, Registry, RegistryBuilder};
pub use validation::{FieldError, Rules, ValidationErrors, Validator};
