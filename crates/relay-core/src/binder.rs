//! # Request Binder
//!
//! Builds a typed request instance from the raw inputs of one call.
//!
//! ## Binding Order
//!
//! ```text
//! Default::default() → route → query → JSON body (merge) → user context
//! ```
//!
//! One instance is mutated in place through every stage. The body stage
//! merges: the payload is parsed into [`JsonFields`] and the request assigns
//! only the keys present, so route and query values survive unless the
//! payload names them explicitly. User context runs last so
//! identity-derived fields cannot be overridden by the body.

use crate::capability::{
    JsonFields, Principal, QueryValues, Request, RequestDescriptor, RouteValues,
};
use crate::error::BindingError;

/// Everything a call supplies to the binder.
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub route: RouteValues,
    pub query: QueryValues,
    pub body: Vec<u8>,
    pub identity: Principal,
}

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: RouteValues) -> Self {
        self.route = route;
        self
    }

    pub fn with_query(mut self, query: QueryValues) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_identity(mut self, identity: Principal) -> Self {
        self.identity = identity;
        self
    }
}

/// Construct and populate a request of type `R`.
///
/// Unparseable route/query scalars are left to each binder: lenient binders
/// fall back to the zero value, strict ones return
/// [`BindingError::InvalidScalar`]. A malformed or non-object body always
/// fails.
pub fn bind<R: Request>(
    descriptor: &RequestDescriptor<R>,
    inputs: &RawInputs,
) -> Result<R, BindingError> {
    let mut request = R::default();

    if let Some(bind_route) = descriptor.route {
        bind_route(&mut request, &inputs.route)?;
        tracing::debug!(request = descriptor.name, params = inputs.route.len(), "bound route values");
    }
    if let Some(bind_query) = descriptor.query {
        bind_query(&mut request, &inputs.query)?;
        tracing::debug!(request = descriptor.name, params = inputs.query.len(), "bound query values");
    }
    if let Some(bind_body) = descriptor.body {
        let fields = JsonFields::parse(&inputs.body)?;
        bind_body(&mut request, &fields)?;
        tracing::debug!(request = descriptor.name, fields = fields.len(), "merged JSON body");
    }
    if let Some(bind_user) = descriptor.user {
        bind_user(&mut request, &inputs.identity)?;
        tracing::debug!(
            request = descriptor.name,
            authenticated = inputs.identity.is_authenticated(),
            "bound user context"
        );
    }

    Ok(request)
}
