//! # Endpoint Mapper
//!
//! Associates HTTP method + path with a request type and an authorization
//! policy, then turns the resulting table into an Axum router.
//!
//! Every mapped route is served by the same adapter: it collects the raw
//! inputs (path parameters, query pairs, body bytes, caller identity) and
//! hands them to the route's [`RoutePipeline`]. The adapter never sees the
//! concrete request type.
//!
//! Mapping is a startup concern. Everything that can be wrong with the
//! route table is reported as an [`EndpointError`] before the server binds.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::middleware::from_fn;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::{Json, Router};
use relay_core::{pipeline_for, Dispatcher, ParamMap, RawInputs, Request, RoutePipeline};
use serde_json::Value;
use thiserror::Error;

use crate::auth::{require_authenticated, AuthPolicy, CallerIdentity};
use crate::error::AppError;

/// Route table construction failure.
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("route {method} {path} maps {request}, which has no registered handler")]
    UnhandledRequest {
        method: Method,
        path: String,
        request: &'static str,
    },

    #[error("route {method} {path} is already mapped to {existing}")]
    DuplicateRoute {
        method: Method,
        path: String,
        existing: &'static str,
    },

    #[error("route {method} {path} has no authorization policy")]
    MissingPolicy { method: Method, path: String },

    #[error("route path {0:?} must start with '/'")]
    InvalidPath(String),

    #[error("unsupported route method {0}")]
    UnsupportedMethod(Method),
}

/// Opaque reference to a mapped route, used to attach its policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteHandle(usize);

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRegistration {
    pub method: Method,
    pub path: String,
    /// Short name of the bound request type.
    pub request: &'static str,
    pub policy: Option<AuthPolicy>,
}

struct MappedRoute<S> {
    registration: RouteRegistration,
    pipeline: Arc<dyn RoutePipeline<S>>,
}

/// Route table under construction.
pub struct Endpoints<S> {
    dispatcher: Dispatcher<S>,
    routes: Vec<MappedRoute<S>>,
}

impl<S> Endpoints<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(dispatcher: Dispatcher<S>) -> Self {
        Self {
            dispatcher,
            routes: Vec::new(),
        }
    }

    pub fn map_get<R: Request>(&mut self, path: &str) -> Result<RouteHandle, EndpointError> {
        self.map::<R>(Method::GET, path)
    }

    pub fn map_post<R: Request>(&mut self, path: &str) -> Result<RouteHandle, EndpointError> {
        self.map::<R>(Method::POST, path)
    }

    /// Map `method path` to request type `R`.
    ///
    /// The route has no policy until [`anonymous`](Self::anonymous) or
    /// [`admin`](Self::admin) is called with its handle.
    pub fn map<R: Request>(
        &mut self,
        method: Method,
        path: &str,
    ) -> Result<RouteHandle, EndpointError> {
        if !path.starts_with('/') {
            return Err(EndpointError::InvalidPath(path.to_string()));
        }
        if MethodFilter::try_from(method.clone()).is_err() {
            return Err(EndpointError::UnsupportedMethod(method));
        }
        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.registration.method == method && r.registration.path == path)
        {
            return Err(EndpointError::DuplicateRoute {
                method,
                path: path.to_string(),
                existing: existing.registration.request,
            });
        }

        let request = R::descriptor().name();
        let pipeline = pipeline_for::<R, S>(&self.dispatcher).map_err(|_| {
            EndpointError::UnhandledRequest {
                method: method.clone(),
                path: path.to_string(),
                request,
            }
        })?;

        tracing::debug!(%method, path, request, "route mapped");
        self.routes.push(MappedRoute {
            registration: RouteRegistration {
                method,
                path: path.to_string(),
                request,
                policy: None,
            },
            pipeline,
        });
        Ok(RouteHandle(self.routes.len() - 1))
    }

    /// Mark routes as requiring no credential.
    pub fn anonymous(&mut self, handles: &[RouteHandle]) -> &mut Self {
        self.set_policy(handles, AuthPolicy::Anonymous)
    }

    /// Mark routes as requiring an authenticated identity.
    pub fn admin(&mut self, handles: &[RouteHandle]) -> &mut Self {
        self.set_policy(handles, AuthPolicy::Admin)
    }

    fn set_policy(&mut self, handles: &[RouteHandle], policy: AuthPolicy) -> &mut Self {
        for &RouteHandle(index) in handles {
            match self.routes.get_mut(index) {
                Some(route) => route.registration.policy = Some(policy),
                None => tracing::warn!(index, %policy, "policy set on unknown route handle"),
            }
        }
        self
    }

    /// The route table, in mapping order.
    pub fn routes(&self) -> Vec<RouteRegistration> {
        self.routes
            .iter()
            .map(|route| route.registration.clone())
            .collect()
    }

    /// Build the router serving every mapped route with `state` as the
    /// call scope.
    pub fn into_router(self, state: S) -> Result<Router, EndpointError> {
        let mut by_path: BTreeMap<String, MethodRouter<S>> = BTreeMap::new();
        let count = self.routes.len();

        for MappedRoute {
            registration,
            pipeline,
        } in self.routes
        {
            let RouteRegistration {
                method,
                path,
                policy,
                ..
            } = registration;
            let Some(policy) = policy else {
                return Err(EndpointError::MissingPolicy { method, path });
            };
            let filter = MethodFilter::try_from(method.clone())
                .map_err(|_| EndpointError::UnsupportedMethod(method))?;

            let mut method_router = on(filter, route_adapter(pipeline));
            if policy == AuthPolicy::Admin {
                method_router = method_router.route_layer(from_fn(require_authenticated));
            }

            let merged = match by_path.remove(&path) {
                Some(existing) => existing.merge(method_router),
                None => method_router,
            };
            by_path.insert(path, merged);
        }

        let router = by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            });
        tracing::info!(routes = count, "route table built");
        Ok(router.with_state(state))
    }
}

impl<S> std::fmt::Debug for Endpoints<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoints")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| &r.registration)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ── Route adapter ───────────────────────────────────────────────────────────

type PathParams = Result<Path<HashMap<String, String>>, PathRejection>;
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;
type BodyBytes = Result<Bytes, BytesRejection>;

/// The Axum handler shared by every mapped route.
///
/// Extractor rejections never reach the client as Axum's plain-text
/// responses: undecodable path parameters bind as absent, and query or body
/// rejections become a JSON [`AppError::BadRequest`].
fn route_adapter<S>(
    pipeline: Arc<dyn RoutePipeline<S>>,
) -> impl Fn(
    State<S>,
    PathParams,
    QueryPairs,
    CallerIdentity,
    BodyBytes,
) -> relay_core::BoxFuture<'static, Result<Json<Value>, AppError>>
       + Clone
       + Send
       + Sync
       + 'static
where
    S: Clone + Send + Sync + 'static,
{
    move |State(state): State<S>,
          path: PathParams,
          query: QueryPairs,
          identity: CallerIdentity,
          body: BodyBytes| {
        Box::pin(serve_route(
            Arc::clone(&pipeline),
            state,
            path,
            query,
            identity,
            body,
        ))
    }
}

async fn serve_route<S>(
    pipeline: Arc<dyn RoutePipeline<S>>,
    state: S,
    path: PathParams,
    query: QueryPairs,
    identity: CallerIdentity,
    body: BodyBytes,
) -> Result<Json<Value>, AppError>
where
    S: Send + Sync + 'static,
{
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let body = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let inputs = RawInputs::new()
        .with_route(route_values(path))
        .with_query(ParamMap::from_pairs(query))
        .with_body(body.to_vec())
        .with_identity(identity.principal);
    Ok(Json(pipeline.run(state, inputs).await?))
}

/// Path parameters as route values. Parameters that cannot be decoded (for
/// example invalid UTF-8) bind as absent, so lenient binders see zero.
fn route_values(path: PathParams) -> ParamMap {
    match path {
        Ok(Path(params)) => ParamMap::from_pairs(params),
        Err(PathRejection::MissingPathParams(_)) => ParamMap::new(),
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "undecodable path parameters bound as absent");
            ParamMap::new()
        }
    }
}
