//! # relay-api — Axum Surface for the Relay Request Pipeline
//!
//! Serves handler-oriented routes: each route is bound to one request type,
//! and every call runs bind → validate → dispatch through relay-core.
//!
//! ## API Surface
//!
//! | Route                 | Policy    | Request                                  |
//! |-----------------------|-----------|------------------------------------------|
//! | `GET /blogs`          | anonymous | [`services::blogs::GetBlogsRequest`]     |
//! | `GET /blogs/{id}`     | anonymous | [`services::blogs::GetBlogRequest`]      |
//! | `POST /test/{id}`     | anonymous | [`services::echo::TestRequest`]          |
//! | `POST /admin/blogs`   | admin     | [`services::blogs::CreateBlogRequest`]   |
//! | `GET /health/*`       | none      | liveness / readiness probes              |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → IdentityResolver → identity_middleware → [require_authenticated] → route pipeline
//! ```

pub mod auth;
pub mod data;
pub mod endpoint;
pub mod error;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::Router;
use relay_core::Dispatcher;
use tower_http::trace::TraceLayer;

use crate::auth::{CannedIdentityProvider, IdentityResolver};
use crate::endpoint::{EndpointError, Endpoints};
use crate::error::{AppError, StartupError};
use crate::services::blogs::{CreateBlogRequest, GetBlogRequest, GetBlogsRequest};
use crate::services::echo::TestRequest;
use crate::state::AppState;

/// Map every service route and attach its policy.
pub fn endpoints(dispatcher: Dispatcher<AppState>) -> Result<Endpoints<AppState>, EndpointError> {
    let mut endpoints = Endpoints::new(dispatcher);

    let get_blogs = endpoints.map_get::<GetBlogsRequest>("/blogs")?;
    let get_blog = endpoints.map_get::<GetBlogRequest>("/blogs/{id}")?;
    let test = endpoints.map_post::<TestRequest>("/test/{id}")?;
    let create_blog = endpoints.map_post::<CreateBlogRequest>("/admin/blogs")?;

    endpoints.anonymous(&[get_blogs, get_blog, test]);
    endpoints.admin(&[create_blog]);
    Ok(endpoints)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes sit beside the mapped routes and carry no policy.
pub fn app(state: AppState) -> Result<Router, StartupError> {
    let resolver = IdentityResolver::new(CannedIdentityProvider::with_username(
        state.config.auth_token.clone(),
        state.config.canned_username.clone(),
    ));
    let dispatcher = Dispatcher::new(Arc::new(services::registry()?));
    let api = endpoints(dispatcher)?.into_router(state)?;

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Ok(Router::new()
        .merge(health)
        .merge(api)
        .fallback(not_found)
        .layer(from_fn(auth::identity_middleware))
        .layer(axum::Extension(resolver))
        .layer(TraceLayer::new_for_http()))
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. The route table is built before the listener binds.
async fn readiness() -> &'static str {
    "ready"
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(format!("no route for {}", uri.path()))
}
