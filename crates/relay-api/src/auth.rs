//! # Authentication & Authorization Gate
//!
//! Identity resolution runs for every request; policy enforcement runs per
//! route, before any binding.
//!
//! ## Identity Resolution
//!
//! [`identity_middleware`] asks the configured [`IdentityProvider`] who the
//! caller is and stores the answer as a [`CallerIdentity`] in the request
//! extensions. A rejected credential is remembered but the principal falls
//! back to anonymous, so anonymous routes still serve the call.
//!
//! ## Policies
//!
//! | Policy                     | Enforcement                               |
//! |----------------------------|-------------------------------------------|
//! | [`AuthPolicy::Anonymous`]  | none                                      |
//! | [`AuthPolicy::Admin`]      | [`require_authenticated`] route layer → 401 |
//!
//! The reference provider, [`CannedIdentityProvider`], is a mock: any
//! `Bearer` credential (or the configured token, when one is set) yields a
//! fixed set of claims. Real credential validation is out of scope.

use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use relay_core::{Claim, Principal};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// Authentication scheme name attached to principals issued here.
pub const BEARER_SCHEME: &str = "bearer";

/// Route authorization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// No credential required.
    Anonymous,
    /// A valid authenticated identity is required.
    Admin,
}

impl AuthPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Identity provider ───────────────────────────────────────────────────────

/// Result of asking an identity provider about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    /// No credential presented.
    Anonymous,
    /// A credential was presented and refused.
    Rejected(String),
}

/// Resolves the caller identity from request metadata.
pub trait IdentityProvider: Send + Sync + 'static {
    fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome;
}

/// Mock provider that manufactures a canned identity for bearer callers.
#[derive(Clone)]
pub struct CannedIdentityProvider {
    token: Option<String>,
    claims: Vec<Claim>,
}

impl CannedIdentityProvider {
    /// `token: None` accepts any bearer credential.
    pub fn new(token: Option<String>, claims: Vec<Claim>) -> Self {
        Self { token, claims }
    }

    /// Provider issuing a single `username` claim.
    pub fn with_username(token: Option<String>, username: impl Into<String>) -> Self {
        Self::new(token, vec![Claim::new("username", username)])
    }
}

impl fmt::Debug for CannedIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CannedIdentityProvider")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("claims", &self.claims)
            .finish()
    }
}

impl IdentityProvider for CannedIdentityProvider {
    fn authenticate(&self, headers: &HeaderMap) -> AuthOutcome {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return AuthOutcome::Anonymous;
        };
        let Some(provided) = value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) else {
            return AuthOutcome::Rejected("authorization header must use Bearer scheme".into());
        };
        if let Some(expected) = &self.token {
            if !constant_time_token_eq(provided, expected) {
                return AuthOutcome::Rejected("invalid bearer token".into());
            }
        }
        AuthOutcome::Authenticated(Principal::authenticated(BEARER_SCHEME, self.claims.clone()))
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so timing does not
/// depend on where the mismatch is.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Shared handle to the configured provider, injected as a request extension.
#[derive(Clone)]
pub struct IdentityResolver(Arc<dyn IdentityProvider>);

impl IdentityResolver {
    pub fn new(provider: impl IdentityProvider) -> Self {
        Self(Arc::new(provider))
    }
}

impl fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityResolver")
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the caller, available to handlers via `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub principal: Principal,
    /// Why a presented credential was refused, if it was.
    pub rejection: Option<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::anonymous(),
            rejection: None,
        }
    }

    fn from_outcome(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authenticated(principal) => Self {
                principal,
                rejection: None,
            },
            AuthOutcome::Anonymous => Self::anonymous(),
            AuthOutcome::Rejected(reason) => Self {
                principal: Principal::anonymous(),
                rejection: Some(reason),
            },
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_authenticated()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Internal("no caller identity in request context".into()))
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the caller identity and inject it into request extensions.
///
/// Without a configured [`IdentityResolver`] every caller is anonymous.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let outcome = match request.extensions().get::<IdentityResolver>() {
        Some(IdentityResolver(provider)) => provider.authenticate(request.headers()),
        None => AuthOutcome::Anonymous,
    };
    if let AuthOutcome::Rejected(ref reason) = outcome {
        tracing::debug!(reason = %reason, "credential rejected by identity provider");
    }
    request
        .extensions_mut()
        .insert(CallerIdentity::from_outcome(outcome));
    next.run(request).await
}

/// Route layer for [`AuthPolicy::Admin`]: refuse unauthenticated callers
/// before the route pipeline runs.
pub async fn require_authenticated(request: Request, next: Next) -> Response {
    let identity = request
        .extensions()
        .get::<CallerIdentity>()
        .cloned()
        .unwrap_or_else(CallerIdentity::anonymous);

    if identity.is_authenticated() {
        return next.run(request).await;
    }

    let reason = identity
        .rejection
        .unwrap_or_else(|| "missing authorization header".to_string());
    tracing::warn!(
        path = %request.uri().path(),
        reason = %reason,
        "authorization failed"
    );
    AppError::Unauthorized(reason).into_response()
}
