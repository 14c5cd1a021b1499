//! Session token middleware
//!
//! Reads the session token from the configured request channel, verifies it,
//! and makes the caller's identity available to handlers through the
//! [`AuthUser`] extractor. Every rejection is a plain 401; the reason is only
//! logged.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use phonebook_auth::{SessionClaims, SessionTokens};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// Default name of the session cookie
pub const DEFAULT_TOKEN_COOKIE: &str = "token";

/// Where the gate looks for the session token. Exactly one channel is
/// active; the other is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// `Cookie: <name>=<token>`
    Cookie { name: String },
    /// `Authorization: Bearer <token>`
    Bearer,
}

impl Default for TokenSource {
    fn default() -> Self {
        TokenSource::Cookie {
            name: DEFAULT_TOKEN_COOKIE.to_string(),
        }
    }
}

impl TokenSource {
    /// Pull the raw token out of the request headers
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let token = match self {
            TokenSource::Cookie { name } => headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .flat_map(|cookies| cookies.split(';'))
                .map(str::trim)
                .find_map(|cookie| {
                    cookie
                        .strip_prefix(name.as_str())
                        .and_then(|rest| rest.strip_prefix('='))
                }),
            TokenSource::Bearer => headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim),
        };

        token.filter(|token| !token.is_empty())
    }
}

/// Authenticated caller, inserted into request extensions by [`require_auth`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// State shared by every instance of the gate
#[derive(Debug, Clone)]
pub struct GateState {
    pub tokens: Arc<SessionTokens>,
    pub source: TokenSource,
}

impl GateState {
    pub fn new(tokens: Arc<SessionTokens>, source: TokenSource) -> Self {
        Self { tokens, source }
    }
}

/// Reject the request with 401 unless it carries a valid session token.
///
/// Missing, malformed, forged and expired tokens all get the same response,
/// and the downstream handler never runs.
pub async fn require_auth(
    State(gate): State<Arc<GateState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = gate.source.extract(request.headers()) else {
        debug!("Rejected request without session token");
        return Err(ApiError::Unauthenticated);
    };

    let claims: SessionClaims = gate.tokens.verify(token).map_err(|e| {
        debug!(reason = %e, "Rejected session token");
        ApiError::Unauthenticated
    })?;

    let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| {
        debug!("Rejected session token: user_id is not a UUID");
        ApiError::Unauthenticated
    })?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}
