//! API key authentication.
//!
//! Every API key belongs to one project and one role. The middleware resolves
//! the bearer token and attaches the resulting [`Actor`] to the request.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::AppState;
use crate::models::Role;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub project_id: Uuid,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&request).ok_or_else(|| {
        tracing::warn!("Missing or malformed Authorization header");
        StatusCode::UNAUTHORIZED
    })?;

    let key = state
        .db
        .resolve_api_key(token)
        .map_err(|e| {
            tracing::error!("API key lookup failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or_else(|| {
            tracing::warn!("Invalid API key provided");
            StatusCode::UNAUTHORIZED
        })?;

    request.extensions_mut().insert(Actor {
        project_id: key.project_id,
        role: key.role,
    });
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
