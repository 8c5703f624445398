//! Bearer-token boundary: HS256 JWTs carrying the caller's role and id.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use coach_progress_core::{Identity, ProgressError, Role};
use jwt_simple::prelude::{Claims, Duration, HS256Key, MACLike};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaims {
    pub role: Role,
    pub id: u64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenAuthority {
    key: HS256Key,
}

impl TokenAuthority {
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.expose_secret().as_bytes()),
        }
    }

    pub fn issue(&self, identity: Identity, valid_for_hours: u64) -> Result<String, ApiError> {
        let custom = RoleClaims {
            role: identity.role(),
            id: identity.id(),
        };
        let claims = Claims::with_custom_claims(custom, Duration::from_hours(valid_for_hours));
        self.key
            .authenticate(claims)
            .map_err(|e| ApiError::Internal(format!("cannot sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        let claims = self
            .key
            .verify_token::<RoleClaims>(token, None)
            .map_err(|e| ApiError::Unauthorized(format!("invalid bearer token: {e}")))?;
        Ok(Identity::from_parts(claims.custom.role, claims.custom.id))
    }
}

/// Default lifetime of tokens minted with `issue-token`.
pub const DEFAULT_TOKEN_HOURS: u64 = 12;

/// Parse `issue-token <role> <id> [hours]` arguments (without the
/// subcommand) into the identity to sign for and the validity in hours.
pub fn token_request(args: &[String]) -> Result<(Identity, u64), ApiError> {
    let usage = || {
        ApiError::from(ProgressError::Validation(
            "usage: issue-token <admin|trainer|user> <id> [hours]".into(),
        ))
    };
    let (role, id) = match args {
        [role, id] | [role, id, _] => (role, id),
        _ => return Err(usage()),
    };
    let role: Role = role.parse()?;
    let id: u64 = id.parse().map_err(|_| usage())?;
    let hours = match args.get(2) {
        Some(h) => h.parse().ok().filter(|h| *h > 0).ok_or_else(usage)?,
        None => DEFAULT_TOKEN_HOURS,
    };
    Ok((Identity::from_parts(role, id), hours))
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed Authorization header".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".into()))
}

/// Extractor resolving the request's bearer token into an [`Identity`].
#[derive(Clone, Copy, Debug)]
pub struct Authenticated(pub Identity);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.auth.verify(token)?;
        tracing::Span::current().record("caller", tracing::field::display(identity.id()));
        Ok(Authenticated(identity))
    }
}
