//! Caller identity taken from upstream-authenticated request headers.
//!
//! Token validation happens in front of this service. Handlers only read the
//! user id the gateway injected and forward the bearer token to the diagram
//! service unchanged.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::{Credential, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: Option<UserId>,
    pub credential: Credential,
}

impl Caller {
    /// Returns the user id, or 401 when the request carried none.
    pub fn require_user(&self) -> Result<UserId, ApiError> {
        self.user
            .ok_or_else(|| ApiError::Unauthorized("missing user identity".to_string()))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.headers.get(USER_ID_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| ApiError::BadRequest("invalid X-User-Id header".to_string()))?;
                let id = raw.trim().parse::<i64>().map_err(|_| {
                    ApiError::BadRequest(format!("invalid X-User-Id header: {raw}"))
                })?;
                Some(UserId::new(id))
            }
            None => None,
        };

        let credential = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(Credential::new)
            .unwrap_or_else(Credential::anonymous);

        Ok(Caller { user, credential })
    }
}
