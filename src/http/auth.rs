//! Authenticated-identity extractor.
//!
//! Authentication itself is an upstream collaborator: the gateway
//! terminates the token and installs `x-user-id` / `x-user-role`
//! headers, which this service trusts without re-verification.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::domain::value_objects::{Identity, UserRole};
use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn identity(&self) -> Identity {
        Identity { id: self.id, role: self.role }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not authorized to access this route".to_string()))
        }
    }
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Not authorized to access this route".to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(unauthorized)?;
        let id = Uuid::parse_str(id).map_err(|_| unauthorized())?;

        let role = match parts.headers.get(USER_ROLE_HEADER) {
            Some(value) => value
                .to_str()
                .ok()
                .and_then(|v| v.parse::<UserRole>().ok())
                .ok_or_else(unauthorized)?,
            None => UserRole::default(),
        };

        Ok(AuthUser { id, role })
    }
}
