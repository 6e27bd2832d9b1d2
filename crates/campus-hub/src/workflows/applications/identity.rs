//! Caller identity forwarded by the authentication gateway.
//!
//! Tokens are verified upstream; by the time a request reaches this service
//! the gateway has stamped the user id, role, and (optionally) department
//! into headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::domain::{Caller, Role, UserId};
use super::envelope::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_DEPARTMENT_HEADER: &str = "x-user-department";

/// Build a [`Caller`] from gateway headers.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let user_id = header_value(headers, USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthenticated("missing caller identity"))?;
    let raw_role = header_value(headers, USER_ROLE_HEADER)
        .ok_or_else(|| ApiError::unauthenticated("missing caller role"))?;
    let role = Role::parse(raw_role)
        .ok_or_else(|| ApiError::unauthenticated(format!("unknown role '{raw_role}'")))?;

    Ok(Caller {
        user_id: UserId::new(user_id),
        role,
        department: header_value(headers, USER_DEPARTMENT_HEADER).map(str::to_string),
    })
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers)
    }
}
