//! Role enforcement over identities established upstream.
//!
//! Authentication itself (sessions, passwords, token issuance) lives in the
//! auth gateway in front of this service. The gateway forwards the resolved
//! identity as `x-user-id` / `x-user-name` / `x-user-role` headers; this
//! module turns those into a typed [`AuthenticatedUser`] and gates routers
//! by role.

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Application roles, mirrored from the users table
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Warehouse,
}

/// Identity of the caller, resolved by the upstream auth gateway
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Parses the forwarded identity headers; `None` when the request is anonymous
pub fn identity_from_headers(headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())?;
    let role = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Role::from_str(v).ok())?;
    let name = headers
        .get("x-user-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    Some(AuthenticatedUser { id, name, role })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The auth middleware stores the parsed identity; fall back to the raw
        // headers for handlers used outside a gated router.
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        identity_from_headers(&parts.headers)
            .ok_or_else(|| ServiceError::Unauthorized("Missing or invalid identity".to_string()))
    }
}

async fn require_roles(
    roles: &'static [Role],
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = identity_from_headers(request.headers())
        .ok_or_else(|| ServiceError::Unauthorized("Missing or invalid identity".to_string()))?;

    if !roles.is_empty() && !user.has_role(roles) {
        return Err(ServiceError::Forbidden(format!(
            "Role '{}' may not access this resource",
            user.role
        )));
    }

    let mut request = request;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extension methods for Router to add role gates
pub trait RoleRouterExt {
    /// Any authenticated caller
    fn with_auth(self) -> Self;
    /// Callers holding one of the listed roles
    fn with_roles(self, roles: &'static [Role]) -> Self;
}

impl<S> RoleRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.with_roles(&[])
    }

    fn with_roles(self, roles: &'static [Role]) -> Self {
        self.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| require_roles(roles, request, next),
        ))
    }
}
