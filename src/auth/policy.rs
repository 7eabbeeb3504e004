// Route access guards, evaluated after the request authenticator has run.
//
// Guards take the resolved principal (if any) and return an AccessDecision;
// handlers turn the decision into a response with `into_result`. Ownership
// narrowing for engineers happens in the resource layer, not here.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use super::principal::{Principal, Role};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    DenyUnauthenticated,
    DenyForbidden,
    DenyValidation(String),
}

impl AccessDecision {
    pub fn into_result(self) -> Result<(), ApiError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::DenyUnauthenticated => Err(ApiError::unauthorized("Authentication required")),
            AccessDecision::DenyForbidden => Err(ApiError::forbidden("Access denied")),
            AccessDecision::DenyValidation(reason) => Err(ApiError::bad_request(reason)),
        }
    }
}

/// An inactive principal is treated as no principal at all.
fn active(principal: Option<&Principal>) -> Option<&Principal> {
    principal.filter(|p| p.active)
}

pub fn authenticated(principal: Option<&Principal>) -> AccessDecision {
    match active(principal) {
        Some(_) => AccessDecision::Allow,
        None => AccessDecision::DenyUnauthenticated,
    }
}

pub fn any_of_roles(principal: Option<&Principal>, roles: &[Role]) -> AccessDecision {
    match active(principal) {
        None => AccessDecision::DenyUnauthenticated,
        Some(p) if roles.contains(&p.role) => AccessDecision::Allow,
        Some(p) => {
            tracing::warn!(subject = %p.subject_id, role = %p.role, "Role check failed");
            AccessDecision::DenyForbidden
        }
    }
}

/// Caller is the target identity, or holds `role`.
pub fn self_or_role(principal: Option<&Principal>, target_id: &str, role: Role) -> AccessDecision {
    let Some(p) = active(principal) else {
        return AccessDecision::DenyUnauthenticated;
    };
    let Ok(target) = Uuid::parse_str(target_id) else {
        return AccessDecision::DenyValidation(format!("Invalid id: {}", target_id));
    };

    if p.subject_id == target || p.role == role {
        AccessDecision::Allow
    } else {
        tracing::warn!(subject = %p.subject_id, target = %target, "Ownership check failed");
        AccessDecision::DenyForbidden
    }
}

/// Route layer for routers whose every route needs a principal.
pub async fn require_authenticated(request: Request, next: Next) -> Result<Response, ApiError> {
    authenticated(request.extensions().get::<Principal>()).into_result()?;
    Ok(next.run(request).await)
}
