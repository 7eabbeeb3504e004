use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Tenant-level roles. Stored and transmitted in upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full tenant administration
    Admin,
    /// Read/assign across all of the tenant's work orders
    Dispatcher,
    /// Restricted to resources that reference their own identity
    Engineer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Dispatcher => "DISPATCHER",
            Role::Engineer => "ENGINEER",
        }
    }

    /// The single capability granted to a principal holding this role
    pub fn authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "DISPATCHER" => Ok(Role::Dispatcher),
            "ENGINEER" => Ok(Role::Engineer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Authenticated identity bound to a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,
    pub active: bool,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn authorities(&self) -> Vec<String> {
        vec![self.role.authority()]
    }
}

/// Handlers that take a `Principal` argument are only reachable with a
/// verified token; anything else is rejected with 401 before the body runs.
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
