use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::models::Tenant;
use crate::database::{DatabaseError, TenantStore};
use crate::error::ApiError;

/// How a login request names its organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSelector {
    Subdomain(String),
    OrganizationId(Uuid),
}

impl TenantSelector {
    /// Exactly one of the two must be given; blank strings count as absent.
    pub fn from_parts(subdomain: Option<&str>, organization_id: Option<&str>) -> Result<Self, ApiError> {
        let subdomain = subdomain.map(str::trim).filter(|s| !s.is_empty());
        let organization_id = organization_id.map(str::trim).filter(|s| !s.is_empty());

        match (subdomain, organization_id) {
            (Some(_), Some(_)) => Err(selector_error("Provide either subdomain or organizationId, not both")),
            (None, None) => Err(selector_error("Either subdomain or organizationId is required")),
            (Some(subdomain), None) => Ok(TenantSelector::Subdomain(subdomain.to_lowercase())),
            (None, Some(raw)) => Uuid::parse_str(raw)
                .map(TenantSelector::OrganizationId)
                .map_err(|_| ApiError::field_error("organizationId", "Invalid organization id")),
        }
    }
}

fn selector_error(message: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert("subdomain".to_string(), message.to_string());
    field_errors.insert("organizationId".to_string(), message.to_string());
    ApiError::validation_error(message, Some(field_errors))
}

pub struct TenantService {
    tenants: Arc<dyn TenantStore>,
}

impl TenantService {
    pub fn new(tenants: Arc<dyn TenantStore>) -> Self {
        Self { tenants }
    }

    /// Active tenant for the selector, if any
    pub async fn resolve(&self, selector: &TenantSelector) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = match selector {
            TenantSelector::Subdomain(subdomain) => self.tenants.find_by_subdomain(subdomain).await?,
            TenantSelector::OrganizationId(id) => self.tenants.find_by_id(*id).await?,
        };

        Ok(tenant.filter(|t| t.active))
    }
}
