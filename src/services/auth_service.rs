use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tenant_service::{TenantSelector, TenantService};
use super::user_service::normalize_email;
use crate::auth::{password, Principal, TenantContext, TokenCodec};
use crate::database::models::UserProfile;
use crate::database::{resolve_tenant_scoped, Resolution, TenantStore, UserStore};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub subdomain: Option<String>,
    pub organization_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    /// Token lifetime in milliseconds, rounded up to whole seconds. Expiry
    /// is counted from the start of the issuing second, so the token may be
    /// refused up to 999 ms before this much time has passed.
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Credential login and current-identity lookups
pub struct AuthService {
    tokens: Arc<TokenCodec>,
    tenants: TenantService,
    users: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        tokens: Arc<TokenCodec>,
        tenants: Arc<dyn TenantStore>,
        users: Arc<dyn UserStore>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            tokens,
            tenants: TenantService::new(tenants),
            users,
            bcrypt_cost,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.tokens.clone(),
            state.tenants.clone(),
            state.users.clone(),
            state.bcrypt_cost,
        )
    }

    /// Unknown organization, unknown email, wrong password and inactive
    /// account all end in the same 401 body, and each pays for exactly one
    /// bcrypt verification.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let mut field_errors = HashMap::new();
        let email = request.email.as_deref().map(normalize_email).unwrap_or_default();
        if email.is_empty() {
            field_errors.insert("email".to_string(), "This field is required".to_string());
        }
        let password = request.password.unwrap_or_default();
        if password.is_empty() {
            field_errors.insert("password".to_string(), "This field is required".to_string());
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Missing credentials", Some(field_errors)));
        }

        let selector = TenantSelector::from_parts(request.subdomain.as_deref(), request.organization_id.as_deref())?;

        let Some(tenant) = self.tenants.resolve(&selector).await? else {
            tracing::warn!(?selector, "Login failed: unknown or inactive organization");
            password::verify_decoy(password, self.bcrypt_cost).await?;
            return Err(ApiError::authentication_failed());
        };

        let Some(user) = self.users.find_by_email(tenant.id, &email).await? else {
            tracing::warn!(tenant = %tenant.id, "Login failed: unknown email");
            password::verify_decoy(password, self.bcrypt_cost).await?;
            return Err(ApiError::authentication_failed());
        };

        // Check the password before the active flag so both failures cost the same
        if !password::verify_password(password, user.password_hash.clone()).await? {
            tracing::warn!(user = %user.id, tenant = %tenant.id, "Login failed: bad password");
            return Err(ApiError::authentication_failed());
        }
        if !user.active {
            tracing::warn!(user = %user.id, tenant = %tenant.id, "Login failed: inactive account");
            return Err(ApiError::authentication_failed());
        }

        let access_token = self.tokens.issue(user.id, tenant.id, user.role)?;
        tracing::info!(user = %user.id, tenant = %tenant.id, role = %user.role, "Login succeeded");

        Ok(LoginResponse {
            access_token,
            expires_in: self.tokens.ttl_ms(),
            user: user.profile(),
        })
    }

    /// Profile of the authenticated caller, looked up inside the bound tenant
    pub async fn current_profile(&self, principal: &Principal) -> Result<UserProfile, ApiError> {
        let tenant_id = TenantContext::require()?;

        match resolve_tenant_scoped(self.users.as_ref(), principal.subject_id, tenant_id).await? {
            Resolution::Found(user) => Ok(user.profile()),
            Resolution::ForbiddenCrossTenant | Resolution::NotFound => {
                tracing::warn!(subject = %principal.subject_id, tenant = %tenant_id, "Token subject has no user row");
                Err(ApiError::unauthorized("Authentication required"))
            }
        }
    }
}
