use async_trait::async_trait;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Tenant, User};
use super::scoped::TenantScopedLookup;

/// Tenant directory used by the login flow
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError>;

    /// Fails with `UniqueViolation` if the subdomain is taken
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DatabaseError>;

    /// Storage reachability, for `/health`
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// User persistence. Every read that a request can reach is keyed by tenant;
/// the unscoped `exists_in_any_tenant` is only for forbidden-vs-not-found.
#[async_trait]
pub trait UserStore: TenantScopedLookup<User> + Send + Sync {
    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, DatabaseError>;

    /// Fails with `UniqueViolation` if `(tenant_id, email)` is taken
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Last write wins; `version` is stored as given
    async fn update_user(&self, user: &User) -> Result<(), DatabaseError>;
}
