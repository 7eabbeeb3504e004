use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Tenant, User};
use super::scoped::TenantScopedLookup;
use super::store::{TenantStore, UserStore};

/// In-process storage with the same uniqueness rules as the Postgres schema:
/// unique subdomain, unique `(tenant_id, email)`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|t| t.subdomain == subdomain).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DatabaseError> {
        let mut tenants = self.tenants.write().await;
        if tenants.values().any(|t| t.subdomain == tenant.subdomain) {
            return Err(DatabaseError::UniqueViolation("Organization with this subdomain".to_string()));
        }
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl TenantScopedLookup<User> for MemoryStore {
    async fn find_in_tenant(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| u.tenant_id == tenant_id).cloned())
    }

    async fn exists_in_any_tenant(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.users.read().await.contains_key(&id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email)
            .cloned())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, DatabaseError> {
        let users = self.users.read().await;
        let mut listed: Vec<User> = users.values().filter(|u| u.tenant_id == tenant_id).cloned().collect();
        listed.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(listed)
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        // Check and insert under one write lock, like the unique index does
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.tenant_id == user.tenant_id && u.email == user.email)
        {
            return Err(DatabaseError::UniqueViolation("User with this email".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get_mut(&user.id).filter(|u| u.tenant_id == user.tenant_id) {
            *existing = user.clone();
        }
        Ok(())
    }
}
