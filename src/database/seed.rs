use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Tenant, User};
use super::store::{TenantStore, UserStore};
use crate::auth::{password, Role};

pub const DEMO_SUBDOMAIN: &str = "acme";
pub const DEMO_ADMIN_EMAIL: &str = "admin@acme.com";
pub const DEMO_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Password(#[from] password::PasswordError),
}

/// Ensure a tenant with the given subdomain and one admin user exist.
/// Existing rows are left untouched.
pub async fn seed_tenant_admin(
    tenants: &dyn TenantStore,
    users: &dyn UserStore,
    name: &str,
    subdomain: &str,
    admin_email: &str,
    admin_password: &str,
    bcrypt_cost: u32,
) -> Result<(Tenant, User), SeedError> {
    let tenant = match tenants.find_by_subdomain(subdomain).await? {
        Some(existing) => existing,
        None => {
            let tenant = Tenant::new(name, subdomain);
            tenants.insert_tenant(&tenant).await?;
            info!("Seeded organization '{}' ({})", tenant.subdomain, tenant.id);
            tenant
        }
    };

    let email = admin_email.trim().to_lowercase();
    if let Some(existing) = users.find_by_email(tenant.id, &email).await? {
        return Ok((tenant, existing));
    }

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        tenant_id: tenant.id,
        email,
        full_name: format!("{} Administrator", name),
        password_hash: password::hash_password(admin_password.to_string(), bcrypt_cost).await?,
        role: Role::Admin,
        active: true,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    users.insert_user(&admin).await?;
    info!("Seeded admin '{}' for organization '{}'", admin.email, tenant.subdomain);

    Ok((tenant, admin))
}

/// The `acme` demo organization with `admin@acme.com` / `admin123`
pub async fn seed_demo(
    tenants: &dyn TenantStore,
    users: &dyn UserStore,
    bcrypt_cost: u32,
) -> Result<(Tenant, User), SeedError> {
    seed_tenant_admin(
        tenants,
        users,
        "Acme",
        DEMO_SUBDOMAIN,
        DEMO_ADMIN_EMAIL,
        DEMO_ADMIN_PASSWORD,
        bcrypt_cost,
    )
    .await
}
