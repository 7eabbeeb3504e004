use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Tenant, User, UserRow};
use super::scoped::TenantScopedLookup;
use super::store::{TenantStore, UserStore};

const USER_COLUMNS: &str =
    "id, tenant_id, email, full_name, password_hash, role, active, version, created_at, updated_at";

/// sqlx-backed tenant and user storage
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Remap the storage uniqueness error so callers see the same error a pre-check would give
fn map_unique(err: sqlx::Error, what: &str) -> DatabaseError {
    if DatabaseManager::is_unique_violation(&err) {
        DatabaseError::UniqueViolation(what.to_string())
    } else {
        DatabaseError::Sqlx(err)
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, subdomain, active, created_at FROM tenants WHERE subdomain = $1",
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, subdomain, active, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO tenants (id, name, subdomain, active, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(tenant.id)
            .bind(&tenant.name)
            .bind(&tenant.subdomain)
            .bind(tenant.active)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "Organization with this subdomain"))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[async_trait]
impl TenantScopedLookup<User> for PgStore {
    async fn find_in_tenant(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE id = $1 AND tenant_id = $2", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn exists_in_any_tenant(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, tenant_id: Uuid, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE tenant_id = $1 AND email = $2", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(tenant_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, DatabaseError> {
        let query = format!("SELECT {} FROM users WHERE tenant_id = $1 ORDER BY email", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let query = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            USER_COLUMNS
        );
        sqlx::query(&query)
            .bind(user.id)
            .bind(user.tenant_id)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.active)
            .bind(user.version)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, "User with this email"))?;

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = $3, password_hash = $4, role = $5, active = $6, version = $7, updated_at = $8
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(user.id)
        .bind(user.tenant_id)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.active)
        .bind(user.version)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
