use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{password, Principal, Role, TenantContext};
use crate::database::models::{User, UserProfile};
use crate::database::{resolve_tenant_scoped, UserStore};
use crate::error::ApiError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// User administration inside the caller's organization.
///
/// The tenant always comes from [`TenantContext`]; request bodies cannot name
/// one. Lookups go through `resolve_tenant_scoped`, so a user in another
/// organization is 403 and an unknown id is 404.
pub struct UserService {
    users: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    pub async fn create(&self, input: CreateUserRequest) -> Result<UserProfile, ApiError> {
        let tenant_id = TenantContext::require()?;

        let mut field_errors = HashMap::new();
        let email = input.email.as_deref().map(normalize_email).unwrap_or_default();
        if let Err(reason) = validate_email_format(&email) {
            field_errors.insert("email".to_string(), reason);
        }
        let full_name = input.full_name.as_deref().map(str::trim).unwrap_or_default().to_string();
        if full_name.is_empty() {
            field_errors.insert("fullName".to_string(), "This field is required".to_string());
        }
        let password = input.password.unwrap_or_default();
        if let Err(reason) = validate_password(&password) {
            field_errors.insert("password".to_string(), reason);
        }
        if !field_errors.is_empty() {
            return Err(ApiError::validation_error("Invalid user", Some(field_errors)));
        }

        if self.users.find_by_email(tenant_id, &email).await?.is_some() {
            return Err(ApiError::already_exists("User with this email already exists"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            tenant_id,
            email,
            full_name,
            password_hash: password::hash_password(password, self.bcrypt_cost).await?,
            role: input.role.unwrap_or(Role::Engineer),
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        // A concurrent create can slip past the pre-check; the store's
        // UniqueViolation converts to the same "already exists" error.
        self.users.insert_user(&user).await?;
        tracing::info!(user = %user.id, tenant = %tenant_id, role = %user.role, "User created");

        Ok(user.profile())
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        let tenant_id = TenantContext::require()?;
        resolve_tenant_scoped(self.users.as_ref(), id, tenant_id)
            .await?
            .into_result("User")
    }

    pub async fn list(&self) -> Result<Vec<UserProfile>, ApiError> {
        let tenant_id = TenantContext::require()?;
        let users = self.users.list_by_tenant(tenant_id).await?;
        Ok(users.iter().map(User::profile).collect())
    }

    /// Role and active flag are admin-only fields; everyone allowed to reach
    /// the row may change name and password.
    pub async fn update(&self, caller: &Principal, id: Uuid, input: UpdateUserRequest) -> Result<UserProfile, ApiError> {
        if (input.role.is_some() || input.active.is_some()) && !caller.has_role(Role::Admin) {
            return Err(ApiError::forbidden("Only administrators can change role or active status"));
        }

        let mut user = self.get(id).await?;

        if let Some(full_name) = input.full_name {
            let full_name = full_name.trim().to_string();
            if full_name.is_empty() {
                return Err(ApiError::field_error("fullName", "Must not be blank"));
            }
            user.full_name = full_name;
        }
        if let Some(new_password) = input.password {
            validate_password(&new_password).map_err(|reason| ApiError::field_error("password", reason))?;
            user.password_hash = password::hash_password(new_password, self.bcrypt_cost).await?;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(active) = input.active {
            user.active = active;
        }

        user.touch();
        self.users.update_user(&user).await?;
        tracing::info!(user = %user.id, version = user.version, by = %caller.subject_id, "User updated");

        Ok(user.profile())
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<UserProfile, ApiError> {
        let mut user = self.get(id).await?;
        user.active = false;
        user.touch();
        self.users.update_user(&user).await?;
        tracing::info!(user = %user.id, "User deactivated");

        Ok(user.profile())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("This field is required".to_string());
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("This field is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::TEST_BCRYPT_COST;
    use crate::database::models::Tenant;
    use crate::database::{DatabaseError, MemoryStore, TenantScopedLookup, TenantStore};
    use async_trait::async_trait;

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.to_string()),
            full_name: Some("Field Engineer".to_string()),
            password: Some("password1".to_string()),
            role: Some(Role::Engineer),
        }
    }

    fn admin(tenant_id: Uuid) -> Principal {
        Principal {
            subject_id: Uuid::new_v4(),
            tenant_id,
            role: Role::Admin,
            active: true,
        }
    }

    async fn tenants(store: &MemoryStore) -> (Uuid, Uuid) {
        let t1 = Tenant::new("One", "one");
        let t2 = Tenant::new("Two", "two");
        store.insert_tenant(&t1).await.unwrap();
        store.insert_tenant(&t2).await.unwrap();
        (t1.id, t2.id)
    }

    #[tokio::test]
    async fn create_requires_bound_tenant() {
        let service = UserService::new(Arc::new(MemoryStore::new()), TEST_BCRYPT_COST);
        let err = service.create(request("e@x.com")).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn email_uniqueness_is_scoped_to_tenant() {
        let store = MemoryStore::new();
        let (t1, t2) = tenants(&store).await;
        let service = UserService::new(Arc::new(store.clone()), TEST_BCRYPT_COST);

        TenantContext::scope(Some(t1), async {
            service.create(request("E@x.com")).await.unwrap();
            let dup = service.create(request("e@X.com ")).await.unwrap_err();
            assert_eq!(dup.error_code(), "ALREADY_EXISTS");
        })
        .await;

        let created = TenantContext::scope(Some(t2), service.create(request("e@x.com"))).await.unwrap();
        assert_eq!(created.email, "e@x.com");
        assert_eq!(store.list_by_tenant(t2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let service = UserService::new(Arc::new(MemoryStore::new()), TEST_BCRYPT_COST);
        let err = TenantContext::scope(Some(Uuid::new_v4()), service.create(CreateUserRequest::default()))
            .await
            .unwrap_err();

        match err {
            ApiError::ValidationError { field_errors: Some(fields), .. } => {
                assert!(fields.contains_key("email"));
                assert!(fields.contains_key("fullName"));
                assert!(fields.contains_key("password"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Store whose pre-check never sees existing rows, as in a create race
    struct RacingStore(MemoryStore);

    #[async_trait]
    impl TenantScopedLookup<User> for RacingStore {
        async fn find_in_tenant(&self, id: Uuid, tenant_id: Uuid) -> Result<Option<User>, DatabaseError> {
            self.0.find_in_tenant(id, tenant_id).await
        }

        async fn exists_in_any_tenant(&self, id: Uuid) -> Result<bool, DatabaseError> {
            self.0.exists_in_any_tenant(id).await
        }
    }

    #[async_trait]
    impl UserStore for RacingStore {
        async fn find_by_email(&self, _tenant_id: Uuid, _email: &str) -> Result<Option<User>, DatabaseError> {
            Ok(None)
        }

        async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<User>, DatabaseError> {
            self.0.list_by_tenant(tenant_id).await
        }

        async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
            self.0.insert_user(user).await
        }

        async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
            self.0.update_user(user).await
        }
    }

    #[tokio::test]
    async fn storage_unique_violation_matches_precheck_error() {
        let inner = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let checked = UserService::new(Arc::new(inner.clone()), TEST_BCRYPT_COST);
        let racing = UserService::new(Arc::new(RacingStore(inner)), TEST_BCRYPT_COST);

        TenantContext::scope(Some(tenant), async {
            racing.create(request("race@x.com")).await.unwrap();
            let from_storage = racing.create(request("race@x.com")).await.unwrap_err();
            let from_precheck = checked.create(request("race@x.com")).await.unwrap_err();

            assert_eq!(from_storage.status_code(), from_precheck.status_code());
            assert_eq!(from_storage.to_json(), from_precheck.to_json());
        })
        .await;
    }

    #[tokio::test]
    async fn get_distinguishes_cross_tenant_from_missing() {
        let store = MemoryStore::new();
        let (t1, t2) = tenants(&store).await;
        let service = UserService::new(Arc::new(store), TEST_BCRYPT_COST);

        let u1 = TenantContext::scope(Some(t1), service.create(request("u1@one.com"))).await.unwrap();
        let u2 = TenantContext::scope(Some(t2), service.create(request("u2@two.com"))).await.unwrap();

        TenantContext::scope(Some(t1), async {
            assert_eq!(service.get(u1.id).await.unwrap().id, u1.id);
            assert_eq!(service.get(u2.id).await.unwrap_err().status_code(), 403);
            assert_eq!(service.get(Uuid::new_v4()).await.unwrap_err().status_code(), 404);
        })
        .await;
    }

    #[tokio::test]
    async fn update_bumps_version_and_guards_admin_fields() {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let service = UserService::new(Arc::new(store.clone()), TEST_BCRYPT_COST);

        TenantContext::scope(Some(tenant), async {
            let created = service.create(request("tech@x.com")).await.unwrap();
            let me = Principal {
                subject_id: created.id,
                tenant_id: tenant,
                role: Role::Engineer,
                active: true,
            };

            let promote = UpdateUserRequest {
                role: Some(Role::Admin),
                ..Default::default()
            };
            assert_eq!(service.update(&me, created.id, promote).await.unwrap_err().status_code(), 403);

            let rename = UpdateUserRequest {
                full_name: Some("Renamed".to_string()),
                ..Default::default()
            };
            let renamed = service.update(&me, created.id, rename).await.unwrap();
            assert_eq!(renamed.full_name, "Renamed");
            assert_eq!(service.get(created.id).await.unwrap().version, 1);

            let deactivated = service.deactivate(created.id).await.unwrap();
            assert!(!deactivated.active);
            assert_eq!(service.get(created.id).await.unwrap().version, 2);

            let reactivate = UpdateUserRequest {
                active: Some(true),
                ..Default::default()
            };
            assert!(service.update(&admin(tenant), created.id, reactivate).await.unwrap().active);
        })
        .await;
    }
}
