use std::cell::Cell;
use std::future::Future;

use uuid::Uuid;

use crate::error::ApiError;

tokio::task_local! {
    static CURRENT_TENANT: Cell<Option<Uuid>>;
}

/// Request-scoped tenant binding.
///
/// The value lives in task-local storage for the duration of one request
/// future (see [`TenantContext::scope`]) and disappears with it, whether the
/// future completes, returns an error, or unwinds. Outside a scope there is no
/// tenant at all; callers must treat that as a denial.
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with its own tenant slot, initially holding `tenant_id`.
    pub async fn scope<F>(tenant_id: Option<Uuid>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(Cell::new(tenant_id), fut).await
    }

    /// Bind a tenant inside the current scope. Returns false when called outside one.
    pub fn set(tenant_id: Uuid) -> bool {
        CURRENT_TENANT.try_with(|slot| slot.set(Some(tenant_id))).is_ok()
    }

    pub fn get() -> Option<Uuid> {
        CURRENT_TENANT.try_with(|slot| slot.get()).ok().flatten()
    }

    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|slot| slot.set(None));
    }

    /// The bound tenant, or 401 if nothing is bound. Never falls back to a default.
    pub fn require() -> Result<Uuid, ApiError> {
        Self::get().ok_or_else(|| {
            tracing::warn!("Tenant-scoped operation attempted without a bound tenant");
            ApiError::unauthorized("No tenant bound to request")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unset_outside_any_scope() {
        assert_eq!(TenantContext::get(), None);
        assert!(!TenantContext::set(Uuid::new_v4()));
        assert_eq!(TenantContext::get(), None);
        assert!(TenantContext::require().is_err());
    }

    #[tokio::test]
    async fn bound_inside_scope_and_gone_after() {
        let tenant = Uuid::new_v4();
        let seen = TenantContext::scope(Some(tenant), async { TenantContext::get() }).await;

        assert_eq!(seen, Some(tenant));
        assert_eq!(TenantContext::get(), None);
    }

    #[tokio::test]
    async fn set_and_clear_within_scope() {
        TenantContext::scope(None, async {
            assert_eq!(TenantContext::get(), None);
            let tenant = Uuid::new_v4();
            assert!(TenantContext::set(tenant));
            assert_eq!(TenantContext::require().unwrap(), tenant);
            TenantContext::clear();
            assert_eq!(TenantContext::get(), None);
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_bindings() {
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                tokio::spawn(async move {
                    let tenant = Uuid::new_v4();
                    TenantContext::scope(Some(tenant), async move {
                        tokio::time::sleep(Duration::from_millis(5 * (i % 4))).await;
                        tokio::task::yield_now().await;
                        TenantContext::get() == Some(tenant)
                    })
                    .await
                })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap());
        }
    }

    #[tokio::test]
    async fn binding_does_not_survive_a_failed_request() {
        let tenant = Uuid::new_v4();
        let result: Result<(), &str> = TenantContext::scope(Some(tenant), async { Err("handler failed") }).await;

        assert!(result.is_err());
        assert_eq!(TenantContext::get(), None);
    }

    #[tokio::test]
    async fn binding_does_not_survive_a_panicking_request() {
        let tenant = Uuid::new_v4();
        let handle = tokio::spawn(async move {
            TenantContext::scope(Some(tenant), async {
                panic!("handler blew up");
            })
            .await
        });

        assert!(handle.await.is_err());
        assert_eq!(TenantContext::get(), None);
    }
}
