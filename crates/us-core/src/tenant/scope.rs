//! Request-scoped holder for the active tenant.
//!
//! The slot is a tokio task-local established by [`RequestTenant::scope`].
//! It exists only for the duration of the wrapped future, so the value is
//! discarded when the request finishes, fails or panics. Concurrent requests
//! each get their own slot.

use std::cell::RefCell;
use std::future::Future;

use super::{TenantContext, TenantError, TenantId, TenantResult, TenantType};

tokio::task_local! {
    static CURRENT_TENANT: RefCell<Option<TenantContext>>;
}

/// Accessors for the tenant of the current request.
pub struct RequestTenant;

impl RequestTenant {
    /// Runs `fut` with an empty tenant slot.
    pub async fn scope<F: Future>(fut: F) -> F::Output {
        CURRENT_TENANT.scope(RefCell::new(None), fut).await
    }

    /// Runs `fut` with the slot already holding `ctx`.
    pub async fn scope_with<F: Future>(ctx: TenantContext, fut: F) -> F::Output {
        CURRENT_TENANT.scope(RefCell::new(Some(ctx)), fut).await
    }

    /// Sets the active tenant.
    ///
    /// # Errors
    ///
    /// Returns `TenantError::NoActiveScope` when called outside a request
    /// scope.
    pub fn set(tenant_id: impl Into<TenantId>, tenant_type: TenantType) -> TenantResult<()> {
        let ctx = TenantContext::new(tenant_id, tenant_type);
        CURRENT_TENANT
            .try_with(|slot| {
                *slot.borrow_mut() = Some(ctx);
            })
            .map_err(|_| TenantError::NoActiveScope)
    }

    /// Returns the active tenant, if any.
    pub fn current() -> Option<TenantContext> {
        CURRENT_TENANT
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    }

    /// Returns the active tenant ID, if any.
    pub fn get() -> Option<TenantId> {
        Self::current().map(|ctx| ctx.tenant_id)
    }

    /// Returns the active tenant type, if any.
    pub fn get_type() -> Option<TenantType> {
        Self::current().map(|ctx| ctx.tenant_type)
    }

    /// True only when the active tenant is root.
    pub fn is_super_admin() -> bool {
        Self::get_type() == Some(TenantType::Root)
    }

    /// Empties the slot. Does nothing outside a request scope.
    pub fn clear() {
        let _ = CURRENT_TENANT.try_with(|slot| {
            slot.borrow_mut().take();
        });
    }
}
