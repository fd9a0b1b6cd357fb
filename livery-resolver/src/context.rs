//! Request-scoped tenant execution context.
//!
//! Resolution runs with an active tenant. Ascending to a parent organization
//! switches the active tenant through a [`ContextScope`], which restores the
//! previous tenant when it goes out of scope, on every exit path.

/// The tenant an operation is executing as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantContext {
    /// Domain of the tenant, used as the organization-level owner id.
    pub tenant_domain: String,
    /// Directory id of the organization.
    pub organization_id: String,
}

impl TenantContext {
    pub fn new(tenant_domain: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            tenant_domain: tenant_domain.into(),
            organization_id: organization_id.into(),
        }
    }
}

/// Stack of active tenants for one request.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    root: TenantContext,
    frames: Vec<TenantContext>,
}

impl ExecutionContext {
    pub fn new(root: TenantContext) -> Self {
        Self {
            root,
            frames: Vec::new(),
        }
    }

    /// The request's own tenant, regardless of any entered scope.
    pub fn root(&self) -> &TenantContext {
        &self.root
    }

    /// The active tenant.
    pub fn current(&self) -> &TenantContext {
        self.frames.last().unwrap_or(&self.root)
    }

    /// Number of tenants entered above the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Open a scope whose entered tenants are popped when it is dropped.
    pub fn scope(&mut self) -> ContextScope<'_> {
        let base = self.frames.len();
        ContextScope { ctx: self, base }
    }
}

/// Guard over an [`ExecutionContext`].
pub struct ContextScope<'a> {
    ctx: &'a mut ExecutionContext,
    base: usize,
}

impl ContextScope<'_> {
    /// Make `tenant` the active tenant until the scope ends.
    pub fn enter(&mut self, tenant: TenantContext) {
        self.ctx.frames.push(tenant);
    }

    pub fn current(&self) -> &TenantContext {
        self.ctx.current()
    }

    pub fn depth(&self) -> usize {
        self.ctx.depth()
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.ctx.frames.truncate(self.base);
    }
}
