//! Permission checking logic

use crate::catalog::{Action, Module, Submodule};
use crate::permission::models::{ModulePermission, PermissionRequest};

/// Matches requests against a resolved permission set
pub struct PermissionChecker;

impl PermissionChecker {
    /// Check one (module, action, submodule?) tuple.
    ///
    /// A missing module is a plain `false`. With a submodule, the action must
    /// be listed on that submodule; module-level grants do not cascade down.
    pub fn is_granted(
        permissions: &[ModulePermission],
        module: Module,
        action: Action,
        submodule: Option<Submodule>,
    ) -> bool {
        permissions
            .iter()
            .find(|p| p.module == module)
            .map(|p| p.grants(action, submodule))
            .unwrap_or(false)
    }

    pub fn is_request_granted(permissions: &[ModulePermission], request: &PermissionRequest) -> bool {
        Self::is_granted(permissions, request.module, request.action, request.submodule)
    }
}
