//! Wiring of the resolver, gate and administration facade

use std::sync::Arc;

use tracing::info;

use crate::admin::PermissionAdmin;
use crate::audit::AuditLogger;
use crate::config::PermissionsConfig;
use crate::defaults::RoleDefaults;
use crate::error::Result;
use crate::gate::PermissionGate;
use crate::permission::resolver::{EmptyOverridePolicy, Resolver};
use crate::storage::OverrideStore;

/// One resolver shared by the guard and the administration side
pub struct PermissionEngine {
    resolver: Arc<Resolver>,
    gate: PermissionGate,
    admin: PermissionAdmin,
}

impl PermissionEngine {
    pub fn new(
        store: Arc<dyn OverrideStore>,
        defaults: Arc<RoleDefaults>,
        empty_policy: EmptyOverridePolicy,
        audit: Option<AuditLogger>,
    ) -> Self {
        let admin = PermissionAdmin::new(store, defaults, empty_policy);
        let resolver = admin.resolver();

        let gate = PermissionGate::new(resolver.clone());
        let gate = match audit {
            Some(audit) => gate.with_audit(audit),
            None => gate,
        };

        Self {
            resolver,
            gate,
            admin,
        }
    }

    pub fn from_config(config: &PermissionsConfig) -> Result<Self> {
        config.validate()?;
        let engine = Self::new(
            config.build_store()?,
            config.build_defaults()?,
            config.empty_override_policy,
            config.build_audit(),
        );
        info!(
            "Permission engine ready ({:?} store, {:?} on empty overrides)",
            config.store.backend, config.empty_override_policy
        );
        Ok(engine)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn admin(&self) -> &PermissionAdmin {
        &self.admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::catalog::{Action, Module};
    use crate::permission::models::ModulePermission;

    #[test]
    fn test_admin_writes_visible_to_gate() {
        let engine = PermissionEngine::from_config(&PermissionsConfig::default()).unwrap();
        let actor = Actor::user("u1", "medecin");

        engine
            .gate()
            .require(Some(&actor), Module::Consultations, Action::Write, None)
            .unwrap();

        engine
            .admin()
            .save_overrides(
                &actor.id,
                &[ModulePermission::new(Module::Laboratoire, [Action::Read])],
            )
            .unwrap();

        assert!(engine
            .gate()
            .require(Some(&actor), Module::Consultations, Action::Write, None)
            .is_err());
        assert!(engine
            .resolver()
            .check(&actor, Module::Laboratoire, Action::Read, None)
            .unwrap());
        assert_eq!(engine.gate().audit().map(|a| a.len()), Some(2));
    }
}
