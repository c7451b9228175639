//! Guard for protected call sites
//!
//! The gate turns resolver answers into errors: a missing actor is an
//! authentication failure, a `false` check is an authorization failure that
//! carries the request and the actor's role.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::actor::Actor;
use crate::audit::{AuditLogEntry, AuditLogger, AuditOutcome};
use crate::catalog::{Action, Module, Submodule};
use crate::error::{Error, Result};
use crate::permission::checker::PermissionChecker;
use crate::permission::models::PermissionRequest;
use crate::permission::resolver::{parse_request, Resolver};

/// Enforces permission checks for route and action guards
pub struct PermissionGate {
    resolver: Arc<Resolver>,
    audit: Option<AuditLogger>,
}

impl PermissionGate {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            audit: None,
        }
    }

    /// Record every decision in the given audit logger
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn audit(&self) -> Option<&AuditLogger> {
        self.audit.as_ref()
    }

    /// Require a single typed request
    pub fn check(&self, actor: Option<&Actor>, request: &PermissionRequest) -> Result<()> {
        let actor = self.authenticate(actor, request)?;
        if self.resolver.check_request(actor, request)? {
            self.record(Some(actor), request, AuditOutcome::Allowed);
            Ok(())
        } else {
            Err(self.deny(actor, request))
        }
    }

    pub fn require(
        &self,
        actor: Option<&Actor>,
        module: Module,
        action: Action,
        submodule: Option<Submodule>,
    ) -> Result<()> {
        self.check(
            actor,
            &PermissionRequest {
                module,
                action,
                submodule,
            },
        )
    }

    /// Require a request given as untyped identifiers.
    ///
    /// Identifiers outside the catalog are denied like any missing grant.
    pub fn require_raw(
        &self,
        actor: Option<&Actor>,
        module: &str,
        action: &str,
        submodule: Option<&str>,
    ) -> Result<()> {
        if let Some(request) = parse_request(module, action, submodule) {
            return self.check(actor, &request);
        }

        let Some(actor) = actor else {
            self.record_raw(None, module, action, submodule, AuditOutcome::Unauthenticated);
            return Err(Error::Authentication);
        };

        warn!(
            actor = %actor.id,
            role = %actor.role,
            "Denied {}:{} outside the catalog",
            action,
            module
        );
        self.record_raw(Some(actor), module, action, submodule, AuditOutcome::Denied);
        Err(Error::Authorization {
            module: module.to_string(),
            action: action.to_string(),
            submodule: submodule.map(str::to_string),
            role: actor.role.clone(),
        })
    }

    /// Pass if at least one request is granted; the denial reports the first one.
    ///
    /// An empty list is a caller bug and fails validation.
    pub fn require_any(&self, actor: Option<&Actor>, requests: &[PermissionRequest]) -> Result<()> {
        let Some(first) = requests.first() else {
            return match actor {
                Some(_) => Err(Error::validation("require_any called without requests")),
                None => Err(Error::Authentication),
            };
        };
        let actor = self.authenticate(actor, first)?;

        let permissions = self.resolver.effective_permissions(actor)?;
        for request in requests {
            if PermissionChecker::is_request_granted(&permissions, request) {
                self.record(Some(actor), request, AuditOutcome::Allowed);
                return Ok(());
            }
        }

        debug!("None of {} requests granted for {}", requests.len(), actor.id);
        Err(self.deny(actor, first))
    }

    /// Pass only if every request is granted; the denial reports the first missing one
    pub fn require_all(&self, actor: Option<&Actor>, requests: &[PermissionRequest]) -> Result<()> {
        let Some(actor) = actor else {
            if let Some(first) = requests.first() {
                self.record(None, first, AuditOutcome::Unauthenticated);
            }
            return Err(Error::Authentication);
        };

        let permissions = self.resolver.effective_permissions(actor)?;
        for request in requests {
            if !PermissionChecker::is_request_granted(&permissions, request) {
                return Err(self.deny(actor, request));
            }
        }

        for request in requests {
            self.record(Some(actor), request, AuditOutcome::Allowed);
        }
        Ok(())
    }

    fn authenticate<'a>(
        &self,
        actor: Option<&'a Actor>,
        request: &PermissionRequest,
    ) -> Result<&'a Actor> {
        match actor {
            Some(actor) => Ok(actor),
            None => {
                debug!("Rejected unauthenticated {}", request);
                self.record(None, request, AuditOutcome::Unauthenticated);
                Err(Error::Authentication)
            }
        }
    }

    fn deny(&self, actor: &Actor, request: &PermissionRequest) -> Error {
        warn!(actor = %actor.id, role = %actor.role, "Denied {}", request);
        self.record(Some(actor), request, AuditOutcome::Denied);
        Error::Authorization {
            module: request.module.to_string(),
            action: request.action.to_string(),
            submodule: request.submodule.map(|s| s.to_string()),
            role: actor.role.clone(),
        }
    }

    fn record(&self, actor: Option<&Actor>, request: &PermissionRequest, outcome: AuditOutcome) {
        if let Some(audit) = &self.audit {
            audit.record(AuditLogEntry::new(
                actor,
                request.module.as_str(),
                request.action.as_str(),
                request.submodule.map(|s| s.to_string()),
                outcome,
            ));
        }
    }

    fn record_raw(
        &self,
        actor: Option<&Actor>,
        module: &str,
        action: &str,
        submodule: Option<&str>,
        outcome: AuditOutcome,
    ) {
        if let Some(audit) = &self.audit {
            audit.record(AuditLogEntry::new(
                actor,
                module,
                action,
                submodule.map(str::to_string),
                outcome,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::RoleDefaults;
    use crate::permission::models::ModulePermission;
    use crate::storage::{InMemoryOverrideStore, OverrideStore};

    fn gate() -> (Arc<InMemoryOverrideStore>, PermissionGate) {
        let store = Arc::new(InMemoryOverrideStore::new());
        let resolver = Resolver::new(store.clone(), Arc::new(RoleDefaults::builtin()));
        let gate = PermissionGate::new(Arc::new(resolver)).with_audit(AuditLogger::new());
        (store, gate)
    }

    #[test]
    fn test_missing_actor_is_authentication_error() {
        let (_, gate) = gate();
        let err = gate
            .require(None, Module::Consultations, Action::Read, None)
            .unwrap_err();
        assert!(matches!(err, Error::Authentication));

        let entries = gate.audit().unwrap().entries();
        assert_eq!(entries[0].outcome, AuditOutcome::Unauthenticated);
    }

    #[test]
    fn test_granted_request_passes() {
        let (_, gate) = gate();
        let medecin = Actor::user("u1", "medecin");
        gate.require(Some(&medecin), Module::Consultations, Action::Write, None)
            .unwrap();
        assert_eq!(gate.audit().unwrap().entries()[0].outcome, AuditOutcome::Allowed);
    }

    #[test]
    fn test_denial_carries_request_and_role() {
        let (_, gate) = gate();
        let caissier = Actor::user("u2", "caissier");
        let err = gate
            .require(
                Some(&caissier),
                Module::Pharmacie,
                Action::Delete,
                Some(Submodule::Inventaire),
            )
            .unwrap_err();

        match err {
            Error::Authorization {
                module,
                action,
                submodule,
                role,
            } => {
                assert_eq!(module, "pharmacie");
                assert_eq!(action, "delete");
                assert_eq!(submodule.as_deref(), Some("inventaire"));
                assert_eq!(role, "caissier");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gate.audit().unwrap().entries()[0].outcome, AuditOutcome::Denied);
    }

    #[test]
    fn test_require_raw_unknown_module() {
        let (_, gate) = gate();
        let admin = Actor::user("root", "admin").with_admin(true);

        let err = gate
            .require_raw(Some(&admin), "unknown_module", "read", None)
            .unwrap_err();
        assert!(matches!(err, Error::Authorization { ref module, .. } if module == "unknown_module"));
        assert!(matches!(
            gate.require_raw(None, "unknown_module", "read", None),
            Err(Error::Authentication)
        ));
        gate.require_raw(Some(&admin), "caisse", "admin", Some("cloture"))
            .unwrap();
    }

    #[test]
    fn test_require_any_and_all() {
        let (store, gate) = gate();
        let actor = Actor::user("u3", "medecin");
        store
            .replace_overrides(
                &actor.id,
                &[ModulePermission::new(Module::Laboratoire, [Action::Read])],
            )
            .unwrap();

        let lab_read = PermissionRequest::new(Module::Laboratoire, Action::Read);
        let lab_write = PermissionRequest::new(Module::Laboratoire, Action::Write);

        gate.require_any(Some(&actor), &[lab_write.clone(), lab_read.clone()])
            .unwrap();
        let err = gate
            .require_all(Some(&actor), &[lab_read.clone(), lab_write.clone()])
            .unwrap_err();
        assert!(matches!(err, Error::Authorization { ref action, .. } if action == "write"));

        let err = gate.require_any(Some(&actor), &[lab_write]).unwrap_err();
        assert!(matches!(err, Error::Authorization { .. }));
        gate.require_all(Some(&actor), &[lab_read]).unwrap();
    }

    #[test]
    fn test_require_any_without_requests() {
        let (_, gate) = gate();
        let actor = Actor::user("u4", "medecin");
        assert!(matches!(
            gate.require_any(Some(&actor), &[]),
            Err(Error::Validation(_))
        ));
        gate.require_all(Some(&actor), &[]).unwrap();
    }

    #[test]
    fn test_gate_without_audit() {
        let store = Arc::new(InMemoryOverrideStore::new());
        let resolver = Resolver::new(store, Arc::new(RoleDefaults::builtin()));
        let gate = PermissionGate::new(Arc::new(resolver));
        assert!(gate.audit().is_none());
        assert!(gate
            .require(Some(&Actor::user("x", "auditeur")), Module::Caisse, Action::Write, None)
            .is_err());
    }
}
