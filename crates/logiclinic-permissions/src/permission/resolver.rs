//! Effective permission resolution
//!
//! Resolution walks an ordered list of tiers and stops at the first one that
//! answers. The standard order is administrator bypass, then stored
//! overrides, then role defaults; overrides shadow defaults entirely rather
//! than being merged with them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actor::Actor;
use crate::catalog::{Action, Module, PermissionCatalog, Submodule};
use crate::defaults::RoleDefaults;
use crate::error::Result;
use crate::permission::checker::PermissionChecker;
use crate::permission::models::{ModulePermission, PermissionRequest};
use crate::storage::OverrideStore;

/// Meaning of an override set that is stored but empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyOverridePolicy {
    /// The actor has zero permissions until the overrides are cleared
    #[default]
    ExplicitDeny,
    /// An empty set behaves as if no overrides were configured
    FallbackToDefaults,
}

/// One step of the resolution chain
pub trait ResolutionTier: Send + Sync {
    /// Short name reported with the resolution result
    fn name(&self) -> &'static str;

    /// `Some` ends resolution with that permission set; `None` defers to the next tier
    fn resolve(&self, actor: &Actor) -> Result<Option<Vec<ModulePermission>>>;
}

/// Administrators hold every action on every module and submodule
pub struct AdminBypass;

impl ResolutionTier for AdminBypass {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn resolve(&self, actor: &Actor) -> Result<Option<Vec<ModulePermission>>> {
        Ok(actor.is_admin.then(PermissionCatalog::full_grant))
    }
}

/// Persisted per-actor overrides
pub struct StoredOverrides {
    store: Arc<dyn OverrideStore>,
    empty_policy: EmptyOverridePolicy,
}

impl StoredOverrides {
    pub fn new(store: Arc<dyn OverrideStore>, empty_policy: EmptyOverridePolicy) -> Self {
        Self {
            store,
            empty_policy,
        }
    }
}

impl ResolutionTier for StoredOverrides {
    fn name(&self) -> &'static str {
        "overrides"
    }

    fn resolve(&self, actor: &Actor) -> Result<Option<Vec<ModulePermission>>> {
        let overrides = self.store.get_overrides(&actor.id)?;
        Ok(match overrides {
            Some(set) if set.is_empty() => match self.empty_policy {
                EmptyOverridePolicy::ExplicitDeny => Some(set),
                EmptyOverridePolicy::FallbackToDefaults => None,
            },
            other => other,
        })
    }
}

/// Role templates; always answers, with an empty set for unknown roles
pub struct RoleDefaultsTier {
    defaults: Arc<RoleDefaults>,
}

impl RoleDefaultsTier {
    pub fn new(defaults: Arc<RoleDefaults>) -> Self {
        Self { defaults }
    }
}

impl ResolutionTier for RoleDefaultsTier {
    fn name(&self) -> &'static str {
        "role_defaults"
    }

    fn resolve(&self, actor: &Actor) -> Result<Option<Vec<ModulePermission>>> {
        Ok(Some(self.defaults.get_defaults(&actor.role)))
    }
}

/// Permission set together with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub source: &'static str,
    pub permissions: Vec<ModulePermission>,
}

/// Computes effective permissions and answers checks
pub struct Resolver {
    tiers: Vec<Box<dyn ResolutionTier>>,
}

impl Resolver {
    /// Standard chain with the default empty-override policy
    pub fn new(store: Arc<dyn OverrideStore>, defaults: Arc<RoleDefaults>) -> Self {
        Self::with_policy(store, defaults, EmptyOverridePolicy::default())
    }

    /// Standard chain: admin bypass, stored overrides, role defaults
    pub fn with_policy(
        store: Arc<dyn OverrideStore>,
        defaults: Arc<RoleDefaults>,
        empty_policy: EmptyOverridePolicy,
    ) -> Self {
        Self::from_tiers(vec![
            Box::new(AdminBypass),
            Box::new(StoredOverrides::new(store, empty_policy)),
            Box::new(RoleDefaultsTier::new(defaults)),
        ])
    }

    /// Custom chain, tried in the given order
    pub fn from_tiers(tiers: Vec<Box<dyn ResolutionTier>>) -> Self {
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve and report which tier answered
    pub fn resolve(&self, actor: &Actor) -> Result<Resolution> {
        for tier in &self.tiers {
            if let Some(permissions) = tier.resolve(actor)? {
                debug!("Resolved {} via {} tier", actor.id, tier.name());
                return Ok(Resolution {
                    source: tier.name(),
                    permissions,
                });
            }
        }

        debug!("No tier answered for {}, denying everything", actor.id);
        Ok(Resolution {
            source: "none",
            permissions: Vec::new(),
        })
    }

    pub fn effective_permissions(&self, actor: &Actor) -> Result<Vec<ModulePermission>> {
        Ok(self.resolve(actor)?.permissions)
    }

    /// Check a typed request. Absence of a grant is `Ok(false)`, never an error.
    pub fn check(
        &self,
        actor: &Actor,
        module: Module,
        action: Action,
        submodule: Option<Submodule>,
    ) -> Result<bool> {
        let permissions = self.effective_permissions(actor)?;
        Ok(PermissionChecker::is_granted(&permissions, module, action, submodule))
    }

    pub fn check_request(&self, actor: &Actor, request: &PermissionRequest) -> Result<bool> {
        self.check(actor, request.module, request.action, request.submodule)
    }

    /// Check with untyped identifiers; anything outside the catalog is denied
    pub fn check_raw(
        &self,
        actor: &Actor,
        module: &str,
        action: &str,
        submodule: Option<&str>,
    ) -> Result<bool> {
        match parse_request(module, action, submodule) {
            Some(request) => self.check_request(actor, &request),
            None => {
                debug!(
                    "Denying {} for {}: identifiers outside the catalog",
                    module, actor.id
                );
                Ok(false)
            }
        }
    }
}

/// Parse untyped identifiers into a request, `None` if any is unknown
pub(crate) fn parse_request(
    module: &str,
    action: &str,
    submodule: Option<&str>,
) -> Option<PermissionRequest> {
    let module = PermissionCatalog::parse_module(module).ok()?;
    let action = PermissionCatalog::parse_action(action).ok()?;
    let submodule = match submodule {
        Some(name) => Some(PermissionCatalog::parse_submodule(module, name).ok()?),
        None => None,
    };
    Some(PermissionRequest {
        module,
        action,
        submodule,
    })
}
