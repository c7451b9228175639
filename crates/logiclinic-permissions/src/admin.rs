//! Administration facade
//!
//! Backs the permission editing screens: show what an actor can do, persist
//! edited grants, reset to the role template and forget deleted actors.

use std::sync::Arc;

use tracing::{info, warn};

use crate::actor::{Actor, ActorId, Role};
use crate::catalog::PermissionCatalog;
use crate::defaults::RoleDefaults;
use crate::error::Result;
use crate::permission::models::{ModulePermission, RawModulePermission};
use crate::permission::resolver::{EmptyOverridePolicy, Resolution, Resolver};
use crate::storage::OverrideStore;

/// Writes and reads through one store, so edits are visible to its resolver
pub struct PermissionAdmin {
    store: Arc<dyn OverrideStore>,
    defaults: Arc<RoleDefaults>,
    resolver: Arc<Resolver>,
}

impl PermissionAdmin {
    /// Build the facade and the resolver it reports through from the same
    /// store and defaults table
    pub fn new(
        store: Arc<dyn OverrideStore>,
        defaults: Arc<RoleDefaults>,
        empty_policy: EmptyOverridePolicy,
    ) -> Self {
        let resolver = Arc::new(Resolver::with_policy(
            store.clone(),
            defaults.clone(),
            empty_policy,
        ));
        Self {
            store,
            defaults,
            resolver,
        }
    }

    /// Resolver bound to this facade's store, for sharing with a gate
    pub fn resolver(&self) -> Arc<Resolver> {
        self.resolver.clone()
    }

    /// Current grants together with the tier that produced them
    pub fn effective_permissions(&self, actor: &Actor) -> Result<Resolution> {
        self.resolver.resolve(actor)
    }

    /// Stored overrides only, `None` when the actor follows role defaults
    pub fn stored_overrides(&self, actor: &ActorId) -> Result<Option<Vec<ModulePermission>>> {
        self.store.get_overrides(actor)
    }

    /// Replace the actor's overrides with `permissions`
    pub fn save_overrides(&self, actor: &ActorId, permissions: &[ModulePermission]) -> Result<()> {
        self.store.replace_overrides(actor, permissions)?;
        info!(
            "Saved {} module grants for {}",
            permissions.len(),
            actor
        );
        Ok(())
    }

    /// Parse and save grants posted as untyped identifiers.
    ///
    /// Nothing is written if any identifier is outside the catalog.
    pub fn save_raw_overrides(&self, actor: &ActorId, raw: &[RawModulePermission]) -> Result<()> {
        let permissions = PermissionCatalog::parse_raw(raw).inspect_err(|e| {
            warn!("Rejected overrides for {}: {}", actor, e);
        })?;
        self.save_overrides(actor, &permissions)
    }

    /// Drop the actor's overrides and return the permissions now in force.
    ///
    /// That is the role template, or the full grant for administrators.
    pub fn reset_to_default(&self, actor: &Actor) -> Result<Vec<ModulePermission>> {
        self.store.clear_overrides(&actor.id)?;
        info!("Reset {} to {} defaults", actor.id, actor.role);
        self.resolver.effective_permissions(actor)
    }

    /// Forget an actor that was deleted upstream
    pub fn remove_actor(&self, actor: &ActorId) -> Result<()> {
        self.store.clear_overrides(actor)?;
        info!("Removed overrides of deleted actor {}", actor);
        Ok(())
    }

    pub fn role_defaults(&self, role: Role) -> &[ModulePermission] {
        self.defaults.defaults_for(role)
    }
}
