//! Permission data models

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::catalog::{Action, Module, Submodule};

/// Actions granted on one submodule, independent of the parent module's actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmodulePermission {
    pub submodule: Submodule,
    pub actions: BTreeSet<Action>,
}

impl SubmodulePermission {
    pub fn new(submodule: Submodule, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            submodule,
            actions: actions.into_iter().collect(),
        }
    }
}

/// Actions granted on a module, plus independent submodule line items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    pub module: Module,
    pub actions: BTreeSet<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodules: Vec<SubmodulePermission>,
}

impl ModulePermission {
    /// Create a module grant without submodule entries
    pub fn new(module: Module, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            module,
            actions: actions.into_iter().collect(),
            submodules: Vec::new(),
        }
    }

    /// Append a submodule grant
    pub fn with_submodule(
        mut self,
        submodule: Submodule,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        self.submodules
            .push(SubmodulePermission::new(submodule, actions));
        self
    }

    /// Find the grant for a submodule, if one is listed
    pub fn submodule(&self, submodule: Submodule) -> Option<&SubmodulePermission> {
        self.submodules.iter().find(|s| s.submodule == submodule)
    }

    /// Check a single action.
    ///
    /// With a submodule, only that submodule's own action set counts; the
    /// module-level set is never consulted, and the reverse holds too.
    pub fn grants(&self, action: Action, submodule: Option<Submodule>) -> bool {
        match submodule {
            Some(sub) => self
                .submodule(sub)
                .map(|s| s.actions.contains(&action))
                .unwrap_or(false),
            None => self.actions.contains(&action),
        }
    }

    fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.submodules.iter().all(|s| s.actions.is_empty())
    }
}

/// Untyped submodule entry as received from the administration UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSubmodulePermission {
    pub submodule: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Untyped module entry as received from the administration UI or a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawModulePermission {
    pub module: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub submodules: Vec<RawSubmodulePermission>,
}

impl From<&ModulePermission> for RawModulePermission {
    fn from(permission: &ModulePermission) -> Self {
        Self {
            module: permission.module.to_string(),
            actions: permission.actions.iter().map(|a| a.to_string()).collect(),
            submodules: permission
                .submodules
                .iter()
                .map(|s| RawSubmodulePermission {
                    submodule: s.submodule.to_string(),
                    actions: s.actions.iter().map(|a| a.to_string()).collect(),
                })
                .collect(),
        }
    }
}

/// Flat persisted grant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverrideRecord {
    pub actor_id: ActorId,
    pub module: Module,
    pub action: Action,
    #[serde(default)]
    pub submodule: Option<Submodule>,
    pub granted: bool,
}

impl PermissionOverrideRecord {
    pub fn new(actor_id: ActorId, module: Module, action: Action, submodule: Option<Submodule>) -> Self {
        Self {
            actor_id,
            module,
            action,
            submodule,
            granted: true,
        }
    }
}

/// A single (module, action, submodule?) question asked of the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub module: Module,
    pub action: Action,
    #[serde(default)]
    pub submodule: Option<Submodule>,
}

impl PermissionRequest {
    pub fn new(module: Module, action: Action) -> Self {
        Self {
            module,
            action,
            submodule: None,
        }
    }

    pub fn on_submodule(module: Module, action: Action, submodule: Submodule) -> Self {
        Self {
            module,
            action,
            submodule: Some(submodule),
        }
    }
}

impl std::fmt::Display for PermissionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.submodule {
            Some(sub) => write!(f, "{}:{}/{}", self.action, self.module, sub),
            None => write!(f, "{}:{}", self.action, self.module),
        }
    }
}

/// Flatten grouped permissions into one record per granted action
pub fn flatten(actor_id: &ActorId, permissions: &[ModulePermission]) -> Vec<PermissionOverrideRecord> {
    let mut records = Vec::new();

    for permission in permissions {
        for action in &permission.actions {
            records.push(PermissionOverrideRecord::new(
                actor_id.clone(),
                permission.module,
                *action,
                None,
            ));
        }

        for sub in &permission.submodules {
            for action in &sub.actions {
                records.push(PermissionOverrideRecord::new(
                    actor_id.clone(),
                    permission.module,
                    *action,
                    Some(sub.submodule),
                ));
            }
        }
    }

    records
}

/// Reshape flat records into grouped permissions, by module then submodule.
///
/// Order follows first appearance. Submodule rows only feed their submodule;
/// rows with `granted == false` are ignored.
pub fn group(records: &[PermissionOverrideRecord]) -> Vec<ModulePermission> {
    let mut grouped: Vec<ModulePermission> = Vec::new();

    for record in records.iter().filter(|r| r.granted) {
        let index = match grouped.iter().position(|p| p.module == record.module) {
            Some(index) => index,
            None => {
                grouped.push(ModulePermission {
                    module: record.module,
                    actions: BTreeSet::new(),
                    submodules: Vec::new(),
                });
                grouped.len() - 1
            }
        };
        let entry = &mut grouped[index];

        match record.submodule {
            None => {
                entry.actions.insert(record.action);
            }
            Some(submodule) => match entry.submodules.iter_mut().find(|s| s.submodule == submodule) {
                Some(sub) => {
                    sub.actions.insert(record.action);
                }
                None => entry
                    .submodules
                    .push(SubmodulePermission::new(submodule, [record.action])),
            },
        }
    }

    grouped.retain(|p| !p.is_empty());
    grouped
}
