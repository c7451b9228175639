//! Permission resolution for LogiClinic
//!
//! Decides whether an actor may perform an action on a clinic module or
//! submodule. Administrators bypass every check, stored per-actor overrides
//! replace role defaults, and role defaults apply otherwise. The gate turns
//! decisions into authentication and authorization errors for call sites,
//! and the admin facade backs the permission editing screens.

pub mod actor;
pub mod admin;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod gate;
pub mod permission;
pub mod storage;

pub use actor::{Actor, ActorId, Role};
pub use admin::PermissionAdmin;
pub use audit::{AuditLogEntry, AuditLogger, AuditOutcome, AuditQuery, Pagination, QueryFilter};
pub use catalog::{Action, Module, PermissionCatalog, Submodule};
pub use config::{AuditConfig, PermissionsConfig, StoreBackend, StoreConfig};
pub use defaults::RoleDefaults;
pub use engine::PermissionEngine;
pub use error::{Error, Result};
pub use gate::PermissionGate;
pub use permission::{
    EmptyOverridePolicy, ModulePermission, PermissionChecker, PermissionOverrideRecord,
    PermissionRequest, RawModulePermission, RawSubmodulePermission, Resolution, ResolutionTier,
    Resolver, SubmodulePermission,
};
pub use storage::{FileOverrideStore, InMemoryOverrideStore, OverrideStore};
