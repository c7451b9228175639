//! Permission models, matching and resolution

pub mod checker;
pub mod models;
pub mod resolver;

pub use checker::PermissionChecker;
pub use models::{
    ModulePermission, PermissionOverrideRecord, PermissionRequest, RawModulePermission,
    RawSubmodulePermission, SubmodulePermission,
};
pub use resolver::{
    AdminBypass, EmptyOverridePolicy, Resolution, ResolutionTier, Resolver, RoleDefaultsTier,
    StoredOverrides,
};
