//! Start-up configuration for the permission engine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::AuditLogger;
use crate::defaults::RoleDefaults;
use crate::error::Result;
use crate::permission::resolver::EmptyOverridePolicy;
use crate::storage::{FileOverrideStore, InMemoryOverrideStore, OverrideStore};

/// Prefix of environment overrides, e.g. `LOGICLINIC_PERMISSIONS__STORE__BACKEND=file`
pub const ENV_PREFIX: &str = "LOGICLINIC_PERMISSIONS";

/// Where override records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory of the override document, required by the file backend
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: AuditLogger::DEFAULT_CAPACITY,
        }
    }
}

/// Engine configuration, resolved once at process start
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub empty_override_policy: EmptyOverridePolicy,
    /// Role defaults file; the built-in table is used when unset
    pub role_defaults_path: Option<PathBuf>,
    pub store: StoreConfig,
    pub audit: AuditConfig,
}

impl PermissionsConfig {
    /// Load from an optional file plus `LOGICLINIC_PERMISSIONS__*` variables.
    ///
    /// A path that is given must exist. Environment values win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }

        let config: PermissionsConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::File && self.store.path.is_none() {
            return Err(crate::error::Error::validation(
                "file store backend requires store.path",
            ));
        }
        if self.audit.enabled && self.audit.capacity == 0 {
            return Err(crate::error::Error::validation(
                "audit capacity must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn build_store(&self) -> Result<Arc<dyn OverrideStore>> {
        match (self.store.backend, &self.store.path) {
            (StoreBackend::Memory, _) => Ok(Arc::new(InMemoryOverrideStore::new())),
            (StoreBackend::File, Some(path)) => {
                let store = FileOverrideStore::with_defaults(path);
                info!("Using file override store at {}", store.path().display());
                Ok(Arc::new(store))
            }
            (StoreBackend::File, None) => Err(crate::error::Error::validation(
                "file store backend requires store.path",
            )),
        }
    }

    pub fn build_defaults(&self) -> Result<Arc<RoleDefaults>> {
        let defaults = match &self.role_defaults_path {
            Some(path) => RoleDefaults::from_file(path)?,
            None => RoleDefaults::builtin(),
        };
        Ok(Arc::new(defaults))
    }

    pub fn build_audit(&self) -> Option<AuditLogger> {
        self.audit
            .enabled
            .then(|| AuditLogger::with_capacity(self.audit.capacity))
    }
}
