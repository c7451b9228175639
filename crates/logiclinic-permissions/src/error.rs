//! Error types for the permissions system

use thiserror::Error;

/// Result type for permissions operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the permissions system
#[derive(Error, Debug)]
pub enum Error {
    /// An override or configuration entry references something outside the catalog
    #[error("Validation error: {0}")]
    Validation(String),

    /// No actor identity was supplied to a guarded call site
    #[error("Authentication required")]
    Authentication,

    /// The actor is identified but lacks the requested grant
    #[error("Permission denied: {action} on {} for role {role}", target(.module, .submodule))]
    Authorization {
        module: String,
        action: String,
        submodule: Option<String>,
        role: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

fn target(module: &str, submodule: &Option<String>) -> String {
    match submodule {
        Some(sub) => format!("{}/{}", module, sub),
        None => module.to_string(),
    }
}

impl Error {
    /// True for persistence failures, which are propagated unchanged to callers
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Io(_) | Error::Serialization(_)
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_message_includes_submodule() {
        let err = Error::Authorization {
            module: "caisse".to_string(),
            action: "write".to_string(),
            submodule: Some("cloture".to_string()),
            role: "caissier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: write on caisse/cloture for role caissier"
        );
    }

    #[test]
    fn test_authorization_message_without_submodule() {
        let err = Error::Authorization {
            module: "caisse".to_string(),
            action: "write".to_string(),
            submodule: None,
            role: "medecin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: write on caisse for role medecin"
        );
    }

    #[test]
    fn test_storage_classification() {
        assert!(Error::Storage("down".to_string()).is_storage());
        assert!(Error::Io(std::io::Error::other("disk")).is_storage());
        assert!(!Error::Authentication.is_storage());
        assert!(!Error::validation("bad").is_storage());
    }
}
