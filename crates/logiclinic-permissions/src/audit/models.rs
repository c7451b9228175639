//! Audit log data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::{Actor, ActorId};

/// Outcome of a guarded call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// The resolver granted the request
    Allowed,
    /// The actor was identified but lacks the grant
    Denied,
    /// No actor identity was available
    Unauthenticated,
}

impl std::fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditOutcome::Allowed => write!(f, "allowed"),
            AuditOutcome::Denied => write!(f, "denied"),
            AuditOutcome::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

/// Entry in the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique identifier for this log entry
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Actor that made the call, absent when unauthenticated
    pub actor: Option<ActorId>,
    /// Role code carried by the actor
    pub role: Option<String>,
    /// Module as requested, kept verbatim so unknown identifiers stay visible
    pub module: String,
    pub action: String,
    pub submodule: Option<String>,
    pub outcome: AuditOutcome,
}

impl AuditLogEntry {
    /// Create a new audit log entry
    pub fn new(
        actor: Option<&Actor>,
        module: impl Into<String>,
        action: impl Into<String>,
        submodule: Option<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor: actor.map(|a| a.id.clone()),
            role: actor.map(|a| a.role.clone()),
            module: module.into(),
            action: action.into(),
            submodule,
            outcome,
        }
    }
}
