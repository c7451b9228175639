//! Actors and roles
//!
//! An actor is either a user account or a reusable permission profile. Identity
//! itself (sessions, tokens) is resolved elsewhere; this module only carries the
//! `{id, role, is_admin}` triple handed over by that layer.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Built-in clinic roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Clinic administrator; `super_admin` is accepted as an alias
    #[serde(alias = "super_admin")]
    Admin,
    Medecin,
    Infirmier,
    SageFemme,
    Pharmacien,
    TechnicienLabo,
    Laborantin,
    Imagerie,
    Caissier,
    Comptable,
    Receptionniste,
    Secretaire,
    Auditeur,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Role::Admin,
        Role::Medecin,
        Role::Infirmier,
        Role::SageFemme,
        Role::Pharmacien,
        Role::TechnicienLabo,
        Role::Laborantin,
        Role::Imagerie,
        Role::Caissier,
        Role::Comptable,
        Role::Receptionniste,
        Role::Secretaire,
        Role::Auditeur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Medecin => "medecin",
            Role::Infirmier => "infirmier",
            Role::SageFemme => "sage_femme",
            Role::Pharmacien => "pharmacien",
            Role::TechnicienLabo => "technicien_labo",
            Role::Laborantin => "laborantin",
            Role::Imagerie => "imagerie",
            Role::Caissier => "caissier",
            Role::Comptable => "comptable",
            Role::Receptionniste => "receptionniste",
            Role::Secretaire => "secretaire",
            Role::Auditeur => "auditeur",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrateur Clinique",
            Role::Medecin => "Médecin",
            Role::Infirmier => "Infirmier",
            Role::SageFemme => "Sage-femme",
            Role::Pharmacien => "Pharmacien",
            Role::TechnicienLabo => "Technicien de Laboratoire",
            Role::Laborantin => "Laborantin",
            Role::Imagerie => "Imagerie / Échographie",
            Role::Caissier => "Caissier",
            Role::Comptable => "Comptable",
            Role::Receptionniste => "Réceptionniste / Accueil",
            Role::Secretaire => "Secrétaire",
            Role::Auditeur => "Auditeur / Direction",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Responsable du centre - Accès complet à tous les modules",
            Role::Medecin => "Prise en charge médicale - Diagnostic et prescription",
            Role::Infirmier => "Soins et suivi - Constantes et soins",
            Role::SageFemme => "Soins et suivi maternité - CPN, accouchements, post-partum",
            Role::Pharmacien => "Gestion médicaments - Stocks et délivrance",
            Role::TechnicienLabo | Role::Laborantin => {
                "Examens biologiques - Résultats laboratoire"
            }
            Role::Imagerie => "Examens d'imagerie - Échographie et imagerie médicale",
            Role::Caissier => "Facturation et paiements - Caisse et journal",
            Role::Comptable => "Gestion comptable - Rapports et finances",
            Role::Receptionniste => "Enregistrement & RDV - Création patients et rendez-vous",
            Role::Secretaire => "Accueil et secrétariat - Gestion administrative",
            Role::Auditeur => "Lecture stratégique - Rapports en lecture seule",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "super_admin" {
            return Ok(Role::Admin);
        }
        Role::ALL
            .iter()
            .find(|role| role.as_str() == s)
            .copied()
            .ok_or_else(|| Error::validation(format!("unknown role '{}'", s)))
    }
}

/// Identifier of a user or a profile; the two live in separate namespaces
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActorId {
    User(String),
    Profile(String),
}

impl ActorId {
    pub fn user(id: impl Into<String>) -> Self {
        ActorId::User(id.into())
    }

    pub fn profile(id: impl Into<String>) -> Self {
        ActorId::Profile(id.into())
    }

    /// The bare identifier, without its namespace
    pub fn id(&self) -> &str {
        match self {
            ActorId::User(id) | ActorId::Profile(id) => id,
        }
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorId::User(id) => write!(f, "user:{}", id),
            ActorId::Profile(id) => write!(f, "profile:{}", id),
        }
    }
}

impl std::str::FromStr for ActorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some(("user", id)) if !id.is_empty() => Ok(ActorId::user(id)),
            Some(("profile", id)) if !id.is_empty() => Ok(ActorId::profile(id)),
            _ => Err(Error::validation(format!("invalid actor id '{}'", s))),
        }
    }
}

impl TryFrom<String> for ActorId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ActorId> for String {
    fn from(id: ActorId) -> Self {
        id.to_string()
    }
}

/// Identity evaluated by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Role code as supplied by the identity layer; unrecognized codes get no defaults
    pub role: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Actor {
    pub fn new(id: ActorId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            is_admin: false,
        }
    }

    pub fn user(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(ActorId::user(id), role)
    }

    pub fn profile(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self::new(ActorId::profile(id), role)
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Parsed role, or `None` when the code is outside the role set
    pub fn known_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("medecin".parse::<Role>().unwrap(), Role::Medecin);
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("nonexistent_role".parse::<Role>().is_err());
        assert_eq!(Role::ALL.len(), 13);
    }

    #[test]
    fn test_role_serde_alias() {
        let role: Role = serde_json::from_str("\"super_admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(serde_json::to_string(&Role::SageFemme).unwrap(), "\"sage_femme\"");
    }

    #[test]
    fn test_actor_id_string_form() {
        let id = ActorId::profile("p-7");
        assert_eq!(id.to_string(), "profile:p-7");
        assert_eq!("profile:p-7".parse::<ActorId>().unwrap(), id);
        assert_eq!(id.id(), "p-7");
        assert!("group:1".parse::<ActorId>().is_err());
        assert!("user:".parse::<ActorId>().is_err());
    }

    #[test]
    fn test_actor_id_namespaces_differ() {
        assert_ne!(ActorId::user("42"), ActorId::profile("42"));
    }

    #[test]
    fn test_actor_known_role() {
        let actor = Actor::user("u1", "caissier");
        assert_eq!(actor.known_role(), Some(Role::Caissier));
        assert!(!actor.is_admin);

        let stranger = Actor::user("u2", "janitor").with_admin(true);
        assert_eq!(stranger.known_role(), None);
        assert!(stranger.is_admin);
    }

    #[test]
    fn test_actor_serialization() {
        let actor = Actor::user("u1", "medecin");
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["id"], "user:u1");
        let back: Actor = serde_json::from_value(json).unwrap();
        assert_eq!(back, actor);
    }
}
