//! Per-role default permission templates
//!
//! The table is built once at start-up, either from the built-in matrix or
//! from a configuration file, and is read-only afterwards. Lookups are total:
//! a role code outside the role set maps to an empty permission list.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::actor::Role;
use crate::catalog::{Action, Module, PermissionCatalog, Submodule};
use crate::error::{Error, Result};
use crate::permission::models::{ModulePermission, RawModulePermission};

/// Immutable role → default permissions table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefaults {
    table: HashMap<Role, Vec<ModulePermission>>,
}

/// On-disk shape of a role defaults file
#[derive(Debug, Deserialize)]
struct RoleDefaultsDocument {
    #[serde(default)]
    roles: HashMap<String, Vec<RawModulePermission>>,
}

impl RoleDefaults {
    /// Build a table from typed entries, validating each against the catalog
    pub fn from_table(table: HashMap<Role, Vec<ModulePermission>>) -> Result<Self> {
        for (role, permissions) in &table {
            PermissionCatalog::validate(permissions)
                .map_err(|e| Error::validation(format!("defaults for role '{}': {}", role, e)))?;
        }
        Ok(Self { table })
    }

    /// Load a table from a JSON, TOML or YAML file.
    ///
    /// Roles missing from the file get no defaults; unknown role codes and
    /// identifiers outside the catalog are rejected.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document: RoleDefaultsDocument = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        let mut table = HashMap::with_capacity(document.roles.len());
        for (code, raw) in document.roles {
            let role: Role = code.parse()?;
            let permissions = PermissionCatalog::parse_raw(&raw)
                .map_err(|e| Error::validation(format!("defaults for role '{}': {}", code, e)))?;
            table.insert(role, permissions);
        }

        info!(
            "Loaded role defaults for {} roles from {}",
            table.len(),
            path.display()
        );
        Self::from_table(table)
    }

    /// Defaults for a role code; unrecognized codes yield an empty list
    pub fn get_defaults(&self, role: &str) -> Vec<ModulePermission> {
        match role.parse::<Role>() {
            Ok(role) => self.defaults_for(role).to_vec(),
            Err(_) => {
                debug!("No defaults for unrecognized role '{}'", role);
                Vec::new()
            }
        }
    }

    /// Defaults for a typed role
    pub fn defaults_for(&self, role: Role) -> &[ModulePermission] {
        self.table.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Roles with at least one default grant
    pub fn configured_roles(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .table
            .iter()
            .filter(|(_, perms)| !perms.is_empty())
            .map(|(role, _)| *role)
            .collect();
        roles.sort();
        roles
    }

    /// The built-in clinic matrix
    pub fn builtin() -> Self {
        Self {
            table: builtin_table(),
        }
    }
}

impl Default for RoleDefaults {
    fn default() -> Self {
        Self::builtin()
    }
}

fn grant(
    module: Module,
    actions: &[Action],
    submodules: &[(Submodule, &[Action])],
) -> ModulePermission {
    submodules.iter().fold(
        ModulePermission::new(module, actions.iter().copied()),
        |perm, (sub, sub_actions)| perm.with_submodule(*sub, sub_actions.iter().copied()),
    )
}

fn builtin_table() -> HashMap<Role, Vec<ModulePermission>> {
    use Action::{Admin as A, Delete as D, Export as E, Read as R, Write as W};
    use Module as M;
    use Submodule as S;

    const ALL: &[Action] = &[R, W, D, E, A];

    // Shared by the clinical roles that request lab work and imaging
    let patients_read = || grant(M::GestionPatients, &[R], &[(S::Dossier, &[R]), (S::Historique, &[R])]);
    let lab_request = || {
        grant(
            M::Laboratoire,
            &[R, W],
            &[(S::Demandes, &[R, W]), (S::Resultats, &[R])],
        )
    };
    let imaging_request = || {
        grant(
            M::Imagerie,
            &[R, W],
            &[(S::Demandes, &[R, W]), (S::Examens, &[R]), (S::Rapports, &[R])],
        )
    };
    let care_consultations = || {
        grant(
            M::Consultations,
            &[R, W],
            &[(S::Liste, &[R]), (S::Details, &[R, W])],
        )
    };
    let bilan_read_export = || {
        grant(
            M::Bilan,
            &[R, E],
            &[(S::Consultation, &[R, E]), (S::Export, &[R, E])],
        )
    };
    let caisse_reports = || {
        grant(
            M::Caisse,
            &[R, E],
            &[(S::Rapports, &[R, E]), (S::Journal, &[R, E])],
        )
    };

    let mut table = HashMap::new();

    table.insert(
        Role::Admin,
        vec![
            grant(
                M::Dashboard,
                ALL,
                &[
                    (S::Statistiques, &[R, W, E, A]),
                    (S::Graphiques, &[R, W, E, A]),
                    (S::Rapports, &[R, W, D, E, A]),
                ],
            ),
            grant(
                M::GestionPatients,
                ALL,
                &[
                    (S::Creation, &[R, W, A]),
                    (S::Modification, &[R, W, D, A]),
                    (S::Dossier, &[R, W, E, A]),
                    (S::Historique, &[R, E, A]),
                    (S::Export, &[R, E, A]),
                ],
            ),
            grant(
                M::Consultations,
                ALL,
                &[
                    (S::Liste, &[R, E, A]),
                    (S::Historique, &[R, E, A]),
                    (S::Details, &[R, W, E, A]),
                    (S::Prescriptions, &[R, W, E, A]),
                ],
            ),
            grant(
                M::Pharmacie,
                ALL,
                &[
                    (S::Dispensation, &[R, W, E, A]),
                    (S::Prescriptions, &[R, W, E, A]),
                    (S::Inventaire, &[R, W, E, A]),
                    (S::Alertes, &[R, W, E, A]),
                ],
            ),
            grant(
                M::Laboratoire,
                ALL,
                &[
                    (S::Demandes, &[R, W, E, A]),
                    (S::Resultats, &[R, W, E, A]),
                    (S::Validation, &[R, W, A]),
                    (S::Rapports, &[R, W, E, A]),
                ],
            ),
            grant(
                M::Imagerie,
                ALL,
                &[
                    (S::Demandes, &[R, W, E, A]),
                    (S::Examens, &[R, W, E, A]),
                    (S::Annotations, &[R, W, E, A]),
                    (S::Rapports, &[R, W, E, A]),
                ],
            ),
            grant(
                M::Caisse,
                ALL,
                &[
                    (S::TableauBord, &[R, W, E, A]),
                    (S::Tickets, &[R, W, E, A]),
                    (S::CreationFacture, &[R, W, A]),
                    (S::Paiements, &[R, W, E, A]),
                    (S::Journal, &[R, W, E, A]),
                    (S::Rapports, &[R, W, E, A]),
                    (S::Cloture, &[R, W, A]),
                ],
            ),
            grant(
                M::Bilan,
                ALL,
                &[
                    (S::Creation, &[R, W, A]),
                    (S::Consultation, &[R, E, A]),
                    (S::Export, &[R, E, A]),
                ],
            ),
            grant(
                M::UtilisateursPermissions,
                ALL,
                &[
                    (S::GestionUtilisateurs, &[R, W, D, A]),
                    (S::GestionProfils, &[R, W, D, A]),
                    (S::ConfigurationPermissions, &[R, W, A]),
                ],
            ),
        ],
    );

    table.insert(
        Role::Medecin,
        vec![
            patients_read(),
            grant(
                M::Consultations,
                &[R, W],
                &[
                    (S::Liste, &[R]),
                    (S::Historique, &[R]),
                    (S::Details, &[R, W]),
                    (S::Prescriptions, &[R, W]),
                ],
            ),
            lab_request(),
            imaging_request(),
            grant(
                M::Pharmacie,
                &[R],
                &[(S::Prescriptions, &[R]), (S::Inventaire, &[R])],
            ),
        ],
    );

    table.insert(
        Role::Infirmier,
        vec![patients_read(), care_consultations(), lab_request(), imaging_request()],
    );

    table.insert(
        Role::SageFemme,
        vec![
            patients_read(),
            care_consultations(),
            grant(
                M::Maternite,
                &[R, W],
                &[
                    (S::Dossiers, &[R, W]),
                    (S::Cpn, &[R, W]),
                    (S::Accouchements, &[R, W]),
                    (S::PostPartum, &[R, W]),
                ],
            ),
            lab_request(),
            imaging_request(),
        ],
    );

    table.insert(
        Role::Pharmacien,
        vec![
            grant(
                M::Pharmacie,
                &[R, W, E],
                &[
                    (S::Dispensation, &[R, W, E]),
                    (S::Prescriptions, &[R, W]),
                    (S::Inventaire, &[R, W, E]),
                    (S::Alertes, &[R, W]),
                ],
            ),
            grant(
                M::StockMedicaments,
                &[R, W, E],
                &[
                    (S::Inventaire, &[R, W, E]),
                    (S::Entrees, &[R, W]),
                    (S::Sorties, &[R, W]),
                    (S::Alertes, &[R, W]),
                ],
            ),
            bilan_read_export(),
        ],
    );

    table.insert(
        Role::TechnicienLabo,
        vec![grant(
            M::Laboratoire,
            &[R, W],
            &[
                (S::Demandes, &[R]),
                (S::Resultats, &[R, W]),
                (S::Validation, &[R, W]),
            ],
        )],
    );

    table.insert(Role::Laborantin, Vec::new());

    table.insert(
        Role::Imagerie,
        vec![grant(
            M::Imagerie,
            &[R, W, E],
            &[
                (S::Demandes, &[R]),
                (S::Examens, &[R, W, E]),
                (S::Annotations, &[R, W]),
                (S::Rapports, &[R, W, E]),
            ],
        )],
    );

    table.insert(
        Role::Caissier,
        vec![grant(
            M::Caisse,
            &[R, W, E],
            &[
                (S::TableauBord, &[R]),
                (S::Tickets, &[R, W]),
                (S::CreationFacture, &[R, W]),
                (S::Paiements, &[R, W, E]),
                (S::Journal, &[R, W, E]),
            ],
        )],
    );

    table.insert(
        Role::Receptionniste,
        vec![
            grant(
                M::GestionPatients,
                &[R, W],
                &[
                    (S::Creation, &[R, W]),
                    (S::Modification, &[R, W]),
                    (S::Dossier, &[R]),
                ],
            ),
            grant(
                M::RendezVous,
                &[R, W],
                &[
                    (S::Planification, &[R, W]),
                    (S::Gestion, &[R, W]),
                    (S::Annulation, &[R, W]),
                ],
            ),
        ],
    );

    table.insert(
        Role::Auditeur,
        vec![
            grant(
                M::Dashboard,
                &[R, E],
                &[
                    (S::Statistiques, &[R, E]),
                    (S::Graphiques, &[R, E]),
                    (S::Rapports, &[R, E]),
                ],
            ),
            patients_read(),
            grant(
                M::Consultations,
                &[R],
                &[(S::Liste, &[R]), (S::Historique, &[R]), (S::Details, &[R])],
            ),
            grant(
                M::Pharmacie,
                &[R],
                &[(S::Prescriptions, &[R]), (S::Inventaire, &[R])],
            ),
            grant(
                M::Laboratoire,
                &[R],
                &[(S::Demandes, &[R]), (S::Resultats, &[R]), (S::Rapports, &[R])],
            ),
            grant(
                M::Imagerie,
                &[R],
                &[(S::Demandes, &[R]), (S::Examens, &[R]), (S::Rapports, &[R])],
            ),
            bilan_read_export(),
            caisse_reports(),
        ],
    );

    table.insert(
        Role::Comptable,
        vec![
            grant(
                M::Dashboard,
                &[R, E],
                &[(S::Statistiques, &[R, E]), (S::Rapports, &[R, E])],
            ),
            caisse_reports(),
            bilan_read_export(),
            grant(M::Pharmacie, &[R], &[(S::Inventaire, &[R])]),
        ],
    );

    table.insert(
        Role::Secretaire,
        vec![
            grant(M::Dashboard, &[R], &[(S::Statistiques, &[R])]),
            grant(
                M::GestionPatients,
                &[R, W],
                &[
                    (S::Creation, &[R, W]),
                    (S::Modification, &[R]),
                    (S::Dossier, &[R]),
                ],
            ),
            grant(
                M::RendezVous,
                &[R, W],
                &[(S::Planification, &[R, W]), (S::Gestion, &[R, W])],
            ),
        ],
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_table_is_valid() {
        let defaults = RoleDefaults::builtin();
        let rebuilt = RoleDefaults::from_table(defaults.table.clone()).unwrap();
        assert_eq!(rebuilt, defaults);
    }

    #[test]
    fn test_builtin_covers_every_role() {
        let defaults = RoleDefaults::builtin();
        for role in Role::ALL {
            assert!(defaults.table.contains_key(role), "missing {}", role);
        }
        assert!(defaults.defaults_for(Role::Laborantin).is_empty());
        assert_eq!(defaults.configured_roles().len(), 12);
    }

    #[test]
    fn test_unknown_role_is_empty() {
        let defaults = RoleDefaults::builtin();
        assert!(defaults.get_defaults("nonexistent_role").is_empty());
        assert!(defaults.get_defaults("").is_empty());
    }

    #[test]
    fn test_super_admin_aliases_admin() {
        let defaults = RoleDefaults::builtin();
        assert_eq!(defaults.get_defaults("super_admin"), defaults.get_defaults("admin"));
        assert!(!defaults.get_defaults("admin").is_empty());
    }

    #[test]
    fn test_medecin_consultation_defaults() {
        let defaults = RoleDefaults::builtin();
        let medecin = defaults.defaults_for(Role::Medecin);
        let consultations = medecin
            .iter()
            .find(|p| p.module == Module::Consultations)
            .unwrap();
        assert!(consultations.grants(Action::Read, None));
        assert!(consultations.grants(Action::Write, None));
        assert!(!medecin.iter().any(|p| p.module == Module::Caisse));
    }

    #[test]
    fn test_from_table_rejects_foreign_submodule() {
        let mut table = HashMap::new();
        table.insert(
            Role::Secretaire,
            vec![ModulePermission::new(Module::RendezVous, [Action::Read])
                .with_submodule(Submodule::Calendrier, [Action::Read])],
        );
        let err = RoleDefaults::from_table(table).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"roles": {{"medecin": [{{"module": "consultations", "actions": ["read"],
                "submodules": [{{"submodule": "details", "actions": ["read", "write"]}}]}}]}}}}"#
        )
        .unwrap();

        let defaults = RoleDefaults::from_file(file.path()).unwrap();
        let medecin = defaults.get_defaults("medecin");
        assert_eq!(medecin.len(), 1);
        assert!(!medecin[0].grants(Action::Write, None));
        assert!(medecin[0].grants(Action::Write, Some(Submodule::Details)));
        assert!(defaults.get_defaults("caissier").is_empty());
    }

    #[test]
    fn test_from_file_rejects_unknown_role() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"roles": {{"janitor": []}}}}"#).unwrap();
        assert!(matches!(
            RoleDefaults::from_file(file.path()),
            Err(Error::Validation(_))
        ));
    }
}
