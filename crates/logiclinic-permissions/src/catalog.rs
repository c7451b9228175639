//! Closed catalog of modules, submodules and actions
//!
//! Every identifier that can appear in a grant is declared here. Free-form
//! strings coming from the administration UI or from configuration files are
//! parsed against this catalog before anything reaches storage.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::permission::models::{ModulePermission, RawModulePermission, SubmodulePermission};

macro_rules! catalog_enum {
    (
        $(#[$meta:meta])*
        $kind:literal enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            /// Every value, in catalog order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stable identifier used in storage and configuration
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::validation(format!("unknown {} '{}'", $kind, other))),
                }
            }
        }
    };
}

catalog_enum! {
    /// Top-level functional area with its own permission scope
    "module" enum Module {
        Dashboard => "dashboard",
        Consultations => "consultations",
        Vaccination => "vaccination",
        Laboratoire => "laboratoire",
        Imagerie => "imagerie",
        Pharmacie => "pharmacie",
        Maternite => "maternite",
        StockMedicaments => "stock_medicaments",
        Bilan => "bilan",
        Caisse => "caisse",
        RendezVous => "rendez_vous",
        GestionPatients => "gestion_patients",
        UtilisateursPermissions => "utilisateurs_permissions",
    }
}

catalog_enum! {
    /// Operation granularity of a grant
    "action" enum Action {
        Read => "read",
        Write => "write",
        Delete => "delete",
        Export => "export",
        Admin => "admin",
    }
}

catalog_enum! {
    /// Named subdivision of a module.
    ///
    /// Several modules share a name (`rapports`, `historique`, ...); which
    /// names belong to which module is decided by [`Module::submodules`].
    "submodule" enum Submodule {
        Statistiques => "statistiques",
        Graphiques => "graphiques",
        Rapports => "rapports",
        Liste => "liste",
        Historique => "historique",
        Details => "details",
        Prescriptions => "prescriptions",
        Calendrier => "calendrier",
        Administration => "administration",
        Suivi => "suivi",
        Rappels => "rappels",
        Demandes => "demandes",
        Resultats => "resultats",
        Validation => "validation",
        Examens => "examens",
        Annotations => "annotations",
        Dispensation => "dispensation",
        Inventaire => "inventaire",
        Alertes => "alertes",
        Dossiers => "dossiers",
        Cpn => "cpn",
        Accouchements => "accouchements",
        PostPartum => "post_partum",
        Entrees => "entrees",
        Sorties => "sorties",
        Transferts => "transferts",
        Pertes => "pertes",
        Creation => "creation",
        Consultation => "consultation",
        Export => "export",
        TableauBord => "tableau_bord",
        Tickets => "tickets",
        CreationFacture => "creation_facture",
        Paiements => "paiements",
        Journal => "journal",
        Cloture => "cloture",
        Planification => "planification",
        Gestion => "gestion",
        Annulation => "annulation",
        Modification => "modification",
        Dossier => "dossier",
        GestionUtilisateurs => "gestion_utilisateurs",
        GestionProfils => "gestion_profils",
        ConfigurationPermissions => "configuration_permissions",
    }
}

impl Module {
    /// Human label shown in the administration screens
    pub fn label(&self) -> &'static str {
        match self {
            Module::Dashboard => "Tableau de bord",
            Module::Consultations => "Consultations",
            Module::Vaccination => "Vaccination",
            Module::Laboratoire => "Laboratoire",
            Module::Imagerie => "Imagerie Médicale",
            Module::Pharmacie => "Pharmacie",
            Module::Maternite => "Maternité",
            Module::StockMedicaments => "Stock Médicaments",
            Module::Bilan => "Bilan",
            Module::Caisse => "Caisse",
            Module::RendezVous => "Rendez-vous",
            Module::GestionPatients => "Gestion Patients",
            Module::UtilisateursPermissions => "Utilisateurs et Permissions",
        }
    }

    /// Ordered submodules of this module
    pub fn submodules(&self) -> &'static [Submodule] {
        use Submodule as S;

        match self {
            Module::Dashboard => &[S::Statistiques, S::Graphiques, S::Rapports],
            Module::Consultations => &[S::Liste, S::Historique, S::Details, S::Prescriptions],
            Module::Vaccination => &[S::Calendrier, S::Administration, S::Suivi, S::Rappels],
            Module::Laboratoire => &[S::Demandes, S::Resultats, S::Validation, S::Rapports],
            Module::Imagerie => &[S::Demandes, S::Examens, S::Annotations, S::Rapports],
            Module::Pharmacie => &[S::Dispensation, S::Prescriptions, S::Inventaire, S::Alertes],
            Module::Maternite => &[
                S::Dossiers,
                S::Cpn,
                S::Accouchements,
                S::PostPartum,
                S::Statistiques,
            ],
            Module::StockMedicaments => &[
                S::Inventaire,
                S::Entrees,
                S::Sorties,
                S::Transferts,
                S::Pertes,
                S::Alertes,
            ],
            Module::Bilan => &[S::Creation, S::Consultation, S::Export],
            Module::Caisse => &[
                S::TableauBord,
                S::Tickets,
                S::CreationFacture,
                S::Paiements,
                S::Journal,
                S::Rapports,
                S::Cloture,
            ],
            Module::RendezVous => &[S::Planification, S::Gestion, S::Annulation, S::Rappels],
            Module::GestionPatients => &[
                S::Creation,
                S::Modification,
                S::Dossier,
                S::Historique,
                S::Export,
            ],
            Module::UtilisateursPermissions => &[
                S::GestionUtilisateurs,
                S::GestionProfils,
                S::ConfigurationPermissions,
            ],
        }
    }

    /// Check whether a submodule belongs to this module
    pub fn has_submodule(&self, submodule: Submodule) -> bool {
        self.submodules().contains(&submodule)
    }
}

impl Action {
    /// Human label shown in the administration screens
    pub fn label(&self) -> &'static str {
        match self {
            Action::Read => "Lecture",
            Action::Write => "Écriture",
            Action::Delete => "Suppression",
            Action::Export => "Export",
            Action::Admin => "Administration",
        }
    }
}

/// Lookup and validation over the closed catalog
pub struct PermissionCatalog;

impl PermissionCatalog {
    /// All modules in catalog order
    pub fn modules() -> &'static [Module] {
        Module::ALL
    }

    /// All actions in catalog order
    pub fn actions() -> &'static [Action] {
        Action::ALL
    }

    /// Every action on every module and every submodule
    pub fn full_grant() -> Vec<ModulePermission> {
        Module::ALL
            .iter()
            .map(|module| ModulePermission {
                module: *module,
                actions: Action::ALL.iter().copied().collect(),
                submodules: module
                    .submodules()
                    .iter()
                    .map(|sub| SubmodulePermission::new(*sub, Action::ALL.iter().copied()))
                    .collect(),
            })
            .collect()
    }

    pub fn parse_module(name: &str) -> Result<Module> {
        name.parse()
    }

    pub fn parse_action(name: &str) -> Result<Action> {
        name.parse()
    }

    /// Parse a submodule name and check that it belongs to `module`
    pub fn parse_submodule(module: Module, name: &str) -> Result<Submodule> {
        let submodule: Submodule = name.parse()?;
        if !module.has_submodule(submodule) {
            return Err(Error::validation(format!(
                "submodule '{}' does not belong to module '{}'",
                submodule, module
            )));
        }
        Ok(submodule)
    }

    /// Validate a typed permission set against the catalog.
    ///
    /// Rejects submodules that belong to another module and repeated module
    /// or submodule entries, which would otherwise be silently merged.
    pub fn validate(permissions: &[ModulePermission]) -> Result<()> {
        let mut seen_modules = Vec::with_capacity(permissions.len());

        for permission in permissions {
            if seen_modules.contains(&permission.module) {
                return Err(Error::validation(format!(
                    "module '{}' listed more than once",
                    permission.module
                )));
            }
            seen_modules.push(permission.module);

            let mut seen_submodules = Vec::with_capacity(permission.submodules.len());
            for sub in &permission.submodules {
                if !permission.module.has_submodule(sub.submodule) {
                    return Err(Error::validation(format!(
                        "submodule '{}' does not belong to module '{}'",
                        sub.submodule, permission.module
                    )));
                }
                if seen_submodules.contains(&sub.submodule) {
                    return Err(Error::validation(format!(
                        "submodule '{}' listed more than once in module '{}'",
                        sub.submodule, permission.module
                    )));
                }
                seen_submodules.push(sub.submodule);
            }
        }

        Ok(())
    }

    /// Convert untyped boundary input into a validated permission set
    pub fn parse_raw(raw: &[RawModulePermission]) -> Result<Vec<ModulePermission>> {
        let mut permissions = Vec::with_capacity(raw.len());

        for entry in raw {
            let module = Self::parse_module(&entry.module)?;
            let actions = entry
                .actions
                .iter()
                .map(|a| Self::parse_action(a))
                .collect::<Result<_>>()?;

            let mut submodules = Vec::with_capacity(entry.submodules.len());
            for sub in &entry.submodules {
                let submodule = Self::parse_submodule(module, &sub.submodule)?;
                let sub_actions = sub
                    .actions
                    .iter()
                    .map(|a| Self::parse_action(a))
                    .collect::<Result<_>>()?;
                submodules.push(SubmodulePermission {
                    submodule,
                    actions: sub_actions,
                });
            }

            permissions.push(ModulePermission {
                module,
                actions,
                submodules,
            });
        }

        Self::validate(&permissions)?;
        Ok(permissions)
    }
}
