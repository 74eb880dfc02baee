//! The standard action catalog.
//!
//! Default positions of the built-in installer actions for each sequence.
//! The catalog is built once and shared by every link.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::core::{Action, ActionKey, Scheduling, SequenceType};
use crate::linker::errors::LinkFailure;

type Entry = (&'static str, i32, Option<&'static str>);

const ADMIN_EXECUTE: &[Entry] = &[
    ("CostInitialize", 800, None),
    ("FileCost", 900, None),
    ("CostFinalize", 1000, None),
    ("InstallValidate", 1400, None),
    ("InstallInitialize", 1500, None),
    ("CreateFolders", 3700, None),
    ("InstallAdminPackage", 3900, None),
    ("InstallFiles", 4000, None),
    ("PatchFiles", 4090, None),
    ("DuplicateFiles", 4210, None),
    ("InstallFinalize", 6600, None),
];

const ADMIN_UI: &[Entry] = &[
    ("CostInitialize", 800, None),
    ("FileCost", 900, None),
    ("CostFinalize", 1000, None),
    ("ExecuteAction", 1300, None),
];

const ADVERTISE_EXECUTE: &[Entry] = &[
    ("CostInitialize", 800, None),
    ("CostFinalize", 1000, None),
    ("InstallValidate", 1400, None),
    ("InstallInitialize", 1500, None),
    ("CreateShortcuts", 4500, None),
    ("RegisterClassInfo", 4600, None),
    ("RegisterExtensionInfo", 4700, None),
    ("RegisterProgIdInfo", 4800, None),
    ("RegisterMIMEInfo", 4900, None),
    ("RegisterTypeLibraries", 5500, None),
    ("PublishComponents", 6200, None),
    ("MsiPublishAssemblies", 6250, None),
    ("PublishFeatures", 6300, None),
    ("PublishProduct", 6400, None),
    ("InstallFinalize", 6600, None),
];

const INSTALL_EXECUTE: &[Entry] = &[
    ("FindRelatedProducts", 25, None),
    ("AppSearch", 50, None),
    ("LaunchConditions", 100, None),
    ("CCPSearch", 500, Some("NOT Installed")),
    ("RMCCPSearch", 600, Some("NOT Installed")),
    ("ValidateProductID", 700, None),
    ("CostInitialize", 800, None),
    ("FileCost", 900, None),
    ("IsolateComponents", 950, None),
    ("CostFinalize", 1000, None),
    ("SetODBCFolders", 1100, None),
    ("MigrateFeatureStates", 1200, None),
    ("InstallValidate", 1400, None),
    ("InstallInitialize", 1500, None),
    ("AllocateRegistrySpace", 1550, Some("NOT Installed")),
    ("ProcessComponents", 1600, None),
    ("UnpublishComponents", 1700, None),
    ("MsiUnpublishAssemblies", 1750, None),
    ("UnpublishFeatures", 1800, None),
    ("StopServices", 1900, Some("VersionNT")),
    ("DeleteServices", 2000, Some("VersionNT")),
    ("UnregisterComPlus", 2100, None),
    ("SelfUnregModules", 2200, None),
    ("UnregisterTypeLibraries", 2300, None),
    ("RemoveODBC", 2400, None),
    ("UnregisterFonts", 2500, None),
    ("RemoveRegistryValues", 2600, None),
    ("UnregisterClassInfo", 2700, None),
    ("UnregisterExtensionInfo", 2800, None),
    ("UnregisterProgIdInfo", 2900, None),
    ("UnregisterMIMEInfo", 3000, None),
    ("RemoveIniValues", 3100, None),
    ("RemoveShortcuts", 3200, None),
    ("RemoveEnvironmentStrings", 3300, None),
    ("RemoveDuplicateFiles", 3400, None),
    ("RemoveFiles", 3500, None),
    ("RemoveFolders", 3600, None),
    ("CreateFolders", 3700, None),
    ("MoveFiles", 3800, None),
    ("InstallFiles", 4000, None),
    ("PatchFiles", 4090, None),
    ("DuplicateFiles", 4210, None),
    ("BindImage", 4300, None),
    ("CreateShortcuts", 4500, None),
    ("RegisterClassInfo", 4600, None),
    ("RegisterExtensionInfo", 4700, None),
    ("RegisterProgIdInfo", 4800, None),
    ("RegisterMIMEInfo", 4900, None),
    ("WriteRegistryValues", 5000, None),
    ("WriteIniValues", 5100, None),
    ("WriteEnvironmentStrings", 5200, None),
    ("RegisterFonts", 5300, None),
    ("InstallODBC", 5400, None),
    ("RegisterTypeLibraries", 5500, None),
    ("SelfRegModules", 5600, None),
    ("RegisterComPlus", 5700, None),
    ("InstallServices", 5800, Some("VersionNT")),
    ("StartServices", 5900, Some("VersionNT")),
    ("RegisterUser", 6000, None),
    ("RegisterProduct", 6100, None),
    ("PublishComponents", 6200, None),
    ("MsiPublishAssemblies", 6250, None),
    ("PublishFeatures", 6300, None),
    ("PublishProduct", 6400, None),
    ("InstallFinalize", 6600, None),
    ("RemoveExistingProducts", 6700, None),
];

const INSTALL_UI: &[Entry] = &[
    ("FindRelatedProducts", 25, None),
    ("AppSearch", 50, None),
    ("LaunchConditions", 100, None),
    ("CCPSearch", 500, Some("NOT Installed")),
    ("RMCCPSearch", 600, Some("NOT Installed")),
    ("ValidateProductID", 700, None),
    ("CostInitialize", 800, None),
    ("FileCost", 900, None),
    ("IsolateComponents", 950, None),
    ("CostFinalize", 1000, None),
    ("MigrateFeatureStates", 1200, None),
    ("ExecuteAction", 1300, None),
];

/// Actions every product schedules, whatever its tables.
fn skeleton(sequence: SequenceType) -> &'static [&'static str] {
    match sequence {
        SequenceType::AdminExecute => &[
            "CostInitialize",
            "FileCost",
            "CostFinalize",
            "InstallValidate",
            "InstallInitialize",
            "InstallAdminPackage",
            "InstallFiles",
            "InstallFinalize",
        ],
        SequenceType::AdminUI => &["CostInitialize", "FileCost", "CostFinalize", "ExecuteAction"],
        SequenceType::AdvertiseExecute => &[
            "CostInitialize",
            "CostFinalize",
            "InstallValidate",
            "InstallInitialize",
            "PublishFeatures",
            "PublishProduct",
            "InstallFinalize",
        ],
        SequenceType::InstallExecute => &[
            "ValidateProductID",
            "CostInitialize",
            "FileCost",
            "CostFinalize",
            "InstallValidate",
            "InstallInitialize",
            "ProcessComponents",
            "UnpublishFeatures",
            "RegisterUser",
            "RegisterProduct",
            "PublishFeatures",
            "PublishProduct",
            "InstallFinalize",
        ],
        SequenceType::InstallUI => &[
            "CostInitialize",
            "FileCost",
            "CostFinalize",
            "ValidateProductID",
            "ExecuteAction",
        ],
    }
}

fn entries(sequence: SequenceType) -> &'static [Entry] {
    match sequence {
        SequenceType::AdminExecute => ADMIN_EXECUTE,
        SequenceType::AdminUI => ADMIN_UI,
        SequenceType::AdvertiseExecute => ADVERTISE_EXECUTE,
        SequenceType::InstallExecute => INSTALL_EXECUTE,
        SequenceType::InstallUI => INSTALL_UI,
    }
}

static STANDARD_ACTIONS: LazyLock<Result<StandardActions, String>> =
    LazyLock::new(StandardActions::build);

/// Immutable catalog of standard actions keyed by sequence and id.
#[derive(Debug)]
pub struct StandardActions {
    actions: BTreeMap<ActionKey, Action>,
}

impl StandardActions {
    /// The shared catalog.
    pub fn get() -> Result<&'static StandardActions, LinkFailure> {
        STANDARD_ACTIONS
            .as_ref()
            .map_err(|e| LinkFailure::Internal(format!("standard action catalog: {}", e)))
    }

    fn build() -> Result<Self, String> {
        let mut actions = BTreeMap::new();

        for sequence in SequenceType::ALL {
            for &(id, position, condition) in entries(sequence) {
                let mut action = Action::new(sequence, id, Scheduling::Absolute(position));
                action.condition = condition.map(str::to_string);

                if actions.insert(action.key(), action).is_some() {
                    return Err(format!("duplicate entry {}/{}", sequence, id));
                }
            }

            for id in skeleton(sequence) {
                if !actions.contains_key(&ActionKey::new(sequence, *id)) {
                    return Err(format!("required action {}/{} has no default", sequence, id));
                }
            }
        }

        Ok(StandardActions { actions })
    }

    pub fn action(&self, key: &ActionKey) -> Option<&Action> {
        self.actions.get(key)
    }

    pub fn contains(&self, key: &ActionKey) -> bool {
        self.actions.contains_key(key)
    }

    /// Default position of a standard action.
    pub fn position(&self, key: &ActionKey) -> Option<i32> {
        match self.actions.get(key)?.scheduling {
            Scheduling::Absolute(position) => Some(position),
            _ => None,
        }
    }

    /// Catalog entries of one sequence, by id.
    pub fn sequence(&self, sequence: SequenceType) -> impl Iterator<Item = &Action> {
        self.actions
            .values()
            .filter(move |action| action.sequence == sequence)
    }

    /// Keys of the actions a product always schedules in `sequence`.
    pub fn skeleton(&self, sequence: SequenceType) -> impl Iterator<Item = ActionKey> {
        skeleton(sequence)
            .iter()
            .map(move |id| ActionKey::new(sequence, *id))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        let catalog = StandardActions::get().unwrap();
        assert!(catalog.len() > 90);
        assert_eq!(
            catalog.position(&ActionKey::new(SequenceType::InstallExecute, "LaunchConditions")),
            Some(100)
        );
        assert_eq!(
            catalog.position(&ActionKey::new(SequenceType::InstallExecute, "InstallFiles")),
            Some(4000)
        );
    }

    #[test]
    fn test_skeleton_actions_are_in_catalog() {
        let catalog = StandardActions::get().unwrap();
        for sequence in SequenceType::ALL {
            for key in catalog.skeleton(sequence) {
                assert!(catalog.contains(&key), "{} missing", key);
            }
        }
    }

    #[test]
    fn test_positions_unique_within_sequence() {
        let catalog = StandardActions::get().unwrap();
        for sequence in SequenceType::ALL {
            let mut positions: Vec<i32> = catalog
                .sequence(sequence)
                .filter_map(|a| catalog.position(&a.key()))
                .collect();
            let count = positions.len();
            positions.sort();
            positions.dedup();
            assert_eq!(positions.len(), count, "{}", sequence);
        }
    }

    #[test]
    fn test_default_conditions() {
        let catalog = StandardActions::get().unwrap();
        let action = catalog
            .action(&ActionKey::new(SequenceType::InstallExecute, "StartServices"))
            .unwrap();
        assert_eq!(action.condition.as_deref(), Some("VersionNT"));
    }
}
