//! Per-table link policy.
//!
//! Each table name maps to the standard actions its presence requires and
//! the outputs it may appear in. Tables without an entry trigger nothing and
//! are legal everywhere.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::core::{ActionKey, OutputType, SequenceType};

use crate::core::SequenceType::{
    AdminExecute as Admin, AdvertiseExecute as Advt, InstallExecute as Exec, InstallUI as Ui,
};

/// Output types a table may be linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    Any,
    /// Never part of a merge module.
    ProductOnly,
    /// Only part of a merge module.
    ModuleOnly,
}

/// What linking rows of one table implies.
#[derive(Debug, Clone, Copy)]
pub struct TablePolicy {
    pub triggers: &'static [(SequenceType, &'static str)],
    pub legality: Legality,
}

impl TablePolicy {
    const fn triggers(triggers: &'static [(SequenceType, &'static str)]) -> Self {
        TablePolicy {
            triggers,
            legality: Legality::Any,
        }
    }

    const fn legality(legality: Legality) -> Self {
        TablePolicy {
            triggers: &[],
            legality,
        }
    }

    pub fn is_legal(&self, output_type: OutputType) -> bool {
        match self.legality {
            Legality::Any => true,
            Legality::ProductOnly => output_type != OutputType::Module,
            Legality::ModuleOnly => output_type != OutputType::Product,
        }
    }

    /// Add the actions this table requires.
    pub fn apply(&self, required: &mut BTreeSet<ActionKey>) {
        for &(sequence, id) in self.triggers {
            required.insert(ActionKey::new(sequence, id));
        }
    }
}

static POLICIES: LazyLock<HashMap<&'static str, TablePolicy>> = LazyLock::new(|| {
    let mut policies = HashMap::new();

    let mut add = |table: &'static str, policy: TablePolicy| {
        policies.insert(table, policy);
    };

    add("AppSearch", TablePolicy::triggers(&[(Exec, "AppSearch"), (Ui, "AppSearch")]));
    add("BindImage", TablePolicy::triggers(&[(Exec, "BindImage")]));
    add(
        "CCPSearch",
        TablePolicy::triggers(&[
            (Exec, "CCPSearch"),
            (Exec, "RMCCPSearch"),
            (Ui, "CCPSearch"),
            (Ui, "RMCCPSearch"),
        ]),
    );
    add(
        "Class",
        TablePolicy::triggers(&[
            (Exec, "RegisterClassInfo"),
            (Exec, "UnregisterClassInfo"),
            (Advt, "RegisterClassInfo"),
        ]),
    );
    add(
        "Complus",
        TablePolicy::triggers(&[(Exec, "RegisterComPlus"), (Exec, "UnregisterComPlus")]),
    );
    add(
        "CreateFolder",
        TablePolicy::triggers(&[(Exec, "CreateFolders"), (Exec, "RemoveFolders")]),
    );
    add(
        "DuplicateFile",
        TablePolicy::triggers(&[
            (Exec, "DuplicateFiles"),
            (Exec, "RemoveDuplicateFiles"),
            (Admin, "DuplicateFiles"),
        ]),
    );
    add(
        "Environment",
        TablePolicy::triggers(&[
            (Exec, "WriteEnvironmentStrings"),
            (Exec, "RemoveEnvironmentStrings"),
        ]),
    );
    add(
        "Extension",
        TablePolicy::triggers(&[
            (Exec, "RegisterExtensionInfo"),
            (Exec, "UnregisterExtensionInfo"),
            (Advt, "RegisterExtensionInfo"),
        ]),
    );
    add(
        "File",
        TablePolicy::triggers(&[
            (Exec, "InstallFiles"),
            (Exec, "RemoveFiles"),
            (Admin, "InstallFiles"),
        ]),
    );
    add(
        "Font",
        TablePolicy::triggers(&[(Exec, "RegisterFonts"), (Exec, "UnregisterFonts")]),
    );
    add(
        "IniFile",
        TablePolicy::triggers(&[(Exec, "WriteIniValues"), (Exec, "RemoveIniValues")]),
    );
    add(
        "IsolatedComponent",
        TablePolicy::triggers(&[(Exec, "IsolateComponents"), (Ui, "IsolateComponents")]),
    );
    add(
        "LaunchCondition",
        TablePolicy::triggers(&[(Exec, "LaunchConditions"), (Ui, "LaunchConditions")]),
    );
    add(
        "MIME",
        TablePolicy::triggers(&[
            (Exec, "RegisterMIMEInfo"),
            (Exec, "UnregisterMIMEInfo"),
            (Advt, "RegisterMIMEInfo"),
        ]),
    );
    add("MoveFile", TablePolicy::triggers(&[(Exec, "MoveFiles")]));
    add(
        "MsiAssembly",
        TablePolicy::triggers(&[
            (Exec, "MsiPublishAssemblies"),
            (Exec, "MsiUnpublishAssemblies"),
            (Advt, "MsiPublishAssemblies"),
        ]),
    );

    const ODBC: &[(SequenceType, &str)] = &[
        (Exec, "SetODBCFolders"),
        (Exec, "InstallODBC"),
        (Exec, "RemoveODBC"),
    ];
    add("ODBCDataSource", TablePolicy::triggers(ODBC));
    add("ODBCDriver", TablePolicy::triggers(ODBC));
    add("ODBCTranslator", TablePolicy::triggers(ODBC));

    add(
        "Patch",
        TablePolicy::triggers(&[(Exec, "PatchFiles"), (Admin, "PatchFiles")]),
    );
    add(
        "ProgId",
        TablePolicy::triggers(&[
            (Exec, "RegisterProgIdInfo"),
            (Exec, "UnregisterProgIdInfo"),
            (Advt, "RegisterProgIdInfo"),
        ]),
    );
    add(
        "PublishComponent",
        TablePolicy::triggers(&[
            (Exec, "PublishComponents"),
            (Exec, "UnpublishComponents"),
            (Advt, "PublishComponents"),
        ]),
    );
    add(
        "Registry",
        TablePolicy::triggers(&[(Exec, "WriteRegistryValues"), (Exec, "RemoveRegistryValues")]),
    );
    add("RemoveFile", TablePolicy::triggers(&[(Exec, "RemoveFiles")]));
    add(
        "RemoveRegistry",
        TablePolicy::triggers(&[(Exec, "WriteRegistryValues"), (Exec, "RemoveRegistryValues")]),
    );
    add(
        "SelfReg",
        TablePolicy::triggers(&[(Exec, "SelfRegModules"), (Exec, "SelfUnregModules")]),
    );
    add(
        "ServiceControl",
        TablePolicy::triggers(&[
            (Exec, "StartServices"),
            (Exec, "StopServices"),
            (Exec, "DeleteServices"),
        ]),
    );
    add("ServiceInstall", TablePolicy::triggers(&[(Exec, "InstallServices")]));
    add(
        "Shortcut",
        TablePolicy::triggers(&[
            (Exec, "CreateShortcuts"),
            (Exec, "RemoveShortcuts"),
            (Advt, "CreateShortcuts"),
        ]),
    );
    add(
        "TypeLib",
        TablePolicy::triggers(&[
            (Exec, "RegisterTypeLibraries"),
            (Exec, "UnregisterTypeLibraries"),
            (Advt, "RegisterTypeLibraries"),
        ]),
    );
    add(
        "Upgrade",
        TablePolicy {
            triggers: &[
                (Exec, "FindRelatedProducts"),
                (Exec, "MigrateFeatureStates"),
                (Ui, "FindRelatedProducts"),
                (Ui, "MigrateFeatureStates"),
            ],
            legality: Legality::ProductOnly,
        },
    );

    for table in ["Feature", "FeatureComponents", "Media"] {
        add(table, TablePolicy::legality(Legality::ProductOnly));
    }

    for table in [
        "ModuleSignature",
        "ModuleComponents",
        "ModuleDependency",
        "ModuleExclusion",
    ] {
        add(table, TablePolicy::legality(Legality::ModuleOnly));
    }
    for sequence in SequenceType::ALL {
        add(
            sequence.module_table_name(),
            TablePolicy::legality(Legality::ModuleOnly),
        );
    }

    policies
});

/// Policy for a table, if it has one.
pub fn policy(table: &str) -> Option<&'static TablePolicy> {
    POLICIES.get(table)
}

/// Whether rows of `table` may be linked into `output_type`.
pub fn is_legal(table: &str, output_type: OutputType) -> bool {
    policy(table).map_or(true, |p| p.is_legal(output_type))
}
