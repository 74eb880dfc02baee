//! Installation actions and the sequence tables that order them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::output::OutputType;

/// One of the five installation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    AdminExecute,
    AdminUI,
    AdvertiseExecute,
    InstallExecute,
    InstallUI,
}

impl SequenceType {
    pub const ALL: [SequenceType; 5] = [
        SequenceType::AdminExecute,
        SequenceType::AdminUI,
        SequenceType::AdvertiseExecute,
        SequenceType::InstallExecute,
        SequenceType::InstallUI,
    ];

    /// Name of the sequence table in a product database.
    pub fn table_name(self) -> &'static str {
        match self {
            SequenceType::AdminExecute => "AdminExecuteSequence",
            SequenceType::AdminUI => "AdminUISequence",
            SequenceType::AdvertiseExecute => "AdvtExecuteSequence",
            SequenceType::InstallExecute => "InstallExecuteSequence",
            SequenceType::InstallUI => "InstallUISequence",
        }
    }

    /// Name of the sequence table in a merge module.
    pub fn module_table_name(self) -> &'static str {
        match self {
            SequenceType::AdminExecute => "ModuleAdminExecuteSequence",
            SequenceType::AdminUI => "ModuleAdminUISequence",
            SequenceType::AdvertiseExecute => "ModuleAdvtExecuteSequence",
            SequenceType::InstallExecute => "ModuleInstallExecuteSequence",
            SequenceType::InstallUI => "ModuleInstallUISequence",
        }
    }

    /// Sequence table name for the given output type.
    pub fn table_name_for(self, output_type: OutputType) -> &'static str {
        match output_type {
            OutputType::Module => self.module_table_name(),
            _ => self.table_name(),
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, SequenceType::AdminExecute | SequenceType::AdminUI)
    }

    pub fn is_ui(self) -> bool {
        matches!(self, SequenceType::AdminUI | SequenceType::InstallUI)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

impl FromStr for SequenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "adminexecute" | "adminexecutesequence" => Ok(SequenceType::AdminExecute),
            "adminui" | "adminuisequence" => Ok(SequenceType::AdminUI),
            "advertiseexecute" | "advtexecutesequence" => Ok(SequenceType::AdvertiseExecute),
            "installexecute" | "installexecutesequence" => Ok(SequenceType::InstallExecute),
            "installui" | "installuisequence" => Ok(SequenceType::InstallUI),
            _ => Err(format!(
                "invalid sequence '{}'; expected one of admin-execute, admin-ui, \
                 advertise-execute, install-execute, install-ui",
                s
            )),
        }
    }
}

/// Identity of an action: its sequence and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionKey {
    pub sequence: SequenceType,
    pub id: String,
}

impl ActionKey {
    pub fn new(sequence: SequenceType, id: impl Into<String>) -> Self {
        ActionKey {
            sequence,
            id: id.into(),
        }
    }

    /// Symbol name used to make actions referenceable.
    pub fn symbol_name(&self) -> String {
        format!("WixAction:{}/{}", self.sequence.table_name(), self.id)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sequence.table_name(), self.id)
    }
}

/// How an action is placed in its sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scheduling {
    /// Fixed position. Negative values -1..-4 are on-exit triggers.
    Absolute(i32),
    /// Immediately before another action of the same sequence.
    Before(String),
    /// Immediately after another action of the same sequence.
    After(String),
    /// Keep the default position (standard actions only).
    #[default]
    Unscheduled,
}

impl Scheduling {
    /// The anchor action, for relative scheduling.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Scheduling::Before(id) | Scheduling::After(id) => Some(id),
            _ => None,
        }
    }
}

/// On-exit trigger positions pass through sequencing verbatim.
pub const ON_EXIT_SUSPEND: i32 = -4;

/// An action declaration or a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub sequence: SequenceType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub scheduling: Scheduling,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Action {
    pub fn new(sequence: SequenceType, id: impl Into<String>, scheduling: Scheduling) -> Self {
        Action {
            sequence,
            id: id.into(),
            condition: None,
            scheduling,
            line: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn key(&self) -> ActionKey {
        ActionKey::new(self.sequence, self.id.clone())
    }
}

/// True for the reserved on-exit positions.
pub fn is_terminal_position(position: i32) -> bool {
    (ON_EXIT_SUSPEND..0).contains(&position)
}
