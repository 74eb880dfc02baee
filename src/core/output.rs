//! Output - the resolved table set produced by a link.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::action::SequenceType;
use crate::core::section::{SectionType, Value};

/// Kind of package being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Product,
    Module,
    PatchCreation,
}

impl OutputType {
    /// Output type for an entry section, if it can be one.
    pub fn from_entry(section_type: SectionType) -> Option<Self> {
        match section_type {
            SectionType::Product => Some(OutputType::Product),
            SectionType::Module => Some(OutputType::Module),
            SectionType::PatchCreation => Some(OutputType::PatchCreation),
            SectionType::Fragment => None,
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Product => write!(f, "product"),
            OutputType::Module => write!(f, "module"),
            OutputType::PatchCreation => write!(f, "patch creation"),
        }
    }
}

/// A row in the output, optionally tagged with its originating section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

impl OutputRow {
    pub fn new(values: Vec<Value>) -> Self {
        OutputRow {
            values,
            section_id: None,
        }
    }

    /// String value of a column, if present.
    pub fn str_at(&self, column: usize) -> Option<&str> {
        self.values.get(column).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTable {
    pub name: String,
    pub rows: Vec<OutputRow>,
}

impl OutputTable {
    pub fn new(name: impl Into<String>) -> Self {
        OutputTable {
            name: name.into(),
            rows: Vec::new(),
        }
    }
}

/// A scheduled action in a sequence table.
///
/// Product outputs always carry an absolute `sequence`. Module outputs keep
/// relative anchors so the host product can place them at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedAction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<bool>,
}

/// Sequence tables left out of the output at the caller's request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedSequences {
    pub admin: bool,
    pub advertise: bool,
    pub ui: bool,
}

impl SuppressedSequences {
    pub fn contains(&self, sequence: SequenceType) -> bool {
        (self.admin && sequence.is_admin())
            || (self.advertise && sequence == SequenceType::AdvertiseExecute)
            || (self.ui && sequence.is_ui())
    }
}

/// The fully resolved link result handed to a serializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "type")]
    pub output_type: OutputType,
    pub codepage: u32,
    pub compressed: bool,
    pub long_file_names: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modularization_guid: Option<String>,

    /// Ids of the sections folded into this output, in input order.
    pub sections: Vec<String>,

    pub tables: BTreeMap<String, OutputTable>,

    /// Ordered actions per sequence table.
    pub sequences: BTreeMap<SequenceType, Vec<SequencedAction>>,

    pub suppressed_sequences: SuppressedSequences,
}

impl Output {
    pub fn new(output_type: OutputType) -> Self {
        Output {
            output_type,
            codepage: 0,
            compressed: false,
            long_file_names: true,
            modularization_guid: None,
            sections: Vec::new(),
            tables: BTreeMap::new(),
            sequences: BTreeMap::new(),
            suppressed_sequences: SuppressedSequences::default(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&OutputTable> {
        self.tables.get(name)
    }

    /// Get or create an output table.
    pub fn ensure_table(&mut self, name: &str) -> &mut OutputTable {
        self.tables
            .entry(name.to_string())
            .or_insert_with(|| OutputTable::new(name))
    }

    /// Ordered actions of one sequence, empty if the sequence was not produced.
    pub fn sequence(&self, sequence: SequenceType) -> &[SequencedAction] {
        self.sequences
            .get(&sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Position of an action in a sequence, if scheduled absolutely.
    pub fn action_position(&self, sequence: SequenceType, id: &str) -> Option<i32> {
        self.sequence(sequence)
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| a.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppressed_sequences_contains() {
        let suppressed = SuppressedSequences {
            admin: true,
            advertise: false,
            ui: true,
        };
        assert!(suppressed.contains(SequenceType::AdminExecute));
        assert!(suppressed.contains(SequenceType::AdminUI));
        assert!(suppressed.contains(SequenceType::InstallUI));
        assert!(!suppressed.contains(SequenceType::InstallExecute));
        assert!(!suppressed.contains(SequenceType::AdvertiseExecute));
    }
}
