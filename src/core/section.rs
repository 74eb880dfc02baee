//! Sections - the compiled units handed to the linker.
//!
//! A Section is produced once by the front end and owns its tables, its
//! outgoing references and its deferred structural requests. The linker
//! only mutates a section to patch feature columns once ownership is known.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::action::{Action, ActionKey};
use crate::core::table_definition::TableDefinition;

/// The kind of a compiled section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Product,
    Module,
    Fragment,
    PatchCreation,
}

impl SectionType {
    /// Whether a section of this type can start a link.
    pub fn is_entry(self) -> bool {
        !matches!(self, SectionType::Fragment)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionType::Product => write!(f, "product"),
            SectionType::Module => write!(f, "module"),
            SectionType::Fragment => write!(f, "fragment"),
            SectionType::PatchCreation => write!(f, "patch creation"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(i32),
    String(String),
    /// Binary stream reference (file path or stream name).
    Object { object: String },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object { object } => write!(f, "{}", object),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row of typed column values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,

    /// Source line the row was compiled from, for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values, line: None }
    }

    /// Structural identity ignores source positions.
    pub fn is_identical(&self, other: &Row) -> bool {
        self.values == other.values
    }
}

/// A named, ordered list of rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            rows: Vec::new(),
        }
    }
}

/// A symbolic reference to a row in another (or the same) section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub table: String,
    pub keys: Vec<String>,
}

impl Reference {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Reference {
            table: table.into(),
            keys: vec![key.into()],
        }
    }

    /// The global symbol name this reference resolves against.
    pub fn symbolic_name(&self) -> String {
        symbol_name(&self.table, &self.keys)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbolic_name())
    }
}

/// Build the symbol name for a table and its primary key values.
pub fn symbol_name<S: AsRef<str>>(table: &str, keys: &[S]) -> String {
    let keys: Vec<&str> = keys.iter().map(AsRef::as_ref).collect();
    format!("{}:{}", table, keys.join("/"))
}

/// Parent side of a complex reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexReferenceParentType {
    Feature,
    ComponentGroup,
    Module,
}

impl fmt::Display for ComplexReferenceParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexReferenceParentType::Feature => write!(f, "Feature"),
            ComplexReferenceParentType::ComponentGroup => write!(f, "ComponentGroup"),
            ComplexReferenceParentType::Module => write!(f, "Module"),
        }
    }
}

/// Child side of a complex reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexReferenceChildType {
    Component,
    ComponentGroup,
    Feature,
}

impl fmt::Display for ComplexReferenceChildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexReferenceChildType::Component => write!(f, "Component"),
            ComplexReferenceChildType::ComponentGroup => write!(f, "ComponentGroup"),
            ComplexReferenceChildType::Feature => write!(f, "Feature"),
        }
    }
}

/// A typed parent/child edge between features, groups, modules and components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexReference {
    pub parent_type: ComplexReferenceParentType,
    pub parent: String,
    /// Module language, only meaningful for module parents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_language: Option<String>,
    pub child_type: ComplexReferenceChildType,
    pub child: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl ComplexReference {
    pub fn new(
        parent_type: ComplexReferenceParentType,
        parent: impl Into<String>,
        child_type: ComplexReferenceChildType,
        child: impl Into<String>,
    ) -> Self {
        ComplexReference {
            parent_type,
            parent: parent.into(),
            parent_language: None,
            child_type,
            child: child.into(),
            is_primary: false,
            line: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.parent_language = Some(language.into());
        self
    }
}

/// Which kind of row a feature backlink patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacklinkKind {
    Class,
    Extension,
    PublishComponent,
    Shortcut,
    TypeLib,
}

impl BacklinkKind {
    /// The column that receives the component's feature.
    pub fn feature_column(self) -> &'static str {
        match self {
            BacklinkKind::Shortcut => "Target",
            BacklinkKind::Class
            | BacklinkKind::Extension
            | BacklinkKind::PublishComponent
            | BacklinkKind::TypeLib => "Feature_",
        }
    }
}

impl fmt::Display for BacklinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacklinkKind::Class => write!(f, "Class"),
            BacklinkKind::Extension => write!(f, "Extension"),
            BacklinkKind::PublishComponent => write!(f, "PublishComponent"),
            BacklinkKind::Shortcut => write!(f, "Shortcut"),
            BacklinkKind::TypeLib => write!(f, "TypeLib"),
        }
    }
}

/// A deferred request to write a component's feature into a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureBacklink {
    pub target: Reference,
    pub kind: BacklinkKind,
    pub component: String,
}

/// A compiled unit of source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,

    #[serde(rename = "type")]
    pub section_type: SectionType,

    #[serde(default)]
    pub codepage: u32,

    /// Originating source file, for diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,

    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default)]
    pub references: Vec<Reference>,

    #[serde(default)]
    pub complex_references: Vec<ComplexReference>,

    #[serde(default)]
    pub feature_backlinks: Vec<FeatureBacklink>,

    /// Action scheduling customizations and custom actions.
    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub suppressed_actions: Vec<ActionKey>,

    /// Custom table schemas declared by this section.
    #[serde(default)]
    pub table_definitions: Vec<TableDefinition>,
}

impl Section {
    pub fn new(id: impl Into<String>, section_type: SectionType) -> Self {
        Section {
            id: id.into(),
            section_type,
            codepage: 0,
            source_path: None,
            tables: Vec::new(),
            references: Vec::new(),
            complex_references: Vec::new(),
            feature_backlinks: Vec::new(),
            actions: Vec::new(),
            suppressed_actions: Vec::new(),
            table_definitions: Vec::new(),
        }
    }

    /// Find a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Find or create a table by name.
    pub fn table_mut(&mut self, name: &str) -> &mut Table {
        let index = match self.tables.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                self.tables.push(Table::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    /// Human readable label used in diagnostics.
    pub fn display_name(&self) -> String {
        match &self.source_path {
            Some(path) => format!("{} ({})", self.id, path.display()),
            None => self.id.clone(),
        }
    }
}
