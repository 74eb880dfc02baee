//! Table schemas.
//!
//! The linker consults table definitions to compute symbol names from
//! primary keys, to validate row shapes, and to find localizable and
//! patchable columns. The built-in catalog is embedded as TOML and parsed
//! once; sections may add custom definitions on top of it.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::action::SequenceType;
use crate::core::section::{Row, Value};

const STANDARD_TABLES: &str = include_str!("tables.toml");

/// Parsed once per process.
static STANDARD: LazyLock<Result<TableDefinitions, TableDefinitionError>> =
    LazyLock::new(TableDefinitions::load_standard);

/// Errors in table definitions or in rows checked against them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableDefinitionError {
    #[error("table `{table}` has no columns")]
    NoColumns { table: String },

    #[error("table `{table}` declares column `{column}` more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("primary key column `{table}.{column}` must not be nullable")]
    NullablePrimaryKey { table: String, column: String },

    #[error("primary key column `{table}.{column}` must be a string or number column")]
    InvalidPrimaryKeyType { table: String, column: String },

    #[error("failed to parse table catalog: {0}")]
    Parse(String),
}

/// Errors in a row checked against its definition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowShapeError {
    #[error("expected {expected} values but found {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("column `{column}` cannot be null")]
    UnexpectedNull { column: String },

    #[error("column `{column}` expects {expected} but found `{found}`")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: String,
    },
}

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    /// String column whose values may be localized.
    Localized,
    Number,
    Object,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "a string"),
            ColumnType::Localized => write!(f, "a localizable string"),
            ColumnType::Number => write!(f, "a number"),
            ColumnType::Object => write!(f, "an object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDefinition {
            name: name.into(),
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_localizable(&self) -> bool {
        self.column_type == ColumnType::Localized
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self.column_type, value) {
            (_, Value::Null) => self.nullable,
            (ColumnType::Number, Value::Number(_)) => true,
            (ColumnType::String | ColumnType::Localized, Value::String(_)) => true,
            (ColumnType::Object, Value::Object { .. } | Value::String(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        TableDefinition {
            name: name.into(),
            columns,
        }
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Whether rows of this table are globally addressable.
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    /// Primary key values of a row, rendered as strings.
    pub fn primary_keys(&self, row: &Row) -> Vec<String> {
        self.columns
            .iter()
            .zip(&row.values)
            .filter(|(c, _)| c.primary_key)
            .map(|(_, v)| v.to_string())
            .collect()
    }

    /// Check the definition's own composition.
    pub fn validate(&self) -> Result<(), TableDefinitionError> {
        if self.columns.is_empty() {
            return Err(TableDefinitionError::NoColumns {
                table: self.name.clone(),
            });
        }

        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TableDefinitionError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }

            if column.primary_key {
                if column.nullable {
                    return Err(TableDefinitionError::NullablePrimaryKey {
                        table: self.name.clone(),
                        column: column.name.clone(),
                    });
                }
                if column.column_type == ColumnType::Object {
                    return Err(TableDefinitionError::InvalidPrimaryKeyType {
                        table: self.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Check a row against this definition.
    pub fn check_row(&self, row: &Row) -> Result<(), RowShapeError> {
        if row.values.len() != self.columns.len() {
            return Err(RowShapeError::ColumnCount {
                expected: self.columns.len(),
                found: row.values.len(),
            });
        }

        for (column, value) in self.columns.iter().zip(&row.values) {
            if column.accepts(value) {
                continue;
            }
            if value.is_null() {
                return Err(RowShapeError::UnexpectedNull {
                    column: column.name.clone(),
                });
            }
            return Err(RowShapeError::TypeMismatch {
                column: column.name.clone(),
                expected: column.column_type,
                found: value.to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    table: Vec<TableDefinition>,
}

/// A name-keyed set of table definitions.
#[derive(Debug, Clone, Default)]
pub struct TableDefinitions {
    tables: HashMap<String, TableDefinition>,
}

impl TableDefinitions {
    pub fn new() -> Self {
        TableDefinitions::default()
    }

    /// The built-in catalog.
    pub fn standard() -> Result<Self, TableDefinitionError> {
        (*STANDARD).clone()
    }

    fn load_standard() -> Result<Self, TableDefinitionError> {
        let mut definitions = Self::from_toml(STANDARD_TABLES)?;
        for sequence in SequenceType::ALL {
            definitions.insert(sequence_table(sequence.table_name()))?;
            definitions.insert(module_sequence_table(sequence.module_table_name()))?;
        }
        Ok(definitions)
    }

    /// Parse a catalog document with one `[[table]]` entry per table.
    pub fn from_toml(contents: &str) -> Result<Self, TableDefinitionError> {
        let file: CatalogFile =
            toml::from_str(contents).map_err(|e| TableDefinitionError::Parse(e.to_string()))?;

        let mut definitions = TableDefinitions::new();
        for table in file.table {
            definitions.insert(table)?;
        }
        Ok(definitions)
    }

    /// Validate and add (or replace) a definition.
    pub fn insert(&mut self, definition: TableDefinition) -> Result<(), TableDefinitionError> {
        definition.validate()?;
        self.tables.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn sequence_table(name: &str) -> TableDefinition {
    TableDefinition::new(
        name,
        vec![
            ColumnDefinition::new("Action", ColumnType::String).primary_key(),
            ColumnDefinition::new("Condition", ColumnType::String).nullable(),
            ColumnDefinition::new("Sequence", ColumnType::Number).nullable(),
        ],
    )
}

fn module_sequence_table(name: &str) -> TableDefinition {
    TableDefinition::new(
        name,
        vec![
            ColumnDefinition::new("Action", ColumnType::String).primary_key(),
            ColumnDefinition::new("Sequence", ColumnType::Number).nullable(),
            ColumnDefinition::new("BaseAction", ColumnType::String).nullable(),
            ColumnDefinition::new("After", ColumnType::Number).nullable(),
            ColumnDefinition::new("Condition", ColumnType::String).nullable(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_loads() {
        let definitions = TableDefinitions::standard().unwrap();
        let component = definitions.get("Component").unwrap();
        assert_eq!(component.column_index("KeyPath"), Some(5));
        assert!(definitions.contains("InstallExecuteSequence"));
        assert!(definitions.contains("ModuleAdvtExecuteSequence"));
        assert!(definitions.get("Feature").unwrap().columns[2].is_localizable());
    }

    #[test]
    fn test_primary_keys_in_column_order() {
        let definitions = TableDefinitions::standard().unwrap();
        let fc = definitions.get("FeatureComponents").unwrap();
        let row = Row::new(vec!["Main".into(), "CompA".into()]);
        assert_eq!(fc.primary_keys(&row), vec!["Main", "CompA"]);
    }

    #[test]
    fn test_validate_rejects_nullable_primary_key() {
        let def = TableDefinition::new(
            "Custom",
            vec![ColumnDefinition::new("Id", ColumnType::String)
                .primary_key()
                .nullable()],
        );
        assert_eq!(
            def.validate(),
            Err(TableDefinitionError::NullablePrimaryKey {
                table: "Custom".to_string(),
                column: "Id".to_string(),
            })
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let def = TableDefinition::new(
            "Custom",
            vec![
                ColumnDefinition::new("Id", ColumnType::String).primary_key(),
                ColumnDefinition::new("Id", ColumnType::Number),
            ],
        );
        assert!(matches!(
            def.validate(),
            Err(TableDefinitionError::DuplicateColumn { .. })
        ));
    }

    #[test]
    fn test_check_row_shapes() {
        let definitions = TableDefinitions::standard().unwrap();
        let property = definitions.get("Property").unwrap();

        assert!(property.check_row(&Row::new(vec!["A".into(), "1".into()])).is_ok());
        assert_eq!(
            property.check_row(&Row::new(vec!["A".into()])),
            Err(RowShapeError::ColumnCount {
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            property.check_row(&Row::new(vec!["A".into(), Value::Null])),
            Err(RowShapeError::UnexpectedNull { .. })
        ));
        assert!(matches!(
            property.check_row(&Row::new(vec![Value::Number(1), "x".into()])),
            Err(RowShapeError::TypeMismatch { .. })
        ));
    }
}
