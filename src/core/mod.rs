//! Core data structures for pkglink.
//!
//! This module contains the types exchanged with the front end and the
//! serializer:
//! - Sections, tables, rows and references (input)
//! - Actions and sequence types
//! - Table schemas
//! - The resolved Output

pub mod action;
pub mod output;
pub mod section;
pub mod table_definition;

pub use action::{Action, ActionKey, Scheduling, SequenceType};
pub use output::{Output, OutputRow, OutputTable, OutputType, SequencedAction, SuppressedSequences};
pub use section::{
    BacklinkKind, ComplexReference, ComplexReferenceChildType, ComplexReferenceParentType,
    FeatureBacklink, Reference, Row, Section, SectionType, Table, Value,
};
pub use table_definition::{ColumnDefinition, ColumnType, TableDefinition, TableDefinitions};
