//! Section fixtures for linker tests.
//!
//! `SectionFixture` builds a [`Section`] the way the front end would emit
//! it; the free functions build rows for common tables with every column
//! the schema expects.

use crate::core::{
    Action, ActionKey, BacklinkKind, ComplexReference, ComplexReferenceChildType,
    ComplexReferenceParentType, FeatureBacklink, Reference, Row, Scheduling, Section, SectionType,
    SequenceType, TableDefinition, Value,
};

/// Builder for a compiled section.
#[derive(Debug, Clone)]
pub struct SectionFixture {
    section: Section,
}

fn sequence(name: &str) -> SequenceType {
    name.parse()
        .unwrap_or_else(|e| panic!("bad sequence in fixture: {}", e))
}

impl SectionFixture {
    pub fn new(id: impl Into<String>, section_type: SectionType) -> Self {
        SectionFixture {
            section: Section::new(id, section_type),
        }
    }

    pub fn product(id: impl Into<String>) -> Self {
        Self::new(id, SectionType::Product)
    }

    pub fn module(id: impl Into<String>) -> Self {
        Self::new(id, SectionType::Module)
    }

    pub fn fragment(id: impl Into<String>) -> Self {
        Self::new(id, SectionType::Fragment)
    }

    pub fn codepage(mut self, codepage: u32) -> Self {
        self.section.codepage = codepage;
        self
    }

    /// Append a row to a table, creating the table on first use.
    pub fn row(mut self, table: &str, values: Vec<Value>) -> Self {
        self.section.table_mut(table).rows.push(Row::new(values));
        self
    }

    /// Reference a single-key symbol.
    pub fn reference(mut self, table: &str, key: &str) -> Self {
        self.section.references.push(Reference::new(table, key));
        self
    }

    pub fn complex(
        mut self,
        parent_type: ComplexReferenceParentType,
        parent: &str,
        child_type: ComplexReferenceChildType,
        child: &str,
    ) -> Self {
        self.section
            .complex_references
            .push(ComplexReference::new(parent_type, parent, child_type, child));
        self
    }

    pub fn complex_primary(
        mut self,
        parent_type: ComplexReferenceParentType,
        parent: &str,
        child_type: ComplexReferenceChildType,
        child: &str,
    ) -> Self {
        self.section
            .complex_references
            .push(ComplexReference::new(parent_type, parent, child_type, child).primary());
        self
    }

    /// Add a fully built complex reference, e.g. one with a module language.
    pub fn complex_reference(mut self, reference: ComplexReference) -> Self {
        self.section.complex_references.push(reference);
        self
    }

    /// Implicit feature ownership of a component.
    pub fn feature_component(self, feature: &str, component: &str) -> Self {
        self.complex(
            ComplexReferenceParentType::Feature,
            feature,
            ComplexReferenceChildType::Component,
            component,
        )
    }

    pub fn backlink(mut self, table: &str, key: &str, kind: BacklinkKind, component: &str) -> Self {
        self.section.feature_backlinks.push(FeatureBacklink {
            target: Reference::new(table, key),
            kind,
            component: component.to_string(),
        });
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.section.actions.push(action);
        self
    }

    pub fn custom_action_at(self, seq: &str, id: &str, position: i32) -> Self {
        self.action(Action::new(sequence(seq), id, Scheduling::Absolute(position)))
    }

    pub fn custom_action_before(self, seq: &str, id: &str, anchor: &str) -> Self {
        self.action(Action::new(sequence(seq), id, Scheduling::Before(anchor.to_string())))
    }

    pub fn custom_action_after(self, seq: &str, id: &str, anchor: &str) -> Self {
        self.action(Action::new(sequence(seq), id, Scheduling::After(anchor.to_string())))
    }

    pub fn suppress(mut self, seq: &str, id: &str) -> Self {
        self.section
            .suppressed_actions
            .push(ActionKey::new(sequence(seq), id));
        self
    }

    pub fn table_definition(mut self, definition: TableDefinition) -> Self {
        self.section.table_definitions.push(definition);
        self
    }

    pub fn build(self) -> Section {
        self.section
    }
}

/// `Property` row.
pub fn property(id: &str, value: &str) -> Vec<Value> {
    vec![id.into(), value.into()]
}

/// `Component` row with no key path.
pub fn component(id: &str, directory: &str) -> Vec<Value> {
    vec![
        id.into(),
        Value::Null,
        directory.into(),
        Value::Number(0),
        Value::Null,
        Value::Null,
    ]
}

/// Top-level `Feature` row.
pub fn feature(id: &str) -> Vec<Value> {
    vec![
        id.into(),
        Value::Null,
        id.into(),
        Value::Null,
        Value::Number(2),
        Value::Number(1),
        Value::Null,
        Value::Number(0),
    ]
}

/// `Shortcut` row whose feature column is filled in by a backlink.
pub fn shortcut(id: &str, component: &str) -> Vec<Value> {
    let mut values = vec![
        id.into(),
        "ProgramMenuFolder".into(),
        id.into(),
        component.into(),
        Value::Null,
    ];
    values.resize(12, Value::Null);
    values
}

/// `File` row.
pub fn file(id: &str, component: &str) -> Vec<Value> {
    vec![
        id.into(),
        component.into(),
        format!("{}.dat", id).into(),
        Value::Number(0),
        Value::Null,
        Value::Null,
        Value::Null,
        Value::Number(1),
    ]
}
