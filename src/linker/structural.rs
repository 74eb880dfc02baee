//! Structural (complex) reference resolution.
//!
//! Complex references say which feature, group or module owns which
//! component, group or feature. Resolving them assigns every child exactly
//! one primary owner per relationship kind plus any number of secondary
//! owners, and produces the association rows (`FeatureComponents`,
//! `ModuleComponents`) and `Feature.Feature_Parent` values.
//!
//! Primary assignment is first come, first served over the edge list of the
//! live sections in input order. An edge explicitly marked primary takes
//! over from an implicit primary; two explicit primaries conflict.

use std::collections::BTreeMap;

use crate::core::section::symbol_name;
use crate::core::{
    ComplexReference, ComplexReferenceChildType as Child, ComplexReferenceParentType as Parent,
    OutputType, Value,
};
use crate::linker::errors::{LinkError, LinkFailure, LinkWarning};
use crate::linker::references::report_unresolved;
use crate::linker::symbols::{RowAddress, SectionIndex, SymbolKind};
use crate::linker::{location, LinkState};
use crate::util::{LinkerConfig, Messages};

/// A module and language pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModuleRef {
    pub id: String,
    pub language: String,
}

impl ModuleRef {
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        ModuleRef {
            id: id.into(),
            language: language.into(),
        }
    }
}

impl std::fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.language)
    }
}

/// Primary plus secondary owners of one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection<T> {
    pub primary: T,
    pub is_explicit_primary: bool,
    pub secondaries: Vec<T>,
}

/// Component or group connections to features.
pub type ConnectToFeature = Connection<String>;

/// Group connections to modules.
pub type ConnectToModule = Connection<ModuleRef>;

impl<T: PartialEq> Connection<T> {
    fn new(primary: T, is_explicit_primary: bool) -> Self {
        Connection {
            primary,
            is_explicit_primary,
            secondaries: Vec::new(),
        }
    }

    pub fn contains(&self, parent: &T) -> bool {
        self.primary == *parent || self.secondaries.contains(parent)
    }

    /// Primary first, then secondaries in connection order.
    pub fn parents(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// Number of owners.
    pub fn len(&self) -> usize {
        1 + self.secondaries.len()
    }

    /// The primary was picked by position, not by an explicit flag, among
    /// several candidates.
    pub fn is_ambiguous(&self) -> bool {
        !self.is_explicit_primary && !self.secondaries.is_empty()
    }
}

/// Outcome of adding an edge to a connection map.
#[derive(Debug, PartialEq, Eq)]
enum Connect<T> {
    Added,
    AlreadyConnected,
    /// An explicit primary already exists.
    Conflict(T),
}

fn connect<T: Clone + PartialEq>(
    map: &mut BTreeMap<String, Connection<T>>,
    child: &str,
    parent: T,
    explicit: bool,
) -> Connect<T> {
    let Some(connection) = map.get_mut(child) else {
        map.insert(child.to_string(), Connection::new(parent, explicit));
        return Connect::Added;
    };

    if connection.contains(&parent) {
        if explicit && connection.primary != parent {
            if connection.is_explicit_primary {
                return Connect::Conflict(connection.primary.clone());
            }
            connection.secondaries.retain(|p| *p != parent);
            let previous = std::mem::replace(&mut connection.primary, parent);
            connection.secondaries.insert(0, previous);
            connection.is_explicit_primary = true;
        } else if explicit {
            connection.is_explicit_primary = true;
        }
        return Connect::AlreadyConnected;
    }

    if explicit {
        if connection.is_explicit_primary {
            return Connect::Conflict(connection.primary.clone());
        }
        let previous = std::mem::replace(&mut connection.primary, parent);
        connection.secondaries.insert(0, previous);
        connection.is_explicit_primary = true;
    } else {
        connection.secondaries.push(parent);
    }

    Connect::Added
}

/// Resolved ownership for one link.
#[derive(Debug, Default, Clone)]
pub struct StructuralResolution {
    pub component_features: BTreeMap<String, ConnectToFeature>,
    pub group_features: BTreeMap<String, ConnectToFeature>,
    pub group_modules: BTreeMap<String, ConnectToModule>,
    pub component_modules: BTreeMap<String, ModuleRef>,
    pub feature_parents: BTreeMap<String, String>,
}

impl StructuralResolution {
    /// The primary feature of a component, if it has one.
    pub fn primary_feature(&self, component: &str) -> Option<&str> {
        self.component_features
            .get(component)
            .map(|c| c.primary.as_str())
    }

    /// `FeatureComponents` rows, grouped by component.
    pub fn feature_component_rows(&self) -> Vec<Vec<Value>> {
        self.component_features
            .iter()
            .flat_map(|(component, connection)| {
                connection.parents().map(move |feature| {
                    vec![Value::from(feature.as_str()), Value::from(component.as_str())]
                })
            })
            .collect()
    }

    /// `ModuleComponents` rows.
    pub fn module_component_rows(&self) -> Vec<Vec<Value>> {
        self.component_modules
            .iter()
            .map(|(component, module)| {
                vec![
                    Value::from(component.as_str()),
                    Value::from(module.id.as_str()),
                    Value::Number(module.language.parse().unwrap_or(0)),
                ]
            })
            .collect()
    }
}

/// An edge waiting for its group to settle.
struct GroupMember {
    group: String,
    component: String,
    is_primary: bool,
    section: SectionIndex,
    line: Option<u32>,
}

struct Resolver<'s, 'm, 'a> {
    state: &'s mut LinkState,
    config: &'s LinkerConfig,
    messages: &'m mut Messages<'a>,
    result: StructuralResolution,
}

/// Resolve all complex references of live sections.
pub fn resolve_structure(
    state: &mut LinkState,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) -> Result<StructuralResolution, LinkFailure> {
    let mut resolver = Resolver {
        state,
        config,
        messages,
        result: StructuralResolution::default(),
    };

    let edges: Vec<(SectionIndex, ComplexReference)> = resolver
        .state
        .live_sections()
        .flat_map(|(index, section)| {
            section
                .complex_references
                .iter()
                .cloned()
                .map(move |edge| (index, edge))
        })
        .collect();

    let mut members = Vec::new();
    for (section, edge) in edges {
        resolver.resolve_edge(section, edge, &mut members)?;
    }

    for member in members {
        resolver.resolve_group_member(member);
    }

    if resolver.state.output_type == OutputType::Module {
        resolver.connect_remaining_to_entry_module();
    } else if resolver.state.output_type == OutputType::Product {
        resolver.report_orphans();
    }

    Ok(resolver.result)
}

impl Resolver<'_, '_, '_> {
    fn resolve_edge(
        &mut self,
        section: SectionIndex,
        edge: ComplexReference,
        members: &mut Vec<GroupMember>,
    ) -> Result<(), LinkFailure> {
        match (edge.parent_type, edge.child_type) {
            (Parent::Feature, Child::Component) => {
                if !self.require_symbol(section, "Feature", &edge.parent, edge.line)
                    || !self.require_symbol(section, "Component", &edge.child, edge.line)
                {
                    return Ok(());
                }
                self.connect_component_to_feature(
                    section,
                    &edge.child,
                    &edge.parent,
                    edge.is_primary,
                    edge.line,
                );
            }

            (Parent::Feature, Child::ComponentGroup) => {
                if !self.require_symbol(section, "Feature", &edge.parent, edge.line) {
                    return Ok(());
                }
                let outcome = connect(
                    &mut self.result.group_features,
                    &edge.child,
                    edge.parent.clone(),
                    edge.is_primary,
                );
                self.report_conflict(section, &edge, outcome);
            }

            (Parent::Module, Child::ComponentGroup) => {
                let module = ModuleRef::new(
                    edge.parent.clone(),
                    edge.parent_language.clone().unwrap_or_else(|| "0".to_string()),
                );
                let outcome = connect(
                    &mut self.result.group_modules,
                    &edge.child,
                    module,
                    edge.is_primary,
                );
                if let Connect::Conflict(existing) = outcome {
                    self.report_conflict(section, &edge, Connect::Conflict(existing.id));
                }
            }

            (Parent::ComponentGroup, Child::Component) => {
                if !self.require_symbol(section, "Component", &edge.child, edge.line) {
                    return Ok(());
                }
                members.push(GroupMember {
                    group: edge.parent,
                    component: edge.child,
                    is_primary: edge.is_primary,
                    section,
                    line: edge.line,
                });
            }

            (Parent::Feature, Child::Feature) => {
                if !self.require_symbol(section, "Feature", &edge.parent, edge.line)
                    || !self.require_symbol(section, "Feature", &edge.child, edge.line)
                {
                    return Ok(());
                }
                self.connect_feature_to_parent(section, &edge)?;
            }

            (Parent::Module, Child::Component) => {
                if !self.require_symbol(section, "Component", &edge.child, edge.line) {
                    return Ok(());
                }
                let module = ModuleRef::new(
                    edge.parent.clone(),
                    edge.parent_language.clone().unwrap_or_else(|| "0".to_string()),
                );
                self.connect_component_to_module(section, &edge.child, module, edge.line);
            }

            (parent_type, child_type) => {
                let section_ref = &self.state.sections[section.0];
                self.messages.emit(
                    LinkError::InvalidComplexReference {
                        parent_type: parent_type.to_string(),
                        parent: edge.parent.clone(),
                        child_type: child_type.to_string(),
                        child: edge.child.clone(),
                    }
                    .to_message()
                    .with_location(location(section_ref, edge.line)),
                );
            }
        }

        Ok(())
    }

    /// Expand a component→group edge into the group's features and module.
    fn resolve_group_member(&mut self, member: GroupMember) {
        if let Some(features) = self.result.group_features.get(&member.group).cloned() {
            for (i, feature) in features.parents().enumerate() {
                let explicit = i == 0 && (features.is_explicit_primary || member.is_primary);
                self.connect_component_to_feature(
                    member.section,
                    &member.component,
                    feature,
                    explicit,
                    member.line,
                );
            }
        }

        if let Some(modules) = self.result.group_modules.get(&member.group).cloned() {
            self.connect_component_to_module(
                member.section,
                &member.component,
                modules.primary,
                member.line,
            );
        }
    }

    fn connect_component_to_feature(
        &mut self,
        section: SectionIndex,
        component: &str,
        feature: &str,
        explicit: bool,
        line: Option<u32>,
    ) {
        let outcome = connect(
            &mut self.result.component_features,
            component,
            feature.to_string(),
            explicit,
        );

        match outcome {
            Connect::Added | Connect::AlreadyConnected => {
                self.state
                    .referenced
                    .insert(symbol_name("Component", &[component]));
            }
            Connect::Conflict(existing) => {
                let section_ref = &self.state.sections[section.0];
                self.messages.emit(
                    LinkError::MultiplePrimaryReferences {
                        child_type: Child::Component.to_string(),
                        child: component.to_string(),
                        parent_type: Parent::Feature.to_string(),
                        parent: feature.to_string(),
                        existing,
                    }
                    .to_message()
                    .with_location(location(section_ref, line)),
                );
            }
        }
    }

    fn connect_component_to_module(
        &mut self,
        section: SectionIndex,
        component: &str,
        module: ModuleRef,
        line: Option<u32>,
    ) {
        match self.result.component_modules.get(component) {
            None => {
                self.result
                    .component_modules
                    .insert(component.to_string(), module);
            }
            Some(existing) if *existing == module => {}
            Some(existing) => {
                let section_ref = &self.state.sections[section.0];
                self.messages.emit(
                    LinkError::ComponentReferencedTwice {
                        component: component.to_string(),
                        first: existing.id.clone(),
                        second: module.id,
                    }
                    .to_message()
                    .with_location(location(section_ref, line)),
                );
            }
        }
    }

    fn connect_feature_to_parent(
        &mut self,
        section: SectionIndex,
        edge: &ComplexReference,
    ) -> Result<(), LinkFailure> {
        if let Some(existing) = self.result.feature_parents.get(&edge.child) {
            if *existing != edge.parent {
                let section_ref = &self.state.sections[section.0];
                self.messages.emit(
                    LinkError::MultiplePrimaryReferences {
                        child_type: Child::Feature.to_string(),
                        child: edge.child.clone(),
                        parent_type: Parent::Feature.to_string(),
                        parent: edge.parent.clone(),
                        existing: existing.clone(),
                    }
                    .to_message()
                    .with_location(location(section_ref, edge.line)),
                );
            }
            return Ok(());
        }

        self.result
            .feature_parents
            .insert(edge.child.clone(), edge.parent.clone());
        self.state.set_column(
            &format!("Feature:{}", edge.child),
            "Feature_Parent",
            Value::from(edge.parent.as_str()),
        )?;
        Ok(())
    }

    fn report_conflict(
        &mut self,
        section: SectionIndex,
        edge: &ComplexReference,
        outcome: Connect<String>,
    ) {
        if let Connect::Conflict(existing) = outcome {
            let section_ref = &self.state.sections[section.0];
            self.messages.emit(
                LinkError::MultiplePrimaryReferences {
                    child_type: edge.child_type.to_string(),
                    child: edge.child.clone(),
                    parent_type: edge.parent_type.to_string(),
                    parent: edge.parent.clone(),
                    existing,
                }
                .to_message()
                .with_location(location(section_ref, edge.line)),
            );
        }
    }

    /// Check that a referenced row exists; report it otherwise.
    fn require_symbol(
        &mut self,
        section: SectionIndex,
        table: &str,
        id: &str,
        line: Option<u32>,
    ) -> bool {
        let name = format!("{}:{}", table, id);
        if self.state.symbols.contains(&name) {
            return true;
        }
        report_unresolved(
            &name,
            &self.state.sections[section.0],
            line,
            self.config,
            self.messages,
        );
        false
    }

    /// Components of a merge module belong to the module unless told otherwise.
    fn connect_remaining_to_entry_module(&mut self) {
        let module = self.state.entry_module();
        for component in self.live_components() {
            if !self.result.component_modules.contains_key(&component) {
                self.result
                    .component_modules
                    .insert(component, module.clone());
            }
        }
    }

    fn report_orphans(&mut self) {
        for (section, component, line) in self.live_component_rows() {
            if self
                .state
                .referenced
                .contains(&symbol_name("Component", &[&component]))
            {
                continue;
            }
            let section_ref = &self.state.sections[section.0];
            self.messages.emit(
                LinkWarning::OrphanedComponent { component }
                    .to_message()
                    .with_location(location(section_ref, line)),
            );
        }
    }

    fn live_components(&self) -> Vec<String> {
        self.live_component_rows()
            .into_iter()
            .map(|(_, component, _)| component)
            .collect()
    }

    /// Ids of every component row that will reach the output.
    fn live_component_rows(&self) -> Vec<(SectionIndex, String, Option<u32>)> {
        let mut components = Vec::new();
        for (index, section) in self.state.live_sections() {
            for (table_index, table) in section.tables.iter().enumerate() {
                if table.name != "Component" {
                    continue;
                }
                for (row_index, row) in table.rows.iter().enumerate() {
                    let kind = SymbolKind::Row(RowAddress {
                        section: index,
                        table: table_index,
                        row: row_index,
                    });
                    if self.state.dropped.contains(&kind) {
                        continue;
                    }
                    if let Some(id) = row.values.first().and_then(Value::as_str) {
                        components.push((index, id.to_string(), row.line));
                    }
                }
            }
        }
        components
    }
}
