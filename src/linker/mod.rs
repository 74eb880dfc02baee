//! The linker.
//!
//! Links a set of compiled sections into one output:
//!
//! 1. Symbols: index every keyed row and action declaration
//! 2. References: find the sections reachable from the entry section
//! 3. Structure: assign components to features and modules
//! 4. Backlinks: write owning features into dependent rows
//! 5. Sequencing: order the installation actions
//! 6. Assembly: fold live rows into output tables
//!
//! Diagnostics go to a [`MessageSink`]. After each stage the linker checks
//! whether an error was reported and stops if so.

pub mod assemble;
pub mod backlinks;
pub mod errors;
pub mod references;
pub mod sequencer;
pub mod standard_actions;
pub mod structural;
pub mod symbols;
pub mod table_policy;

use std::collections::{BTreeSet, HashSet};

use crate::core::{Output, OutputType, Row, Section, TableDefinitions, Value};
use crate::util::{LinkerConfig, Localizer, MessageSink, Messages, SourceLocation};

pub use errors::{LinkError, LinkFailure, LinkVerbose, LinkWarning};
pub use references::{Reachability, SectionGraph};
pub use standard_actions::StandardActions;
pub use structural::{ModuleRef, StructuralResolution};
pub use symbols::{SectionIndex, SymbolTable};

use assemble::{assemble, Resolved};
use backlinks::resolve_backlinks;
use references::resolve_references;
use sequencer::sequence_actions;
use structural::resolve_structure;
use symbols::{find_entry_section, SymbolKind};

/// Links sections into an [`Output`].
#[derive(Debug, Clone)]
pub struct Linker {
    config: LinkerConfig,
    localizer: Localizer,
    definitions: TableDefinitions,
}

impl Linker {
    /// Create a linker with the built-in table catalog.
    pub fn new(config: LinkerConfig) -> Result<Self, LinkFailure> {
        let definitions = TableDefinitions::standard()
            .map_err(|e| LinkFailure::Internal(format!("table catalog: {}", e)))?;

        Ok(Linker {
            config,
            localizer: Localizer::new(),
            definitions,
        })
    }

    pub fn with_localizer(mut self, localizer: Localizer) -> Self {
        self.localizer = localizer;
        self
    }

    /// Replace the table catalog.
    pub fn with_table_definitions(mut self, definitions: TableDefinitions) -> Self {
        self.definitions = definitions;
        self
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Link `sections` into an output.
    ///
    /// Every user-facing problem is reported to `sink`; the returned error
    /// only says how many there were.
    pub fn link(
        &self,
        sections: Vec<Section>,
        sink: &mut dyn MessageSink,
    ) -> Result<Output, LinkFailure> {
        let config = &self.config;
        let mut messages = Messages::new(sink).with_warnings_as_errors(config.warnings_as_errors);

        let mut state = LinkState::prepare_with_definitions(
            sections,
            self.definitions.clone(),
            config,
            &mut messages,
        )?;
        tracing::debug!("linking a {}", state.output_type);
        messages.emit(
            LinkVerbose::LiveSections {
                live: state.live.len(),
                total: state.sections.len(),
                entry: state.sections[state.entry.0].id.clone(),
            }
            .to_message(),
        );

        let structure = resolve_structure(&mut state, config, &mut messages)?;
        checkpoint(&messages, "structural references")?;
        messages.emit(
            LinkVerbose::StructureResolved {
                features: structure.component_features.len(),
                modules: structure.component_modules.len(),
            }
            .to_message(),
        );

        resolve_backlinks(&mut state, &structure, config, &mut messages)?;
        checkpoint(&messages, "feature backlinks")?;

        let sequencing = sequence_actions(&state, config, &mut messages)?;
        checkpoint(&messages, "action sequencing")?;
        messages.emit(
            LinkVerbose::ActionsSequenced {
                actions: sequencing.sequences.values().map(Vec::len).sum(),
                tables: sequencing.sequences.len(),
            }
            .to_message(),
        );

        let output = assemble(
            &state,
            Resolved {
                structure: &structure,
                sequencing,
            },
            &self.localizer,
            config,
            &mut messages,
        )?;
        checkpoint(&messages, "assembly")?;
        messages.emit(
            LinkVerbose::OutputAssembled {
                tables: output.tables.len(),
                rows: output.tables.values().map(|t| t.rows.len()).sum(),
            }
            .to_message(),
        );

        Ok(output)
    }

    /// Resolve references only, to explain which sections are linked and why.
    pub fn explain(
        &self,
        sections: Vec<Section>,
        sink: &mut dyn MessageSink,
    ) -> Result<Explanation, LinkFailure> {
        let mut messages =
            Messages::new(sink).with_warnings_as_errors(self.config.warnings_as_errors);
        let state = LinkState::prepare_with_definitions(
            sections,
            self.definitions.clone(),
            &self.config,
            &mut messages,
        )?;

        Ok(Explanation {
            section_ids: state.sections.iter().map(|s| s.id.clone()).collect(),
            live: state.live,
            graph: state.graph,
        })
    }
}

/// Why each section is, or is not, part of a link.
#[derive(Debug, Clone)]
pub struct Explanation {
    section_ids: Vec<String>,
    live: BTreeSet<SectionIndex>,
    graph: SectionGraph,
}

impl Explanation {
    fn find(&self, id: &str) -> Option<SectionIndex> {
        self.section_ids.iter().position(|s| s == id).map(SectionIndex)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    pub fn entry(&self) -> &str {
        &self.section_ids[self.graph.entry().0]
    }

    pub fn is_live(&self, id: &str) -> bool {
        self.find(id).is_some_and(|index| self.live.contains(&index))
    }

    /// Ids of live sections, in input order.
    pub fn live_sections(&self) -> Vec<&str> {
        self.live
            .iter()
            .map(|index| self.section_ids[index.0].as_str())
            .collect()
    }

    /// The chain of `(section, symbol)` steps from the entry section to `id`.
    pub fn path_to(&self, id: &str) -> Option<Vec<(String, String)>> {
        let index = self.find(id)?;
        let path = self.graph.path_to(index)?;
        Some(
            path.into_iter()
                .map(|(section, symbol)| (self.section_ids[section.0].clone(), symbol))
                .collect(),
        )
    }
}

/// Working state shared by the link passes.
#[derive(Debug)]
pub struct LinkState {
    pub sections: Vec<Section>,
    pub definitions: TableDefinitions,
    pub symbols: SymbolTable,
    pub entry: SectionIndex,
    pub output_type: OutputType,
    pub live: BTreeSet<SectionIndex>,
    pub referenced: HashSet<String>,
    /// Rows and actions left out because an identical copy survives.
    pub dropped: HashSet<SymbolKind>,
    pub graph: SectionGraph,
}

impl LinkState {
    /// Run the symbol and reference passes with the built-in table catalog.
    pub fn prepare(
        sections: Vec<Section>,
        config: &LinkerConfig,
        messages: &mut Messages<'_>,
    ) -> Result<Self, LinkFailure> {
        let definitions = TableDefinitions::standard()
            .map_err(|e| LinkFailure::Internal(format!("table catalog: {}", e)))?;
        Self::prepare_with_definitions(sections, definitions, config, messages)
    }

    /// Run the symbol and reference passes.
    pub fn prepare_with_definitions(
        sections: Vec<Section>,
        mut definitions: TableDefinitions,
        config: &LinkerConfig,
        messages: &mut Messages<'_>,
    ) -> Result<Self, LinkFailure> {
        let entry = match find_entry_section(&sections) {
            Ok(entry) => entry,
            Err(e) => {
                messages.emit(e.to_message());
                return Err(LinkFailure::Errors {
                    count: messages.error_count(),
                });
            }
        };
        let output_type =
            OutputType::from_entry(sections[entry.0].section_type).ok_or_else(|| {
                LinkFailure::Internal(format!(
                    "entry section `{}` is a fragment",
                    sections[entry.0].id
                ))
            })?;

        for section in &sections {
            for definition in &section.table_definitions {
                if let Err(e) = definitions.insert(definition.clone()) {
                    messages.emit(
                        LinkError::MalformedTableDefinition {
                            section: section.id.clone(),
                            reason: e.to_string(),
                        }
                        .to_message()
                        .with_location(location(section, None)),
                    );
                }
            }
        }

        let mut symbols = SymbolTable::build(&sections, &definitions, messages);
        checkpoint(messages, "symbol table")?;

        let reach = resolve_references(&sections, &symbols, entry, output_type, config, messages);
        let dropped = symbols.report_duplicates(&sections, &reach.live, config, messages);
        symbols.prefer_live(&reach.live);
        checkpoint(messages, "reference resolution")?;

        Ok(LinkState {
            sections,
            definitions,
            symbols,
            entry,
            output_type,
            live: reach.live,
            referenced: reach.referenced,
            dropped,
            graph: reach.graph,
        })
    }

    /// Live sections in input order.
    pub fn live_sections(&self) -> impl Iterator<Item = (SectionIndex, &Section)> + '_ {
        self.live
            .iter()
            .map(move |&index| (index, &self.sections[index.0]))
    }

    /// The row a symbol names.
    pub fn row(&self, symbol: &symbols::Symbol) -> Option<&Row> {
        match symbol.kind {
            SymbolKind::Row(address) => self.sections[address.section.0]
                .tables
                .get(address.table)?
                .rows
                .get(address.row),
            SymbolKind::Action { .. } => None,
        }
    }

    /// Overwrite one column of the row bound to `symbol`.
    ///
    /// Returns `false` if the symbol does not name a row. A row too short to
    /// have the column is left alone; assembly reports it as malformed.
    pub fn set_column(
        &mut self,
        symbol: &str,
        column: &str,
        value: Value,
    ) -> Result<bool, LinkFailure> {
        let Some(SymbolKind::Row(address)) = self.symbols.get(symbol).map(|s| s.kind) else {
            return Ok(false);
        };

        let table = &mut self.sections[address.section.0].tables[address.table];
        let definition = self.definitions.get(&table.name).ok_or_else(|| {
            LinkFailure::Internal(format!("no definition for table `{}`", table.name))
        })?;
        let index = definition.column_index(column).ok_or_else(|| {
            LinkFailure::Internal(format!("table `{}` has no column `{}`", table.name, column))
        })?;

        if let Some(slot) = table.rows[address.row].values.get_mut(index) {
            *slot = value;
        }
        Ok(true)
    }

    /// The module being built, for module outputs.
    pub fn entry_module(&self) -> ModuleRef {
        let entry = &self.sections[self.entry.0];
        let signature = entry.table("ModuleSignature").and_then(|t| t.rows.first());

        let id = signature
            .and_then(|row| row.values.first())
            .and_then(Value::as_str)
            .unwrap_or(&entry.id);
        let language = signature
            .and_then(|row| row.values.get(1))
            .map(Value::to_string)
            .filter(|language| !language.is_empty())
            .unwrap_or_else(|| "0".to_string());

        ModuleRef::new(id, language)
    }
}

/// Stop the link if any error was reported so far.
fn checkpoint(messages: &Messages<'_>, stage: &str) -> Result<(), LinkFailure> {
    if messages.encountered_error() {
        tracing::debug!("stopping after {}: {} error(s)", stage, messages.error_count());
        return Err(LinkFailure::Errors {
            count: messages.error_count(),
        });
    }
    Ok(())
}

/// Diagnostic location for a section.
pub(crate) fn location(section: &Section, line: Option<u32>) -> SourceLocation {
    SourceLocation {
        section: section.id.clone(),
        path: section.source_path.clone(),
        line,
    }
}
