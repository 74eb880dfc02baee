//! Symbol table construction.
//!
//! Every row of a keyed table and every action declaration becomes a symbol
//! named `Table:key1/key2`. Collisions are recorded, not reported: whether a
//! collision matters depends on which sections end up live, so the report is
//! made after reference resolution.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::section::symbol_name;
use crate::core::{Section, TableDefinitions};
use crate::linker::errors::{LinkError, LinkWarning};
use crate::linker::location;
use crate::util::{LinkerConfig, Messages};

/// Index of a section in the link's section arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionIndex(pub usize);

/// Address of one row inside the section arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowAddress {
    pub section: SectionIndex,
    pub table: usize,
    pub row: usize,
}

/// What a symbol is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Row(RowAddress),
    Action { section: SectionIndex, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn section(&self) -> SectionIndex {
        match self.kind {
            SymbolKind::Row(address) => address.section,
            SymbolKind::Action { section, .. } => section,
        }
    }

    /// Table name for row symbols.
    pub fn table<'a>(&self, sections: &'a [Section]) -> Option<&'a str> {
        match self.kind {
            SymbolKind::Row(address) => {
                Some(sections[address.section.0].tables[address.table].name.as_str())
            }
            SymbolKind::Action { .. } => None,
        }
    }

    fn is_identical(&self, other: &Symbol, sections: &[Section]) -> bool {
        match (self.kind, other.kind) {
            (SymbolKind::Row(a), SymbolKind::Row(b)) => {
                let a = &sections[a.section.0].tables[a.table].rows[a.row];
                let b = &sections[b.section.0].tables[b.table].rows[b.row];
                a.is_identical(b)
            }
            (
                SymbolKind::Action { section: sa, index: ia },
                SymbolKind::Action { section: sb, index: ib },
            ) => {
                let a = &sections[sa.0].actions[ia];
                let b = &sections[sb.0].actions[ib];
                a.sequence == b.sequence
                    && a.id == b.id
                    && a.condition == b.condition
                    && a.scheduling == b.scheduling
            }
            _ => false,
        }
    }
}

/// All symbols sharing one name; the first entry is the one in the table.
#[derive(Debug, Clone)]
pub struct DuplicateSymbols {
    pub name: String,
    pub symbols: Vec<Symbol>,
}

/// The global symbol index of one link.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    duplicates: Vec<DuplicateSymbols>,
    duplicate_index: HashMap<String, usize>,
}

impl SymbolTable {
    /// Index every symbol-bearing row and action in all sections.
    ///
    /// Tables without a definition are reported as errors and skipped.
    pub fn build(
        sections: &[Section],
        definitions: &TableDefinitions,
        messages: &mut Messages<'_>,
    ) -> Self {
        let mut table = SymbolTable::default();

        for (section_index, section) in sections.iter().enumerate() {
            let section_index = SectionIndex(section_index);

            for (table_index, rows) in section.tables.iter().enumerate() {
                let Some(definition) = definitions.get(&rows.name) else {
                    messages.emit(
                        LinkError::UnknownTable {
                            table: rows.name.clone(),
                            section: section.id.clone(),
                        }
                        .to_message()
                        .with_location(location(section, None)),
                    );
                    continue;
                };

                if !definition.has_primary_key() {
                    continue;
                }

                for (row_index, row) in rows.rows.iter().enumerate() {
                    let name = symbol_name(&rows.name, &definition.primary_keys(row));
                    table.insert(Symbol {
                        name,
                        kind: SymbolKind::Row(RowAddress {
                            section: section_index,
                            table: table_index,
                            row: row_index,
                        }),
                    });
                }
            }

            for (index, action) in section.actions.iter().enumerate() {
                table.insert(Symbol {
                    name: action.key().symbol_name(),
                    kind: SymbolKind::Action {
                        section: section_index,
                        index,
                    },
                });
            }
        }

        tracing::debug!(
            "indexed {} symbols ({} names collide)",
            table.symbols.len(),
            table.duplicates.len()
        );

        table
    }

    fn insert(&mut self, symbol: Symbol) {
        match self.symbols.get(&symbol.name) {
            None => {
                self.symbols.insert(symbol.name.clone(), symbol);
            }
            Some(existing) => {
                let index = match self.duplicate_index.get(&symbol.name) {
                    Some(&index) => index,
                    None => {
                        self.duplicates.push(DuplicateSymbols {
                            name: symbol.name.clone(),
                            symbols: vec![existing.clone()],
                        });
                        self.duplicate_index
                            .insert(symbol.name.clone(), self.duplicates.len() - 1);
                        self.duplicates.len() - 1
                    }
                };
                self.duplicates[index].symbols.push(symbol);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn duplicates(&self) -> &[DuplicateSymbols] {
        &self.duplicates
    }

    /// Bind every colliding name to its first copy in a live section.
    ///
    /// The table holds the first copy in input order, which may belong to a
    /// section that did not make it into the link.
    pub fn prefer_live(&mut self, live: &BTreeSet<SectionIndex>) {
        for duplicate in &self.duplicates {
            let Some(kept) = duplicate
                .symbols
                .iter()
                .find(|s| live.contains(&s.section()))
            else {
                continue;
            };
            if let Some(bound) = self.symbols.get_mut(&duplicate.name) {
                *bound = kept.clone();
            }
        }
    }

    /// Report collisions between live sections.
    ///
    /// Returns the symbols whose rows or actions must be left out of the
    /// output because an identical copy survives.
    pub fn report_duplicates(
        &self,
        sections: &[Section],
        live: &BTreeSet<SectionIndex>,
        config: &LinkerConfig,
        messages: &mut Messages<'_>,
    ) -> HashSet<SymbolKind> {
        let mut dropped = HashSet::new();

        for duplicate in &self.duplicates {
            let live_symbols: Vec<&Symbol> = duplicate
                .symbols
                .iter()
                .filter(|s| live.contains(&s.section()))
                .collect();

            let Some((kept, others)) = live_symbols.split_first() else {
                continue;
            };
            if others.is_empty() {
                continue;
            }

            let identical = others.iter().all(|s| kept.is_identical(s, sections));
            if config.allow_identical_rows && identical {
                for other in others {
                    let section = &sections[other.section().0];
                    messages.emit(
                        LinkWarning::IdenticalRows {
                            name: duplicate.name.clone(),
                            section: section.id.clone(),
                        }
                        .to_message()
                        .with_location(location(section, None)),
                    );
                    dropped.insert(other.kind);
                }
                continue;
            }

            let first = &sections[kept.section().0];
            messages.emit(
                LinkError::DuplicateSymbol {
                    name: duplicate.name.clone(),
                    sections: live_symbols
                        .iter()
                        .map(|s| sections[s.section().0].display_name())
                        .collect(),
                }
                .to_message()
                .with_location(location(first, None)),
            );
        }

        dropped
    }
}

/// Find the single Product, Module or PatchCreation section.
pub fn find_entry_section(sections: &[Section]) -> Result<SectionIndex, LinkError> {
    let mut entry: Option<SectionIndex> = None;

    for (index, section) in sections.iter().enumerate() {
        if !section.section_type.is_entry() {
            continue;
        }

        if let Some(first) = entry {
            return Err(LinkError::MultipleEntrySections {
                first: sections[first.0].id.clone(),
                second: section.id.clone(),
            });
        }
        entry = Some(SectionIndex(index));
    }

    entry.ok_or(LinkError::MissingEntrySection)
}
