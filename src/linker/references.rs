//! Reference reachability.
//!
//! Starting from the entry section, follow every outgoing reference to the
//! section that defines its symbol. The sections reached are live and will
//! be folded into the output; everything else is ignored.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::{OutputType, Section};
use crate::linker::errors::LinkError;
use crate::linker::location;
use crate::linker::symbols::{SectionIndex, SymbolTable};
use crate::util::{LinkerConfig, Messages};

/// Result of the reachability walk.
#[derive(Debug, Clone)]
pub struct Reachability {
    /// Sections reached from the entry section.
    pub live: BTreeSet<SectionIndex>,
    /// Symbols referenced by live sections.
    pub referenced: HashSet<String>,
    /// Which section pulled in which.
    pub graph: SectionGraph,
}

/// Directed graph of section references, labelled with the symbol followed.
#[derive(Debug, Clone)]
pub struct SectionGraph {
    graph: DiGraph<SectionIndex, String>,
    nodes: HashMap<SectionIndex, NodeIndex>,
    entry: SectionIndex,
}

impl SectionGraph {
    fn new(entry: SectionIndex) -> Self {
        let mut graph = SectionGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            entry,
        };
        graph.node(entry);
        graph
    }

    fn node(&mut self, section: SectionIndex) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&section) {
            return node;
        }
        let node = self.graph.add_node(section);
        self.nodes.insert(section, node);
        node
    }

    fn add_edge(&mut self, from: SectionIndex, to: SectionIndex, symbol: &str) {
        let from = self.node(from);
        let to = self.node(to);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, symbol.to_string());
        }
    }

    pub fn entry(&self) -> SectionIndex {
        self.entry
    }

    /// Sections directly referenced by `section`.
    pub fn references(&self, section: SectionIndex) -> Vec<SectionIndex> {
        match self.nodes.get(&section) {
            Some(&node) => self.graph.neighbors(node).map(|n| self.graph[n]).collect(),
            None => Vec::new(),
        }
    }

    /// Sections that reference `section`.
    pub fn referenced_by(&self, section: SectionIndex) -> Vec<SectionIndex> {
        match self.nodes.get(&section) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Shortest chain of references from the entry section to `section`.
    ///
    /// Each step is the section reached and the symbol that pulled it in.
    pub fn path_to(&self, section: SectionIndex) -> Option<Vec<(SectionIndex, String)>> {
        let start = *self.nodes.get(&self.entry)?;
        let goal = *self.nodes.get(&section)?;

        let (_, path) = astar(&self.graph, start, |n| n == goal, |_| 1, |_| 0)?;

        let steps = path
            .windows(2)
            .filter_map(|pair| {
                let edge = self.graph.find_edge(pair[0], pair[1])?;
                Some((self.graph[pair[1]], self.graph[edge].clone()))
            })
            .collect();
        Some(steps)
    }
}

/// Walk references from the entry section.
///
/// Uses an explicit stack so reference chains of any depth are safe; each
/// section is expanded at most once, which also bounds cyclic graphs.
pub fn resolve_references(
    sections: &[Section],
    symbols: &SymbolTable,
    entry: SectionIndex,
    output_type: OutputType,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) -> Reachability {
    let mut live = BTreeSet::new();
    let mut referenced = HashSet::new();
    let mut graph = SectionGraph::new(entry);
    let mut stack = vec![entry];

    live.insert(entry);

    while let Some(current) = stack.pop() {
        let section = &sections[current.0];

        for reference in &section.references {
            if output_type == OutputType::Module && reference.table == "Media" {
                continue;
            }

            let name = reference.symbolic_name();
            let Some(symbol) = symbols.get(&name) else {
                report_unresolved(&name, section, None, config, messages);
                continue;
            };

            if symbol.table(sections) != Some("Component") {
                referenced.insert(name.clone());
            }

            let target = symbol.section();
            if target != current {
                graph.add_edge(current, target, &name);
            }
            if live.insert(target) {
                stack.push(target);
            }
        }
    }

    tracing::debug!(
        "{} of {} sections are live, {} symbols referenced",
        live.len(),
        sections.len(),
        referenced.len()
    );

    Reachability {
        live,
        referenced,
        graph,
    }
}

/// Report a reference to a symbol that does not exist.
pub fn report_unresolved(
    name: &str,
    section: &Section,
    line: Option<u32>,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) {
    let message = LinkError::UnresolvedReference {
        name: name.to_string(),
        section: section.id.clone(),
    }
    .to_message()
    .with_location(location(section, line));

    if config.allow_unresolved_references {
        messages.emit(message.as_warning());
    } else {
        messages.emit(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TableDefinitions;
    use crate::test_support::{component, property, SectionFixture};
    use crate::util::{CollectingSink, Severity};

    fn walk(
        sections: &[Section],
        config: &LinkerConfig,
        sink: &mut CollectingSink,
    ) -> Reachability {
        let definitions = TableDefinitions::standard().unwrap();
        let mut messages = Messages::new(sink);
        let symbols = SymbolTable::build(sections, &definitions, &mut messages);
        let output_type = OutputType::from_entry(sections[0].section_type).unwrap();
        resolve_references(
            sections,
            &symbols,
            SectionIndex(0),
            output_type,
            config,
            &mut messages,
        )
    }

    #[test]
    fn test_unreferenced_sections_are_not_live() {
        let sections = vec![
            SectionFixture::product("prod").reference("Property", "A").build(),
            SectionFixture::fragment("a").row("Property", property("A", "1")).build(),
            SectionFixture::fragment("b").row("Property", property("B", "1")).build(),
        ];

        let mut sink = CollectingSink::new();
        let reach = walk(&sections, &LinkerConfig::default(), &mut sink);

        assert_eq!(
            reach.live.iter().copied().collect::<Vec<_>>(),
            vec![SectionIndex(0), SectionIndex(1)]
        );
        assert!(reach.referenced.contains("Property:A"));
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_cyclic_references_terminate() {
        let sections = vec![
            SectionFixture::product("prod").reference("Property", "A").build(),
            SectionFixture::fragment("a")
                .row("Property", property("A", "1"))
                .reference("Property", "B")
                .build(),
            SectionFixture::fragment("b")
                .row("Property", property("B", "1"))
                .reference("Property", "A")
                .build(),
        ];

        let mut sink = CollectingSink::new();
        let reach = walk(&sections, &LinkerConfig::default(), &mut sink);

        assert_eq!(reach.live.len(), 3);
        assert_eq!(reach.graph.references(SectionIndex(1)), vec![SectionIndex(2)]);
        assert_eq!(reach.graph.referenced_by(SectionIndex(1)).len(), 2);
    }

    #[test]
    fn test_unresolved_reference_is_error() {
        let sections = vec![SectionFixture::product("prod")
            .reference("Property", "Missing")
            .build()];

        let mut sink = CollectingSink::new();
        walk(&sections, &LinkerConfig::default(), &mut sink);
        assert_eq!(sink.ids(Severity::Error), vec![3]);
    }

    #[test]
    fn test_unresolved_reference_tolerated() {
        let sections = vec![SectionFixture::product("prod")
            .reference("Property", "Missing")
            .build()];
        let config = LinkerConfig {
            allow_unresolved_references: true,
            ..Default::default()
        };

        let mut sink = CollectingSink::new();
        walk(&sections, &config, &mut sink);
        assert!(sink.errors().next().is_none());
        assert_eq!(sink.ids(Severity::Warning), vec![3]);
    }

    #[test]
    fn test_component_symbols_not_marked_referenced() {
        let sections = vec![
            SectionFixture::product("prod").reference("Component", "C1").build(),
            SectionFixture::fragment("comps").row("Component", component("C1", "INSTALLDIR")).build(),
        ];

        let mut sink = CollectingSink::new();
        let reach = walk(&sections, &LinkerConfig::default(), &mut sink);
        assert!(reach.live.contains(&SectionIndex(1)));
        assert!(!reach.referenced.contains("Component:C1"));
    }

    #[test]
    fn test_module_ignores_media_references() {
        let sections = vec![SectionFixture::module("mod")
            .reference("Media", "1")
            .build()];

        let mut sink = CollectingSink::new();
        walk(&sections, &LinkerConfig::default(), &mut sink);
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_path_to_section() {
        let sections = vec![
            SectionFixture::product("prod").reference("Property", "A").build(),
            SectionFixture::fragment("a")
                .row("Property", property("A", "1"))
                .reference("Property", "B")
                .build(),
            SectionFixture::fragment("b").row("Property", property("B", "1")).build(),
        ];

        let mut sink = CollectingSink::new();
        let reach = walk(&sections, &LinkerConfig::default(), &mut sink);

        let path = reach.graph.path_to(SectionIndex(2)).unwrap();
        assert_eq!(
            path,
            vec![
                (SectionIndex(1), "Property:A".to_string()),
                (SectionIndex(2), "Property:B".to_string()),
            ]
        );
        assert_eq!(reach.graph.path_to(SectionIndex(0)), Some(Vec::new()));
    }
}
