//! The `explain` operation: why a section is part of a link.

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::linker::Linker;
use crate::ops::link::load_sections;
use crate::util::{LinkerConfig, MessageSink};

/// How a section was reached from the entry section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionReason {
    /// The section is the entry section itself.
    Entry,

    /// Reached through the listed `(section, symbol)` steps.
    Referenced(Vec<(String, String)>),

    /// Nothing live references the section.
    Unreferenced,
}

#[derive(Debug, Clone)]
pub struct ExplainReport {
    pub section: String,
    pub entry: String,
    pub reason: SectionReason,
}

/// Resolve references across section files and explain one section.
pub fn explain_section(
    paths: &[PathBuf],
    section: &str,
    config: &LinkerConfig,
    sink: &mut dyn MessageSink,
) -> Result<ExplainReport> {
    let sections = load_sections(paths)?;
    let explanation = Linker::new(config.clone())?.explain(sections, sink)?;

    if !explanation.contains(section) {
        bail!(
            "section `{}` not found in the given files\n\
             help: section ids are the `id` field of each section",
            section
        );
    }

    let reason = if explanation.entry() == section {
        SectionReason::Entry
    } else {
        match explanation.path_to(section) {
            Some(steps) => SectionReason::Referenced(steps),
            None => SectionReason::Unreferenced,
        }
    };

    Ok(ExplainReport {
        section: section.to_string(),
        entry: explanation.entry().to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{property, SectionFixture};
    use crate::util::CollectingSink;
    use tempfile::TempDir;

    fn sections_file(tmp: &TempDir) -> PathBuf {
        let sections = vec![
            SectionFixture::product("prod").reference("Property", "A").build(),
            SectionFixture::fragment("a").row("Property", property("A", "1")).build(),
            SectionFixture::fragment("stray").build(),
        ];
        let path = tmp.path().join("sections.json");
        std::fs::write(&path, serde_json::to_string(&sections).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_explain_reasons() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![sections_file(&tmp)];
        let config = LinkerConfig::default();
        let mut sink = CollectingSink::new();

        let entry = explain_section(&paths, "prod", &config, &mut sink).unwrap();
        assert_eq!(entry.reason, SectionReason::Entry);

        let referenced = explain_section(&paths, "a", &config, &mut sink).unwrap();
        assert_eq!(
            referenced.reason,
            SectionReason::Referenced(vec![("a".to_string(), "Property:A".to_string())])
        );

        let stray = explain_section(&paths, "stray", &config, &mut sink).unwrap();
        assert_eq!(stray.reason, SectionReason::Unreferenced);
        assert_eq!(stray.entry, "prod");
    }

    #[test]
    fn test_explain_unknown_section() {
        let tmp = TempDir::new().unwrap();
        let paths = vec![sections_file(&tmp)];
        let mut sink = CollectingSink::new();

        let err =
            explain_section(&paths, "nope", &LinkerConfig::default(), &mut sink).unwrap_err();
        assert!(err.to_string().contains("section `nope` not found"));
    }
}
