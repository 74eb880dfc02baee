//! Section loading and the `link` operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::{Output, Section};
use crate::linker::Linker;
use crate::util::{LinkerConfig, Localizer, MessageSink};

/// Options for linking section files.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Section files, in link order
    pub sections: Vec<PathBuf>,

    /// Where to write the output; `None` skips writing
    pub output: Option<PathBuf>,

    /// Localization file with a `[strings]` table
    pub localization: Option<PathBuf>,

    pub config: LinkerConfig,
}

/// A section file holds one section or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SectionFile {
    One(Box<Section>),
    Many(Vec<Section>),
}

/// Read sections from JSON files, keeping file order.
///
/// Sections without a source path are stamped with the file they came from
/// so diagnostics can point at it.
pub fn load_sections(paths: &[PathBuf]) -> Result<Vec<Section>> {
    let mut sections = Vec::new();

    for path in paths {
        let loaded = load_section_file(path)?;
        debug!("Loaded {} section(s) from {}", loaded.len(), path.display());

        sections.extend(loaded.into_iter().map(|mut section| {
            if section.source_path.is_none() {
                section.source_path = Some(path.clone());
            }
            section
        }));
    }

    Ok(sections)
}

fn load_section_file(path: &Path) -> Result<Vec<Section>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read section file: {}", path.display()))?;

    let file: SectionFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse section file: {}", path.display()))?;

    Ok(match file {
        SectionFile::One(section) => vec![*section],
        SectionFile::Many(sections) => sections,
    })
}

/// Link section files and write the output as pretty JSON.
pub fn link_files(options: &LinkOptions, sink: &mut dyn MessageSink) -> Result<Output> {
    let sections = load_sections(&options.sections)?;

    let mut linker = Linker::new(options.config.clone())?;
    if let Some(path) = &options.localization {
        linker = linker.with_localizer(Localizer::load(path)?);
    }

    let output = linker.link(sections, sink)?;
    info!(
        "Linked {} section(s) into a {} with {} table(s)",
        output.sections.len(),
        output.output_type,
        output.tables.len()
    );

    if let Some(path) = &options.output {
        write_output(&output, path)?;
        info!("Wrote {}", path.display());
    }

    Ok(output)
}

/// Write an output as pretty JSON, creating parent directories.
pub fn write_output(output: &Output, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(output).context("failed to serialize output")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write output: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputType;
    use crate::test_support::{property, SectionFixture};
    use crate::util::CollectingSink;
    use tempfile::TempDir;

    fn write_json<T: serde::Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_single_and_list_files() {
        let tmp = TempDir::new().unwrap();
        let product = SectionFixture::product("prod").build();
        let fragments = vec![
            SectionFixture::fragment("a").build(),
            SectionFixture::fragment("b").build(),
        ];
        let one = write_json(tmp.path(), "prod.json", &product);
        let many = write_json(tmp.path(), "frags.json", &fragments);

        let sections = load_sections(&[one.clone(), many.clone()]).unwrap();

        let ids: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["prod", "a", "b"]);
        assert_eq!(sections[0].source_path.as_deref(), Some(one.as_path()));
        assert_eq!(sections[2].source_path.as_deref(), Some(many.as_path()));
    }

    #[test]
    fn test_load_reports_bad_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_sections(&[path]).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse section file"));
    }

    #[test]
    fn test_link_files_writes_output() {
        let tmp = TempDir::new().unwrap();
        let product = SectionFixture::product("prod")
            .row("Property", property("Title", "!(loc.Title)"))
            .build();
        let section = write_json(tmp.path(), "prod.json", &product);
        let loc = tmp.path().join("en-us.toml");
        std::fs::write(&loc, "[strings]\nTitle = \"Hello\"\n").unwrap();
        let out = tmp.path().join("out").join("product.json");

        let options = LinkOptions {
            sections: vec![section],
            output: Some(out.clone()),
            localization: Some(loc),
            config: LinkerConfig::default(),
        };
        let mut sink = CollectingSink::new();
        let output = link_files(&options, &mut sink).unwrap();

        assert_eq!(output.output_type, OutputType::Product);
        let written: Output =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let row = &written.table("Property").unwrap().rows[0];
        assert_eq!(row.str_at(1), Some("Hello"));
    }

    #[test]
    fn test_link_files_surfaces_link_failure() {
        let tmp = TempDir::new().unwrap();
        let fragment = write_json(
            tmp.path(),
            "frag.json",
            &SectionFixture::fragment("a").build(),
        );

        let options = LinkOptions {
            sections: vec![fragment],
            ..Default::default()
        };
        let mut sink = CollectingSink::new();
        let err = link_files(&options, &mut sink).unwrap_err();

        assert!(err.to_string().contains("1 error"));
        assert!(sink.contains(1));
    }
}
