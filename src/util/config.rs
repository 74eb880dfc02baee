//! Linker configuration.
//!
//! Options can come from a TOML file (`pkglink.toml`) and from command-line
//! flags. Flags only ever switch options on, so they are merged on top of
//! whatever the file says.
//!
//! ```toml
//! allow_identical_rows = true
//! pedantic = "legendary"
//!
//! [sequences]
//! suppress_admin = true
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How many optional warnings to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedanticLevel {
    #[default]
    Easy,
    Heroic,
    Legendary,
}

impl std::str::FromStr for PedanticLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(PedanticLevel::Easy),
            "heroic" => Ok(PedanticLevel::Heroic),
            "legendary" => Ok(PedanticLevel::Legendary),
            _ => Err(format!(
                "invalid pedantic level '{}'; expected 'easy', 'heroic', or 'legendary'",
                s
            )),
        }
    }
}

/// Options for one link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Keep one copy of structurally identical duplicate rows instead of failing
    pub allow_identical_rows: bool,

    /// Report unresolved references as warnings
    pub allow_unresolved_references: bool,

    /// Optional warning level
    pub pedantic: PedanticLevel,

    /// Tag each output row with the id of the section it came from
    pub tag_section_id: bool,

    /// Treat every warning as an error
    pub warnings_as_errors: bool,

    /// Sequence table suppression
    pub sequences: SequenceConfig,
}

/// Sequence tables to leave out of the output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub suppress_admin: bool,
    pub suppress_advertise: bool,
    pub suppress_ui: bool,
}

/// Command-line switches that override the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigFlags {
    pub allow_identical_rows: bool,
    pub allow_unresolved_references: bool,
    pub pedantic: Option<PedanticLevel>,
    pub tag_section_id: bool,
    pub warnings_as_errors: bool,
    pub suppress_admin: bool,
    pub suppress_advertise: bool,
    pub suppress_ui: bool,
}

impl LinkerConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read linker config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse linker config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to load linker config from {}: {:#}",
                    path.display(),
                    e
                );
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Apply command-line switches (switches take precedence).
    pub fn merge_flags(&mut self, flags: ConfigFlags) {
        self.allow_identical_rows |= flags.allow_identical_rows;
        self.allow_unresolved_references |= flags.allow_unresolved_references;
        self.tag_section_id |= flags.tag_section_id;
        self.warnings_as_errors |= flags.warnings_as_errors;
        self.sequences.suppress_admin |= flags.suppress_admin;
        self.sequences.suppress_advertise |= flags.suppress_advertise;
        self.sequences.suppress_ui |= flags.suppress_ui;
        if let Some(pedantic) = flags.pedantic {
            self.pedantic = pedantic;
        }
    }

    /// Whether optional warnings at `level` are enabled.
    pub fn is_pedantic(&self, level: PedanticLevel) -> bool {
        self.pedantic >= level
    }
}

/// String table for localizable columns.
///
/// Values of the form `!(loc.Id)` in localizable columns are replaced by the
/// string registered for `Id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Localizer {
    #[serde(default)]
    strings: HashMap<String, String>,
}

impl Localizer {
    pub fn new() -> Self {
        Localizer::default()
    }

    /// Load a localization file with a `[strings]` table.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read localization file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse localization file: {}", path.display()))
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(id.into(), value.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.strings.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// The string id of a `!(loc.Id)` placeholder.
pub fn localization_id(value: &str) -> Option<&str> {
    value
        .strip_prefix("!(loc.")
        .and_then(|rest| rest.strip_suffix(')'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pkglink.toml");
        std::fs::write(
            &path,
            r#"
allow_identical_rows = true
pedantic = "legendary"

[sequences]
suppress_ui = true
"#,
        )
        .unwrap();

        let config = LinkerConfig::load(&path).unwrap();
        assert!(config.allow_identical_rows);
        assert!(!config.allow_unresolved_references);
        assert_eq!(config.pedantic, PedanticLevel::Legendary);
        assert!(config.sequences.suppress_ui);
        assert!(!config.sequences.suppress_admin);
    }

    #[test]
    fn test_missing_config_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = LinkerConfig::load_or_default(&tmp.path().join("absent.toml"));
        assert_eq!(config.pedantic, PedanticLevel::Easy);
        assert!(!config.tag_section_id);
    }

    #[test]
    fn test_merge_flags() {
        let mut config = LinkerConfig {
            pedantic: PedanticLevel::Heroic,
            ..Default::default()
        };
        config.merge_flags(ConfigFlags {
            tag_section_id: true,
            suppress_admin: true,
            ..Default::default()
        });
        assert!(config.tag_section_id);
        assert!(config.sequences.suppress_admin);
        assert_eq!(config.pedantic, PedanticLevel::Heroic);
        assert!(config.is_pedantic(PedanticLevel::Heroic));
        assert!(!config.is_pedantic(PedanticLevel::Legendary));
    }

    #[test]
    fn test_localization_id() {
        assert_eq!(localization_id("!(loc.ProductName)"), Some("ProductName"));
        assert_eq!(localization_id("ProductName"), None);
    }

    #[test]
    fn test_load_localizer() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("en-us.toml");
        std::fs::write(&path, "[strings]\nProductName = \"Example\"\n").unwrap();

        let localizer = Localizer::load(&path).unwrap();
        assert_eq!(localizer.get("ProductName"), Some("Example"));
        assert_eq!(localizer.len(), 1);
    }
}
