//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pkglink::util::{ConfigFlags, PedanticLevel};
use pkglink::SequenceType;

/// pkglink - Link compiled installer sections into a package database
#[derive(Parser)]
#[command(name = "pkglink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Link section files into one output
    Link(LinkArgs),

    /// Explain why a section is part of the link
    Explain(ExplainArgs),

    /// List the standard actions and their default positions
    Actions(ActionsArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Linker configuration file (defaults to ./pkglink.toml if present)
    #[arg(long, env = "PKGLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep one copy of identical duplicate rows
    #[arg(long)]
    pub allow_identical_rows: bool,

    /// Report unresolved references as warnings
    #[arg(long)]
    pub allow_unresolved_references: bool,

    /// Optional warning level: easy, heroic or legendary
    #[arg(long)]
    pub pedantic: Option<PedanticLevel>,

    /// Tag output rows with their source section id
    #[arg(long)]
    pub tag_section_id: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub warnings_as_errors: bool,
}

impl ConfigArgs {
    pub fn flags(&self) -> ConfigFlags {
        ConfigFlags {
            allow_identical_rows: self.allow_identical_rows,
            allow_unresolved_references: self.allow_unresolved_references,
            pedantic: self.pedantic,
            tag_section_id: self.tag_section_id,
            warnings_as_errors: self.warnings_as_errors,
            ..Default::default()
        }
    }
}

#[derive(Args)]
pub struct LinkArgs {
    /// Section files (JSON), in link order
    #[arg(required = true)]
    pub sections: Vec<PathBuf>,

    /// Output file (prints to stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Localization file with a [strings] table
    #[arg(long)]
    pub loc: Option<PathBuf>,

    /// Leave out the AdminExecute and AdminUI sequence tables
    #[arg(long)]
    pub suppress_admin: bool,

    /// Leave out the AdvtExecuteSequence table
    #[arg(long)]
    pub suppress_advertise: bool,

    /// Leave out the AdminUI and InstallUI sequence tables
    #[arg(long)]
    pub suppress_ui: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Section files (JSON)
    #[arg(required = true)]
    pub sections: Vec<PathBuf>,

    /// Id of the section to explain
    #[arg(short, long)]
    pub section: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct ActionsArgs {
    /// Only list one sequence (e.g. install-execute)
    #[arg(long)]
    pub sequence: Option<SequenceType>,

    /// Only list actions every product schedules
    #[arg(long)]
    pub required: bool,
}
