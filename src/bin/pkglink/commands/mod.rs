//! Command implementations

pub mod actions;
pub mod explain;
pub mod link;

use std::path::Path;

use anyhow::Result;

use crate::cli::ConfigArgs;
use pkglink::util::ConfigFlags;
use pkglink::LinkerConfig;

const DEFAULT_CONFIG: &str = "pkglink.toml";

/// Load the linker configuration and apply command-line switches.
///
/// An explicit `--config` must exist; the default file is optional.
fn load_config(args: &ConfigArgs, extra: ConfigFlags) -> Result<LinkerConfig> {
    let mut config = match &args.config {
        Some(path) => LinkerConfig::load(path)?,
        None => LinkerConfig::load_or_default(Path::new(DEFAULT_CONFIG)),
    };

    let mut flags = args.flags();
    flags.suppress_admin = extra.suppress_admin;
    flags.suppress_advertise = extra.suppress_advertise;
    flags.suppress_ui = extra.suppress_ui;
    config.merge_flags(flags);

    Ok(config)
}
