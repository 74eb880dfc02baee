//! `pkglink link` command

use anyhow::{Context, Result};

use crate::cli::LinkArgs;
use pkglink::ops::{link_files, LinkOptions};
use pkglink::util::{ConfigFlags, TracingSink};

pub fn execute(args: LinkArgs, color: bool) -> Result<()> {
    let config = super::load_config(
        &args.config,
        ConfigFlags {
            suppress_admin: args.suppress_admin,
            suppress_advertise: args.suppress_advertise,
            suppress_ui: args.suppress_ui,
            ..Default::default()
        },
    )?;

    let options = LinkOptions {
        sections: args.sections,
        output: args.output.clone(),
        localization: args.loc,
        config,
    };

    let mut sink = TracingSink { color };
    let output = link_files(&options, &mut sink)?;

    if args.output.is_none() {
        let json = serde_json::to_string_pretty(&output).context("failed to serialize output")?;
        println!("{}", json);
    }

    Ok(())
}
