//! `pkglink explain` command

use anyhow::Result;

use crate::cli::ExplainArgs;
use pkglink::ops::{explain_section, SectionReason};
use pkglink::util::{ConfigFlags, TracingSink};

pub fn execute(args: ExplainArgs, color: bool) -> Result<()> {
    let config = super::load_config(&args.config, ConfigFlags::default())?;

    let mut sink = TracingSink { color };
    let report = explain_section(&args.sections, &args.section, &config, &mut sink)?;

    println!("{}", report.section);

    match report.reason {
        SectionReason::Entry => println!("└─ entry section"),
        SectionReason::Referenced(steps) => {
            // Print the chain from the section back to the entry section
            let mut referrers: Vec<&str> = vec![report.entry.as_str()];
            referrers.extend(steps.iter().map(|(section, _)| section.as_str()));

            for (depth, (i, (_, symbol))) in steps.iter().enumerate().rev().enumerate() {
                let indent = "     ".repeat(depth);
                let referrer = referrers[i];
                let suffix = if i == 0 { " (entry)" } else { "" };
                println!("{}└─ {} referenced by: {}{}", indent, symbol, referrer, suffix);
            }
        }
        SectionReason::Unreferenced => {
            println!("└─ not referenced from entry section {}", report.entry);
        }
    }

    Ok(())
}
