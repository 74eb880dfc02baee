//! `pkglink actions` command

use anyhow::Result;

use crate::cli::ActionsArgs;
use pkglink::ops::list_actions;

pub fn execute(args: ActionsArgs) -> Result<()> {
    let listings = list_actions(args.sequence)?;

    let mut current = None;
    for listing in listings.iter().filter(|l| !args.required || l.required) {
        if current != Some(listing.sequence) {
            if current.is_some() {
                println!();
            }
            println!("{}:", listing.sequence);
            current = Some(listing.sequence);
        }

        let marker = if listing.required { "*" } else { " " };
        match &listing.condition {
            Some(condition) => println!(
                "  {}{:>6}  {}  [{}]",
                marker, listing.position, listing.id, condition
            ),
            None => println!("  {}{:>6}  {}", marker, listing.position, listing.id),
        }
    }

    Ok(())
}
