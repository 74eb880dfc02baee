//! High-level operations.
//!
//! File I/O around the linker: loading section files, writing outputs and
//! the reports behind the `pkglink` commands.

pub mod actions;
pub mod explain;
pub mod link;

pub use actions::{list_actions, ActionListing};
pub use explain::{explain_section, ExplainReport, SectionReason};
pub use link::{link_files, load_sections, write_output, LinkOptions};
