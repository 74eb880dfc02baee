//! Test utilities for pkglink unit tests.
//!
//! Section fixtures stand in for the front end, and `link_with` runs a whole
//! link against a collecting sink.
//!
//! # Example
//!
//! ```rust,ignore
//! use pkglink::test_support::{link_with, property, SectionFixture};
//!
//! #[test]
//! fn test_example() {
//!     let sections = vec![SectionFixture::product("prod")
//!         .row("Property", property("A", "1"))
//!         .build()];
//!
//!     let (result, sink) = link_with(LinkerConfig::default(), sections);
//!     let output = assertions::assert_linked(result, &sink);
//! }
//! ```

pub mod fixtures;

use crate::core::{Output, Section};
use crate::linker::{LinkFailure, Linker};
use crate::util::{CollectingSink, LinkerConfig};

pub use fixtures::*;

/// Link `sections` and keep every message.
pub fn link_with(
    config: LinkerConfig,
    sections: Vec<Section>,
) -> (Result<Output, LinkFailure>, CollectingSink) {
    let mut sink = CollectingSink::new();
    let result = Linker::new(config).and_then(|linker| linker.link(sections, &mut sink));
    (result, sink)
}

/// Assertion helpers for testing.
pub mod assertions {
    use super::*;

    /// Assert that a link succeeded, printing its messages otherwise.
    pub fn assert_linked(result: Result<Output, LinkFailure>, sink: &CollectingSink) -> Output {
        match result {
            Ok(output) => output,
            Err(e) => {
                let messages: Vec<String> = sink.messages.iter().map(|m| m.format(false)).collect();
                panic!("expected link to succeed, got {}:\n{}", e, messages.join("\n"));
            }
        }
    }

    /// Assert that a link failed with exactly the given error ids.
    pub fn assert_link_errors(
        result: Result<Output, LinkFailure>,
        sink: &CollectingSink,
        ids: &[u32],
    ) {
        match result {
            Ok(_) => panic!("expected link to fail with {:?}", ids),
            Err(LinkFailure::Errors { count }) => {
                assert_eq!(sink.ids(crate::util::Severity::Error), ids);
                assert_eq!(count, ids.len());
            }
            Err(e) => panic!("expected reported errors, got {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::*;
    use super::*;

    #[test]
    fn test_link_with_collects_messages() {
        let sections = vec![SectionFixture::product("prod")
            .row("Property", property("A", "1"))
            .reference("Property", "Missing")
            .build()];

        let (result, sink) = link_with(LinkerConfig::default(), sections);
        assert_link_errors(result, &sink, &[3]);
    }

    #[test]
    fn test_fixture_rows_match_schema() {
        let definitions = crate::core::TableDefinitions::standard().unwrap();
        let rows = [
            ("Property", property("A", "1")),
            ("Component", component("C", "INSTALLDIR")),
            ("Feature", feature("F")),
            ("File", file("f", "C")),
        ];
        for (table, values) in rows {
            let row = crate::core::Row::new(values);
            definitions.get(table).unwrap().check_row(&row).unwrap();
        }
    }

    #[test]
    #[should_panic(expected = "expected link to succeed")]
    fn test_assert_linked_reports_failure() {
        let (result, sink) = link_with(LinkerConfig::default(), Vec::new());
        assert_linked(result, &sink);
    }
}
