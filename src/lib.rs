//! pkglink - the link phase of an installer package toolset
//!
//! This crate takes compiled sections (tables of rows plus references
//! between them), resolves symbols, wires components to features and
//! modules, schedules install actions and assembles a single output
//! database ready for serialization.

pub mod core;
pub mod linker;
pub mod ops;
pub mod util;

/// Test utilities for pkglink unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides section fixture builders and a helper that
/// links against a collecting message sink.
#[cfg(test)]
pub mod test_support;

pub use core::{Output, OutputType, Section, SectionType, SequenceType};
pub use linker::{Explanation, LinkFailure, Linker};
pub use util::{LinkerConfig, Localizer, Message, MessageSink};
