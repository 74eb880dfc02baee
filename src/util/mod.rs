//! Shared utilities

pub mod config;
pub mod diagnostic;

pub use config::{ConfigFlags, LinkerConfig, Localizer, PedanticLevel, SequenceConfig};
pub use diagnostic::{
    CollectingSink, Message, MessageSink, Messages, Severity, SourceLocation, TracingSink,
};
