//! Link messages and the sink they flow through.
//!
//! The linker never prints. Every error, warning and verbose note is built
//! as a [`Message`] and handed to a [`MessageSink`] owned by the caller.
//! [`Messages`] wraps the sink for one link and tracks whether an error has
//! been reported so the linker can stop at its checkpoints.

use std::fmt;
use std::path::PathBuf;

/// Severity level for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Verbose,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Verbose => write!(f, "verbose"),
        }
    }
}

/// Where a message originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Section id.
    pub section: String,
    /// Source file the section was compiled from.
    pub path: Option<PathBuf>,
    pub line: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}", path.display(), line),
            (Some(path), None) => write!(f, "{}", path.display()),
            (None, Some(line)) => write!(f, "section `{}`, line {}", self.section, line),
            (None, None) => write!(f, "section `{}`", self.section),
        }
    }
}

/// A diagnostic produced during a link.
#[derive(Debug, Clone)]
pub struct Message {
    /// Stable numeric id
    pub id: u32,
    /// Severity level
    pub severity: Severity,
    /// Primary message
    pub text: String,
    /// Diagnostic code, e.g. `pkglink::link::duplicate_symbol`
    pub code: Option<String>,
    /// Related location
    pub location: Option<SourceLocation>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Message {
    fn new(id: u32, severity: Severity, text: impl Into<String>) -> Self {
        Message {
            id,
            severity,
            text: text.into(),
            code: None,
            location: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new error message.
    pub fn error(id: u32, text: impl Into<String>) -> Self {
        Self::new(id, Severity::Error, text)
    }

    /// Create a new warning message.
    pub fn warning(id: u32, text: impl Into<String>) -> Self {
        Self::new(id, Severity::Warning, text)
    }

    /// Create a new verbose (informational) message.
    pub fn verbose(id: u32, text: impl Into<String>) -> Self {
        Self::new(id, Severity::Verbose, text)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_optional_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    /// Demote an error to a warning, keeping its id.
    pub fn as_warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    /// Format the message for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Verbose => "\x1b[1;36mverbose\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Verbose => "verbose",
            }
        };

        output.push_str(&format!(
            "{} PLK{:04}: {}\n",
            severity_str, self.id, self.text
        ));

        if let Some(ref location) = self.location {
            output.push_str(&format!("  --> {}\n", location));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            for suggestion in &self.suggestions {
                output.push_str(&format!("  {}: {}\n", help_prefix, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Receives every message produced by a link.
pub trait MessageSink {
    fn on_message(&mut self, message: &Message);
}

impl<F> MessageSink for F
where
    F: FnMut(&Message),
{
    fn on_message(&mut self, message: &Message) {
        self(message)
    }
}

/// Sink that keeps every message, for tests and for callers that render later.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub messages: Vec<Message>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
    }

    /// Ids of all messages at the given severity, in order.
    pub fn ids(&self, severity: Severity) -> Vec<u32> {
        self.messages
            .iter()
            .filter(|m| m.severity == severity)
            .map(|m| m.id)
            .collect()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }
}

impl MessageSink for CollectingSink {
    fn on_message(&mut self, message: &Message) {
        self.messages.push(message.clone());
    }
}

/// Sink that forwards messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink {
    pub color: bool,
}

impl MessageSink for TracingSink {
    fn on_message(&mut self, message: &Message) {
        let text = message.format(self.color);
        let text = text.trim_end();
        match message.severity {
            Severity::Error => tracing::error!("{}", text),
            Severity::Warning => tracing::warn!("{}", text),
            Severity::Verbose => tracing::debug!("{}", text),
        }
    }
}

/// Per-link message state: the sink plus the found-error flag.
pub struct Messages<'a> {
    sink: &'a mut dyn MessageSink,
    errors: usize,
    warnings: usize,
    warnings_as_errors: bool,
}

impl<'a> Messages<'a> {
    pub fn new(sink: &'a mut dyn MessageSink) -> Self {
        Messages {
            sink,
            errors: 0,
            warnings: 0,
            warnings_as_errors: false,
        }
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Send a message, promoting warnings when configured.
    pub fn emit(&mut self, message: Message) {
        let message = if self.warnings_as_errors && message.severity == Severity::Warning {
            Message {
                severity: Severity::Error,
                ..message
            }
        } else {
            message
        };

        match message.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Verbose => {}
        }

        self.sink.on_message(&message);
    }

    pub fn encountered_error(&self) -> bool {
        self.errors > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formatting() {
        let message = Message::error(12, "duplicate symbol `Property:A`")
            .with_location(SourceLocation {
                section: "frag1".to_string(),
                path: Some(PathBuf::from("src/props.wxs")),
                line: Some(7),
            })
            .with_context("also defined in section `frag2`")
            .with_suggestion("Remove one of the definitions");

        let output = message.format(false);
        assert!(output.starts_with("error PLK0012: duplicate symbol"));
        assert!(output.contains("--> src/props.wxs:7"));
        assert!(output.contains("= also defined in section `frag2`"));
        assert!(output.contains("help: Remove one of the definitions"));
    }

    #[test]
    fn test_messages_tracks_errors() {
        let mut sink = CollectingSink::new();
        {
            let mut messages = Messages::new(&mut sink);
            messages.emit(Message::warning(1001, "w"));
            assert!(!messages.encountered_error());
            messages.emit(Message::error(1, "e"));
            assert!(messages.encountered_error());
            assert_eq!(messages.error_count(), 1);
            assert_eq!(messages.warning_count(), 1);
        }
        assert_eq!(sink.ids(Severity::Warning), vec![1001]);
        assert_eq!(sink.ids(Severity::Error), vec![1]);
    }

    #[test]
    fn test_warnings_as_errors() {
        let mut sink = CollectingSink::new();
        {
            let mut messages = Messages::new(&mut sink).with_warnings_as_errors(true);
            messages.emit(Message::warning(1001, "w"));
            assert!(messages.encountered_error());
        }
        assert_eq!(sink.errors().count(), 1);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |m: &Message| seen.push(m.id);
            let mut messages = Messages::new(&mut sink);
            messages.emit(Message::verbose(9001, "v"));
        }
        assert_eq!(seen, vec![9001]);
    }
}
