//! Link error, warning and verbose note types.
//!
//! Errors and warnings are reported through the message sink rather than
//! returned; each variant carries a stable numeric id and a miette code so
//! callers can filter or render them. Only [`LinkFailure`] is returned from
//! a link.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::{ActionKey, OutputType};
use crate::util::diagnostic::Message;

/// Fatal link errors.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum LinkError {
    #[error("no product, module or patch creation section was found")]
    #[diagnostic(
        code(pkglink::link::missing_entry_section),
        help("Include the section compiled from the Product or Module element")
    )]
    MissingEntrySection,

    #[error("multiple entry sections found: `{first}` and `{second}`")]
    #[diagnostic(
        code(pkglink::link::multiple_entry_sections),
        help("Link exactly one product, module or patch creation section")
    )]
    MultipleEntrySections { first: String, second: String },

    #[error("unresolved reference to symbol `{name}` in section `{section}`")]
    #[diagnostic(
        code(pkglink::link::unresolved_reference),
        help("Add the section that defines `{name}` to the link")
    )]
    UnresolvedReference { name: String, section: String },

    #[error("duplicate symbol `{name}`")]
    #[diagnostic(
        code(pkglink::link::duplicate_symbol),
        help("Remove all but one definition, or allow identical rows if they match")
    )]
    DuplicateSymbol { name: String, sections: Vec<String> },

    #[error(
        "{child_type} `{child}` has multiple primary references: `{existing}` and `{parent}` ({parent_type})"
    )]
    #[diagnostic(
        code(pkglink::link::multiple_primary_references),
        help("Mark only one of the parents as primary")
    )]
    MultiplePrimaryReferences {
        child_type: String,
        child: String,
        parent_type: String,
        parent: String,
        existing: String,
    },

    #[error("component `{component}` is referenced by two modules: `{first}` and `{second}`")]
    #[diagnostic(code(pkglink::link::component_referenced_twice))]
    ComponentReferencedTwice {
        component: String,
        first: String,
        second: String,
    },

    #[error("a {parent_type} cannot contain a {child_type} (`{parent}` -> `{child}`)")]
    #[diagnostic(code(pkglink::link::invalid_complex_reference))]
    InvalidComplexReference {
        parent_type: String,
        parent: String,
        child_type: String,
        child: String,
    },

    #[error("component `{component}` has no feature, required by `{target}`")]
    #[diagnostic(
        code(pkglink::link::missing_feature),
        help("Reference component `{component}` from a feature")
    )]
    MissingFeature { component: String, target: String },

    #[error("action `{action}` is scheduled recursively")]
    #[diagnostic(
        code(pkglink::link::recursive_action),
        help("Break the before/after cycle involving `{action}`")
    )]
    RecursiveAction { action: ActionKey },

    #[error(
        "action `{action}` is scheduled relative to `{parent}`, which runs on exit (sequence {position})"
    )]
    #[diagnostic(code(pkglink::link::relative_to_terminal_action))]
    ActionScheduledRelativeToTerminal {
        action: ActionKey,
        parent: String,
        position: i32,
    },

    #[error(
        "action `{action}` is scheduled relative to `{parent}` (sequence {position}), which leaves no valid position"
    )]
    #[diagnostic(
        code(pkglink::link::action_position_out_of_range),
        help("Give `{parent}` or `{action}` an explicit sequence number")
    )]
    ActionPositionOutOfRange {
        action: ActionKey,
        parent: String,
        position: i32,
    },

    #[error("action `{action}` is scheduled relative to unknown action `{parent}`")]
    #[diagnostic(code(pkglink::link::unknown_anchor_action))]
    UnknownAnchorAction { action: ActionKey, parent: String },

    #[error("custom action `{action}` has no sequence, before or after")]
    #[diagnostic(code(pkglink::link::unscheduled_action))]
    UnscheduledAction { action: ActionKey },

    #[error("malformed row in table `{table}` of section `{section}`: {reason}")]
    #[diagnostic(code(pkglink::link::malformed_row))]
    MalformedRow {
        table: String,
        section: String,
        reason: String,
    },

    #[error("section `{section}` contains table `{table}` which has no definition")]
    #[diagnostic(
        code(pkglink::link::unknown_table),
        help("Declare a custom table definition for `{table}`")
    )]
    UnknownTable { table: String, section: String },

    #[error("section `{section}` declares an invalid table definition: {reason}")]
    #[diagnostic(code(pkglink::link::malformed_table_definition))]
    MalformedTableDefinition { section: String, reason: String },

    #[error("localization string `{id}` used in table `{table}` is not defined")]
    #[diagnostic(code(pkglink::link::unresolved_localization))]
    UnresolvedLocalization { id: String, table: String },
}

impl LinkError {
    /// Stable numeric id.
    pub fn id(&self) -> u32 {
        match self {
            LinkError::MissingEntrySection => 1,
            LinkError::MultipleEntrySections { .. } => 2,
            LinkError::UnresolvedReference { .. } => 3,
            LinkError::DuplicateSymbol { .. } => 4,
            LinkError::MultiplePrimaryReferences { .. } => 5,
            LinkError::ComponentReferencedTwice { .. } => 6,
            LinkError::InvalidComplexReference { .. } => 7,
            LinkError::MissingFeature { .. } => 8,
            LinkError::RecursiveAction { .. } => 9,
            LinkError::ActionScheduledRelativeToTerminal { .. } => 10,
            LinkError::UnknownAnchorAction { .. } => 11,
            LinkError::UnscheduledAction { .. } => 12,
            LinkError::MalformedRow { .. } => 13,
            LinkError::UnknownTable { .. } => 14,
            LinkError::MalformedTableDefinition { .. } => 15,
            LinkError::UnresolvedLocalization { .. } => 16,
            LinkError::ActionPositionOutOfRange { .. } => 17,
        }
    }

    /// Convert to a message for the sink.
    pub fn to_message(&self) -> Message {
        let mut message = to_message(Message::error(self.id(), self.to_string()), self);

        if let LinkError::DuplicateSymbol { sections, .. } = self {
            for section in sections {
                message = message.with_context(format!("defined in section `{}`", section));
            }
        }

        message
    }
}

/// Non-fatal link warnings.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum LinkWarning {
    #[error("identical duplicate of symbol `{name}` in section `{section}` was dropped")]
    #[diagnostic(code(pkglink::link::identical_rows))]
    IdenticalRows { name: String, section: String },

    #[error("component `{component}` is not referenced by any feature")]
    #[diagnostic(
        code(pkglink::link::orphaned_component),
        help("Reference `{component}` from a feature or component group")
    )]
    OrphanedComponent { component: String },

    #[error(
        "component `{component}` has no explicit primary feature; `{feature}` was chosen among {candidates} features"
    )]
    #[diagnostic(code(pkglink::link::implicit_primary_feature))]
    ImplicitPrimaryFeature {
        component: String,
        feature: String,
        candidates: usize,
    },

    #[error("suppressed action `{action}` is not scheduled")]
    #[diagnostic(code(pkglink::link::suppressed_action_not_scheduled))]
    SuppressedActionNotScheduled { action: ActionKey },

    #[error("suppressing required action `{action}`")]
    #[diagnostic(code(pkglink::link::suppressed_required_action))]
    SuppressedRequiredAction { action: ActionKey },

    #[error("table `{table}` is not allowed in a {output_type} and its row was ignored")]
    #[diagnostic(code(pkglink::link::illegal_row_for_output))]
    IllegalRowForOutput {
        table: String,
        output_type: OutputType,
    },
}

impl LinkWarning {
    /// Stable numeric id.
    pub fn id(&self) -> u32 {
        match self {
            LinkWarning::IdenticalRows { .. } => 1001,
            LinkWarning::OrphanedComponent { .. } => 1002,
            LinkWarning::ImplicitPrimaryFeature { .. } => 1003,
            LinkWarning::SuppressedActionNotScheduled { .. } => 1004,
            LinkWarning::SuppressedRequiredAction { .. } => 1005,
            LinkWarning::IllegalRowForOutput { .. } => 1006,
        }
    }

    /// Convert to a message for the sink.
    pub fn to_message(&self) -> Message {
        to_message(Message::warning(self.id(), self.to_string()), self)
    }
}

/// Informational notes on link progress.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkVerbose {
    #[error("{live} of {total} sections are linked from entry section `{entry}`")]
    LiveSections {
        live: usize,
        total: usize,
        entry: String,
    },

    #[error("{features} components connected to features, {modules} to modules")]
    StructureResolved { features: usize, modules: usize },

    #[error("{actions} actions scheduled in {tables} sequence tables")]
    ActionsSequenced { actions: usize, tables: usize },

    #[error("assembled {rows} rows in {tables} tables")]
    OutputAssembled { tables: usize, rows: usize },
}

impl LinkVerbose {
    /// Stable numeric id.
    pub fn id(&self) -> u32 {
        match self {
            LinkVerbose::LiveSections { .. } => 2001,
            LinkVerbose::StructureResolved { .. } => 2002,
            LinkVerbose::ActionsSequenced { .. } => 2003,
            LinkVerbose::OutputAssembled { .. } => 2004,
        }
    }

    pub fn to_message(&self) -> Message {
        Message::verbose(self.id(), self.to_string())
    }
}

fn to_message(mut message: Message, diagnostic: &dyn Diagnostic) -> Message {
    if let Some(code) = diagnostic.code() {
        message = message.with_code(code.to_string());
    }
    if let Some(help) = diagnostic.help() {
        message = message.with_suggestion(help.to_string());
    }
    message
}

/// Why a link produced no output.
#[derive(Debug, Error)]
pub enum LinkFailure {
    /// User-facing errors were reported through the message sink.
    #[error("link failed with {count} error(s)")]
    Errors { count: usize },

    /// A logic violation inside the linker or its fixed catalogs.
    #[error("internal linker error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SequenceType;
    use crate::util::Severity;

    #[test]
    fn test_error_message_has_code_and_help() {
        let err = LinkError::UnresolvedReference {
            name: "Property:A".to_string(),
            section: "main".to_string(),
        };

        let message = err.to_message();
        assert_eq!(message.id, 3);
        assert_eq!(message.severity, Severity::Error);
        assert_eq!(
            message.code.as_deref(),
            Some("pkglink::link::unresolved_reference")
        );
        assert!(message.suggestions[0].contains("Property:A"));
    }

    #[test]
    fn test_duplicate_symbol_lists_sections() {
        let err = LinkError::DuplicateSymbol {
            name: "Property:A".to_string(),
            sections: vec!["frag1".to_string(), "frag2".to_string()],
        };

        let output = err.to_message().format(false);
        assert!(output.contains("duplicate symbol `Property:A`"));
        assert!(output.contains("defined in section `frag1`"));
        assert!(output.contains("defined in section `frag2`"));
    }

    #[test]
    fn test_warning_ids() {
        let warning = LinkWarning::SuppressedActionNotScheduled {
            action: ActionKey::new(SequenceType::InstallExecute, "BindImage"),
        };
        let message = warning.to_message();
        assert_eq!(message.id, 1004);
        assert_eq!(message.severity, Severity::Warning);
        assert!(message.text.contains("InstallExecuteSequence/BindImage"));
    }
}
