//! Action sequencing.
//!
//! Collects the actions each sequence needs (product skeleton, actions
//! triggered by linked tables, user declarations), applies suppressions and
//! resolves relative scheduling to absolute positions.
//!
//! Resolution walks `Before`/`After` anchors with an explicit stack and a
//! three-state mark per action, so long anchor chains cannot overflow and a
//! cycle is detected the first time an in-progress action is revisited.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::action::is_terminal_position;
use crate::core::output::SuppressedSequences;
use crate::core::{
    Action, ActionKey, OutputType, Scheduling, SequenceType, SequencedAction, Value,
};
use crate::linker::errors::{LinkError, LinkFailure, LinkWarning};
use crate::linker::standard_actions::StandardActions;
use crate::linker::symbols::{SectionIndex, SymbolKind};
use crate::linker::table_policy;
use crate::linker::{location, LinkState};
use crate::util::{LinkerConfig, Message, Messages};

/// Resolved sequence tables plus module suppression markers.
#[derive(Debug, Default)]
pub struct Sequencing {
    pub sequences: BTreeMap<SequenceType, Vec<SequencedAction>>,
    /// `SuppressAction` rows, module outputs only.
    pub suppress_rows: Vec<Vec<Value>>,
}

/// An action on its way into a sequence table.
#[derive(Debug, Clone)]
struct WorkingAction {
    action: Action,
    /// Declaring section; `None` for catalog actions.
    section: Option<SectionIndex>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Resolved(i32),
    Failed,
}

struct Sequencer<'s, 'm, 'a> {
    state: &'s LinkState,
    catalog: &'static StandardActions,
    suppressed: SuppressedSequences,
    messages: &'m mut Messages<'a>,
    working: BTreeMap<ActionKey, WorkingAction>,
}

/// Build the sequence tables for the current link.
pub fn sequence_actions(
    state: &LinkState,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) -> Result<Sequencing, LinkFailure> {
    if state.output_type == OutputType::PatchCreation {
        return Ok(Sequencing::default());
    }

    let mut sequencer = Sequencer {
        state,
        catalog: StandardActions::get()?,
        suppressed: SuppressedSequences {
            admin: config.sequences.suppress_admin,
            advertise: config.sequences.suppress_advertise,
            ui: config.sequences.suppress_ui,
        },
        messages,
        working: BTreeMap::new(),
    };

    sequencer.add_skeleton()?;
    sequencer.add_triggered()?;
    sequencer.add_declarations();
    let suppress_rows = sequencer.apply_suppressions();

    let Some(positions) = sequencer.resolve()? else {
        return Ok(Sequencing {
            sequences: BTreeMap::new(),
            suppress_rows,
        });
    };

    let sequences = sequencer.build_tables(&positions);

    tracing::debug!(
        "sequenced {} actions in {} tables",
        positions.len(),
        sequences.len()
    );

    Ok(Sequencing {
        sequences,
        suppress_rows,
    })
}

impl Sequencer<'_, '_, '_> {
    fn is_active(&self, sequence: SequenceType) -> bool {
        !self.suppressed.contains(sequence)
    }

    fn require_standard(&mut self, key: ActionKey) -> Result<(), LinkFailure> {
        if !self.is_active(key.sequence) || self.working.contains_key(&key) {
            return Ok(());
        }
        let action = self.catalog.action(&key).ok_or_else(|| {
            LinkFailure::Internal(format!("`{}` is not a standard action", key))
        })?;
        self.working.insert(
            key,
            WorkingAction {
                action: action.clone(),
                section: None,
            },
        );
        Ok(())
    }

    fn add_skeleton(&mut self) -> Result<(), LinkFailure> {
        if self.state.output_type != OutputType::Product {
            return Ok(());
        }
        for sequence in SequenceType::ALL {
            for key in self.catalog.skeleton(sequence) {
                self.require_standard(key)?;
            }
        }
        Ok(())
    }

    fn add_triggered(&mut self) -> Result<(), LinkFailure> {
        let mut required = BTreeSet::new();

        for (_, section) in self.state.live_sections() {
            for table in &section.tables {
                if table.rows.is_empty() {
                    continue;
                }
                if let Some(policy) = table_policy::policy(&table.name) {
                    policy.apply(&mut required);
                }
            }
        }

        for key in required {
            self.require_standard(key)?;
        }
        Ok(())
    }

    fn add_declarations(&mut self) {
        let mut declarations = Vec::new();
        for (index, section) in self.state.live_sections() {
            for (i, action) in section.actions.iter().enumerate() {
                let kind = SymbolKind::Action { section: index, index: i };
                if self.state.dropped.contains(&kind) || !self.is_active(action.sequence) {
                    continue;
                }
                declarations.push((index, action.clone()));
            }
        }

        for (index, mut action) in declarations {
            let key = action.key();

            match self.catalog.action(&key) {
                Some(standard) => {
                    if action.condition.is_none() {
                        action.condition = standard.condition.clone();
                    }
                    if action.scheduling == Scheduling::Unscheduled {
                        action.scheduling = standard.scheduling.clone();
                    }
                }
                None if action.scheduling == Scheduling::Unscheduled => {
                    self.emit(
                        LinkError::UnscheduledAction { action: key }.to_message(),
                        Some(index),
                        action.line,
                    );
                    continue;
                }
                None => {}
            }

            self.working.insert(
                key,
                WorkingAction {
                    action,
                    section: Some(index),
                },
            );
        }
    }

    /// Remove suppressed actions; returns the module marker rows.
    fn apply_suppressions(&mut self) -> Vec<Vec<Value>> {
        let mut suppressions = Vec::new();
        for (index, section) in self.state.live_sections() {
            for key in &section.suppressed_actions {
                suppressions.push((index, key.clone()));
            }
        }

        let mut rows = Vec::new();
        let mut seen = BTreeSet::new();

        for (index, key) in suppressions {
            if !self.is_active(key.sequence) || !seen.insert(key.clone()) {
                continue;
            }

            let message = match self.working.remove(&key) {
                Some(_) => LinkWarning::SuppressedRequiredAction { action: key.clone() },
                None => LinkWarning::SuppressedActionNotScheduled { action: key.clone() },
            };
            self.emit(message.to_message(), Some(index), None);

            if self.state.output_type == OutputType::Module {
                rows.push(vec![
                    Value::from(key.sequence.table_name()),
                    Value::from(key.id.as_str()),
                ]);
            }
        }

        rows
    }

    /// Resolve every working action to an absolute position.
    ///
    /// Returns `None` when a scheduling cycle makes the tables meaningless.
    fn resolve(&mut self) -> Result<Option<HashMap<ActionKey, i32>>, LinkFailure> {
        let mut marks: HashMap<ActionKey, Mark> = HashMap::new();
        let roots: Vec<ActionKey> = self.working.keys().cloned().collect();

        for root in roots {
            let mut stack = vec![root];

            while let Some(key) = stack.last().cloned() {
                if matches!(marks.get(&key), Some(Mark::Resolved(_) | Mark::Failed)) {
                    stack.pop();
                    continue;
                }

                let working = self.working.get(&key).cloned().ok_or_else(|| {
                    LinkFailure::Internal(format!("action `{}` vanished while sequencing", key))
                })?;

                let (anchor, after) = match &working.action.scheduling {
                    Scheduling::Absolute(position) => {
                        marks.insert(key, Mark::Resolved(*position));
                        stack.pop();
                        continue;
                    }
                    Scheduling::Before(anchor) => (anchor.clone(), false),
                    Scheduling::After(anchor) => (anchor.clone(), true),
                    Scheduling::Unscheduled => {
                        return Err(LinkFailure::Internal(format!(
                            "action `{}` reached sequencing without a position",
                            key
                        )));
                    }
                };

                let parent = ActionKey::new(key.sequence, anchor.clone());
                if !self.working.contains_key(&parent) && !self.pull_in_anchor(&parent) {
                    self.emit(
                        LinkError::UnknownAnchorAction {
                            action: key.clone(),
                            parent: anchor,
                        }
                        .to_message(),
                        working.section,
                        working.action.line,
                    );
                    marks.insert(key, Mark::Failed);
                    stack.pop();
                    continue;
                }

                match marks.get(&parent).copied() {
                    Some(Mark::Resolved(position)) if position < 0 => {
                        self.emit(
                            LinkError::ActionScheduledRelativeToTerminal {
                                action: key.clone(),
                                parent: anchor,
                                position,
                            }
                            .to_message(),
                            working.section,
                            working.action.line,
                        );
                        marks.insert(key, Mark::Failed);
                        stack.pop();
                    }
                    Some(Mark::Resolved(position)) => {
                        let computed = if after {
                            position.checked_add(1)
                        } else {
                            position.checked_sub(1)
                        };
                        match computed.filter(|p| !is_terminal_position(*p)) {
                            Some(computed) => {
                                marks.insert(key, Mark::Resolved(computed));
                            }
                            None => {
                                self.emit(
                                    LinkError::ActionPositionOutOfRange {
                                        action: key.clone(),
                                        parent: anchor,
                                        position,
                                    }
                                    .to_message(),
                                    working.section,
                                    working.action.line,
                                );
                                marks.insert(key, Mark::Failed);
                            }
                        }
                        stack.pop();
                    }
                    Some(Mark::Failed) => {
                        marks.insert(key, Mark::Failed);
                        stack.pop();
                    }
                    Some(Mark::InProgress) => {
                        self.emit(
                            LinkError::RecursiveAction { action: parent }.to_message(),
                            working.section,
                            working.action.line,
                        );
                        return Ok(None);
                    }
                    None => {
                        marks.insert(key, Mark::InProgress);
                        stack.push(parent);
                    }
                }
            }
        }

        Ok(Some(
            marks
                .into_iter()
                .filter_map(|(key, mark)| match mark {
                    Mark::Resolved(position) => Some((key, position)),
                    _ => None,
                })
                .collect(),
        ))
    }

    /// Schedule the standard action an anchor names, if there is one.
    fn pull_in_anchor(&mut self, parent: &ActionKey) -> bool {
        let Some(action) = self.catalog.action(parent) else {
            return false;
        };
        if self.is_suppressed_by_section(parent) {
            return false;
        }
        tracing::trace!("anchor pulls in standard action {}", parent);
        self.working.insert(
            parent.clone(),
            WorkingAction {
                action: action.clone(),
                section: None,
            },
        );
        true
    }

    fn is_suppressed_by_section(&self, key: &ActionKey) -> bool {
        self.state
            .live_sections()
            .any(|(_, section)| section.suppressed_actions.contains(key))
    }

    fn build_tables(
        &self,
        positions: &HashMap<ActionKey, i32>,
    ) -> BTreeMap<SequenceType, Vec<SequencedAction>> {
        let module = self.state.output_type == OutputType::Module;
        let mut tables: BTreeMap<SequenceType, Vec<(i32, SequencedAction)>> = BTreeMap::new();

        for (key, working) in &self.working {
            let Some(&position) = positions.get(key) else {
                continue;
            };

            let mut row = SequencedAction {
                id: key.id.clone(),
                condition: working.action.condition.clone(),
                sequence: Some(position),
                base_action: None,
                after: None,
            };

            if module && !is_terminal_position(position) {
                if let Some(anchor) = working.action.scheduling.anchor() {
                    row.sequence = None;
                    row.base_action = Some(anchor.to_string());
                    row.after = Some(matches!(working.action.scheduling, Scheduling::After(_)));
                }
            }

            tables.entry(key.sequence).or_default().push((position, row));
        }

        tables
            .into_iter()
            .map(|(sequence, mut rows)| {
                rows.sort_by(|(a, ra), (b, rb)| a.cmp(b).then_with(|| ra.id.cmp(&rb.id)));
                (sequence, rows.into_iter().map(|(_, row)| row).collect())
            })
            .collect()
    }

    fn emit(&mut self, message: Message, section: Option<SectionIndex>, line: Option<u32>) {
        let at = section.map(|index| location(&self.state.sections[index.0], line));
        self.messages.emit(message.with_optional_location(at));
    }
}
