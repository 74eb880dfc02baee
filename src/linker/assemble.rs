//! Output assembly.
//!
//! Folds the rows of live sections into the output tables, then appends the
//! rows the linker generated itself and derives the package-level scalars.

use crate::core::output::{Output, SuppressedSequences};
use crate::core::{OutputRow, OutputType, Row, SequencedAction, TableDefinition, Value};
use crate::linker::errors::{LinkError, LinkFailure, LinkWarning};
use crate::linker::sequencer::Sequencing;
use crate::linker::structural::StructuralResolution;
use crate::linker::symbols::{RowAddress, SymbolKind};
use crate::linker::table_policy;
use crate::linker::{location, LinkState};
use crate::util::config::localization_id;
use crate::util::{LinkerConfig, Localizer, Message, Messages};

/// `_SummaryInformation` property holding the word count flags.
const PID_WORD_COUNT: i32 = 15;
const WORD_COUNT_SHORT_NAMES: i32 = 0x1;
const WORD_COUNT_COMPRESSED: i32 = 0x2;

/// Everything the earlier passes produced.
pub struct Resolved<'r> {
    pub structure: &'r StructuralResolution,
    pub sequencing: Sequencing,
}

/// Build the output for a successful link.
pub fn assemble(
    state: &LinkState,
    resolved: Resolved<'_>,
    localizer: &Localizer,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) -> Result<Output, LinkFailure> {
    let mut output = Output::new(state.output_type);
    output.codepage = state.sections[state.entry.0].codepage;
    output.suppressed_sequences = SuppressedSequences {
        admin: config.sequences.suppress_admin,
        advertise: config.sequences.suppress_advertise,
        ui: config.sequences.suppress_ui,
    };

    for (index, section) in state.live_sections() {
        output.sections.push(section.id.clone());

        for (table_index, table) in section.tables.iter().enumerate() {
            let Some(definition) = state.definitions.get(&table.name) else {
                continue;
            };

            let legal = table_policy::is_legal(&table.name, state.output_type);

            for (row_index, row) in table.rows.iter().enumerate() {
                let address = RowAddress {
                    section: index,
                    table: table_index,
                    row: row_index,
                };
                if state.dropped.contains(&SymbolKind::Row(address)) {
                    continue;
                }

                if !legal {
                    messages.emit(
                        LinkWarning::IllegalRowForOutput {
                            table: table.name.clone(),
                            output_type: state.output_type,
                        }
                        .to_message()
                        .with_location(location(section, row.line)),
                    );
                    continue;
                }

                if let Err(e) = definition.check_row(row) {
                    messages.emit(
                        LinkError::MalformedRow {
                            table: table.name.clone(),
                            section: section.id.clone(),
                            reason: e.to_string(),
                        }
                        .to_message()
                        .with_location(location(section, row.line)),
                    );
                    continue;
                }

                let Some(values) = localize(definition, row, localizer, messages, |m| {
                    m.with_location(location(section, row.line))
                }) else {
                    continue;
                };

                output.ensure_table(&table.name).rows.push(OutputRow {
                    values,
                    section_id: config.tag_section_id.then(|| section.id.clone()),
                });
            }
        }
    }

    append_generated(&mut output, state, resolved, config)?;

    apply_summary_information(&mut output);
    if state.output_type == OutputType::Module {
        output.modularization_guid = modularization_guid(&output);
    }

    tracing::debug!(
        "assembled {} tables from {} sections",
        output.tables.len(),
        output.sections.len()
    );

    Ok(output)
}

/// Replace `!(loc.Id)` placeholders in localizable columns.
///
/// Returns `None` after reporting an undefined string.
fn localize(
    definition: &TableDefinition,
    row: &Row,
    localizer: &Localizer,
    messages: &mut Messages<'_>,
    locate: impl Fn(Message) -> Message,
) -> Option<Vec<Value>> {
    let mut values = row.values.clone();
    let mut ok = true;

    for (column, value) in definition.columns.iter().zip(values.iter_mut()) {
        if !column.is_localizable() {
            continue;
        }
        let Some(id) = value.as_str().and_then(localization_id) else {
            continue;
        };

        match localizer.get(id) {
            Some(text) => *value = Value::from(text),
            None => {
                messages.emit(locate(
                    LinkError::UnresolvedLocalization {
                        id: id.to_string(),
                        table: definition.name.clone(),
                    }
                    .to_message(),
                ));
                ok = false;
            }
        }
    }

    ok.then_some(values)
}

fn append_generated(
    output: &mut Output,
    state: &LinkState,
    resolved: Resolved<'_>,
    config: &LinkerConfig,
) -> Result<(), LinkFailure> {
    let structure = resolved.structure;
    let output_type = state.output_type;

    let mut generated: Vec<(String, Vec<Vec<Value>>)> = Vec::new();

    match output_type {
        OutputType::Product => {
            generated.push((
                "FeatureComponents".to_string(),
                structure.feature_component_rows(),
            ));
        }
        OutputType::Module => {
            generated.push((
                "ModuleComponents".to_string(),
                structure.module_component_rows(),
            ));
            generated.push((
                "SuppressAction".to_string(),
                resolved.sequencing.suppress_rows,
            ));
        }
        OutputType::PatchCreation => {}
    }

    for (sequence, actions) in &resolved.sequencing.sequences {
        let rows = actions
            .iter()
            .map(|action| sequence_row(action, output_type))
            .collect();
        generated.push((sequence.table_name_for(output_type).to_string(), rows));
    }

    let entry_id = &state.sections[state.entry.0].id;

    for (table, rows) in generated {
        if rows.is_empty() {
            continue;
        }
        let definition = state.definitions.get(&table).ok_or_else(|| {
            LinkFailure::Internal(format!("no definition for generated table `{}`", table))
        })?;

        for values in rows {
            let row = Row::new(values);
            definition.check_row(&row).map_err(|e| {
                LinkFailure::Internal(format!("generated `{}` row is malformed: {}", table, e))
            })?;
            output.ensure_table(&table).rows.push(OutputRow {
                values: row.values,
                section_id: config.tag_section_id.then(|| entry_id.clone()),
            });
        }
    }

    output.sequences = resolved.sequencing.sequences;
    Ok(())
}

fn sequence_row(action: &SequencedAction, output_type: OutputType) -> Vec<Value> {
    let condition = Value::from(action.condition.clone());
    let sequence = Value::from(action.sequence);

    match output_type {
        OutputType::Module => vec![
            Value::from(action.id.as_str()),
            sequence,
            Value::from(action.base_action.clone()),
            Value::from(action.after.map(i32::from)),
            condition,
        ],
        _ => vec![Value::from(action.id.as_str()), condition, sequence],
    }
}

/// Derive `compressed` and `long_file_names` from the word count property.
fn apply_summary_information(output: &mut Output) {
    let Some(table) = output.table("_SummaryInformation") else {
        return;
    };

    let word_count = table
        .rows
        .iter()
        .find(|row| row.values.first().and_then(Value::as_number) == Some(PID_WORD_COUNT))
        .and_then(|row| match row.values.get(1)? {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

    if let Some(word_count) = word_count {
        output.long_file_names = word_count & WORD_COUNT_SHORT_NAMES == 0;
        output.compressed = word_count & WORD_COUNT_COMPRESSED != 0;
    }
}

/// The identifier suffix appended to modularized keys of a merge module.
fn modularization_guid(output: &Output) -> Option<String> {
    let module_id = output.table("ModuleSignature")?.rows.first()?.str_at(0)?;
    let suffix = module_id.rsplit('.').next()?;
    Some(suffix.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::sequencer::sequence_actions;
    use crate::linker::structural::resolve_structure;
    use crate::test_support::{component, feature, property, SectionFixture};
    use crate::util::{CollectingSink, Severity};

    fn link(
        sections: Vec<crate::core::Section>,
        config: &LinkerConfig,
        localizer: &Localizer,
        sink: &mut CollectingSink,
    ) -> Output {
        let mut messages = Messages::new(sink);
        let mut state = LinkState::prepare(sections, config, &mut messages).unwrap();
        let structure = resolve_structure(&mut state, config, &mut messages).unwrap();
        let sequencing = sequence_actions(&state, config, &mut messages).unwrap();
        assemble(
            &state,
            Resolved {
                structure: &structure,
                sequencing,
            },
            localizer,
            config,
            &mut messages,
        )
        .unwrap()
    }

    #[test]
    fn test_rows_folded_in_section_order() {
        let sections = vec![
            SectionFixture::product("prod")
                .row("Property", property("A", "1"))
                .reference("Property", "B")
                .build(),
            SectionFixture::fragment("frag").row("Property", property("B", "2")).build(),
            SectionFixture::fragment("unused").row("Property", property("C", "3")).build(),
        ];

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);

        let ids: Vec<_> = output.tables["Property"]
            .rows
            .iter()
            .map(|r| r.str_at(0).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(output.sections, vec!["prod", "frag"]);
    }

    #[test]
    fn test_feature_components_generated() {
        let sections = vec![SectionFixture::product("prod")
            .row("Feature", feature("F1"))
            .row("Component", component("C1", "INSTALLDIR"))
            .feature_component("F1", "C1")
            .build()];

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);

        let rows = &output.tables["FeatureComponents"].rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values, vec![Value::from("F1"), Value::from("C1")]);
        assert!(output.tables.contains_key("InstallExecuteSequence"));
    }

    #[test]
    fn test_illegal_rows_warn_per_row() {
        let sections = vec![SectionFixture::module("mod")
            .row("Feature", feature("F1"))
            .row("Feature", feature("F2"))
            .build()];

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);

        assert!(!output.tables.contains_key("Feature"));
        assert_eq!(sink.ids(Severity::Warning), vec![1006, 1006]);
    }

    #[test]
    fn test_malformed_row() {
        let sections = vec![SectionFixture::product("prod")
            .row("Property", vec!["A".into()])
            .build()];

        let mut sink = CollectingSink::new();
        link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);
        assert_eq!(sink.ids(Severity::Error), vec![13]);
    }

    #[test]
    fn test_localization() {
        let sections = vec![SectionFixture::product("prod")
            .row("Property", property("ProductName", "!(loc.Name)"))
            .row("Property", property("Other", "!(loc.Missing)"))
            .build()];
        let mut localizer = Localizer::new();
        localizer.insert("Name", "Example");

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &localizer, &mut sink);

        let rows = &output.tables["Property"].rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].str_at(1), Some("Example"));
        assert_eq!(sink.ids(Severity::Error), vec![16]);
    }

    #[test]
    fn test_tag_section_id() {
        let sections = vec![SectionFixture::product("prod")
            .row("Property", property("A", "1"))
            .build()];
        let config = LinkerConfig {
            tag_section_id: true,
            ..Default::default()
        };

        let mut sink = CollectingSink::new();
        let output = link(sections, &config, &Localizer::new(), &mut sink);
        assert_eq!(
            output.tables["Property"].rows[0].section_id.as_deref(),
            Some("prod")
        );
    }

    #[test]
    fn test_summary_information_flags() {
        let sections = vec![SectionFixture::product("prod")
            .row("_SummaryInformation", vec![Value::Number(15), Value::from("3")])
            .build()];

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);
        assert!(output.compressed);
        assert!(!output.long_file_names);
    }

    #[test]
    fn test_module_outputs() {
        let sections = vec![SectionFixture::module("mod")
            .row(
                "ModuleSignature",
                vec![
                    Value::from("Example.1A2B-3C4D"),
                    Value::Number(1033),
                    Value::from("1.0.0"),
                ],
            )
            .row("Component", component("C1", "TARGETDIR"))
            .build()];

        let mut sink = CollectingSink::new();
        let output = link(sections, &LinkerConfig::default(), &Localizer::new(), &mut sink);

        assert_eq!(output.modularization_guid.as_deref(), Some("1A2B_3C4D"));
        assert_eq!(
            output.tables["ModuleComponents"].rows[0].values,
            vec![
                Value::from("C1"),
                Value::from("Example.1A2B-3C4D"),
                Value::Number(1033),
            ]
        );
        assert!(output.sequences.is_empty());
        assert!(!output.tables.contains_key("FeatureComponents"));
    }
}
