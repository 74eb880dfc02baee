//! Feature backlinks.
//!
//! Rows such as `Class` or `Shortcut` need the feature that owns a component,
//! which is only known once structural references are resolved. The front end
//! leaves a backlink request; this pass writes the primary feature into the
//! designated column of the target row.

use std::collections::BTreeSet;

use crate::core::{OutputType, Value};
use crate::linker::errors::{LinkError, LinkFailure, LinkWarning};
use crate::linker::references::report_unresolved;
use crate::linker::structural::StructuralResolution;
use crate::linker::{location, LinkState};
use crate::util::{LinkerConfig, Messages, PedanticLevel};

/// Feature id written into module outputs, replaced when the module is merged.
pub const MODULE_PLACEHOLDER_FEATURE: &str = "{00000000-0000-0000-0000-000000000000}";

/// Patch every backlink owned by a live section.
pub fn resolve_backlinks(
    state: &mut LinkState,
    structure: &StructuralResolution,
    config: &LinkerConfig,
    messages: &mut Messages<'_>,
) -> Result<(), LinkFailure> {
    let backlinks: Vec<_> = state
        .live_sections()
        .flat_map(|(index, section)| {
            section
                .feature_backlinks
                .iter()
                .cloned()
                .map(move |backlink| (index, backlink))
        })
        .collect();

    let mut warned = BTreeSet::new();
    let mut patched = 0;

    for (index, backlink) in backlinks {
        let section = &state.sections[index.0];
        let target = backlink.target.symbolic_name();

        if !state.symbols.contains(&target) {
            report_unresolved(&target, section, None, config, messages);
            continue;
        }

        let feature = match state.output_type {
            OutputType::Module => MODULE_PLACEHOLDER_FEATURE.to_string(),
            _ => {
                let Some(connection) = structure.component_features.get(&backlink.component)
                else {
                    messages.emit(
                        LinkError::MissingFeature {
                            component: backlink.component.clone(),
                            target: target.clone(),
                        }
                        .to_message()
                        .with_location(location(section, None)),
                    );
                    continue;
                };

                if config.is_pedantic(PedanticLevel::Legendary)
                    && connection.is_ambiguous()
                    && warned.insert(backlink.component.clone())
                {
                    messages.emit(
                        LinkWarning::ImplicitPrimaryFeature {
                            component: backlink.component.clone(),
                            feature: connection.primary.clone(),
                            candidates: connection.len(),
                        }
                        .to_message()
                        .with_location(location(section, None)),
                    );
                }

                connection.primary.clone()
            }
        };

        if !state.set_column(&target, backlink.kind.feature_column(), Value::from(feature))? {
            return Err(LinkFailure::Internal(format!(
                "backlink target `{}` is not a table row",
                target
            )));
        }
        patched += 1;
    }

    tracing::debug!("patched {} feature backlinks", patched);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BacklinkKind;
    use crate::linker::structural::resolve_structure;
    use crate::test_support::{component, feature, shortcut, SectionFixture};
    use crate::util::{CollectingSink, Severity};

    fn run(
        sections: Vec<crate::core::Section>,
        config: &LinkerConfig,
        sink: &mut CollectingSink,
    ) -> LinkState {
        let mut messages = Messages::new(sink);
        let mut state = LinkState::prepare(sections, config, &mut messages).unwrap();
        let structure = resolve_structure(&mut state, config, &mut messages).unwrap();
        resolve_backlinks(&mut state, &structure, config, &mut messages).unwrap();
        state
    }

    fn shortcut_target(state: &LinkState) -> Value {
        let symbol = state.symbols.get("Shortcut:SC1").unwrap();
        state.row(symbol).unwrap().values[4].clone()
    }

    #[test]
    fn test_backlink_patches_primary_feature() {
        let sections = vec![SectionFixture::product("prod")
            .row("Feature", feature("F1"))
            .row("Feature", feature("F2"))
            .row("Component", component("C1", "INSTALLDIR"))
            .row("Shortcut", shortcut("SC1", "C1"))
            .feature_component("F1", "C1")
            .feature_component("F2", "C1")
            .backlink("Shortcut", "SC1", BacklinkKind::Shortcut, "C1")
            .build()];

        let mut sink = CollectingSink::new();
        let state = run(sections, &LinkerConfig::default(), &mut sink);

        assert_eq!(shortcut_target(&state), Value::from("F1"));
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_component_without_feature_is_error() {
        let sections = vec![SectionFixture::product("prod")
            .row("Component", component("C1", "INSTALLDIR"))
            .row("Shortcut", shortcut("SC1", "C1"))
            .backlink("Shortcut", "SC1", BacklinkKind::Shortcut, "C1")
            .build()];

        let mut sink = CollectingSink::new();
        run(sections, &LinkerConfig::default(), &mut sink);
        assert_eq!(sink.ids(Severity::Error), vec![8]);
    }

    #[test]
    fn test_module_uses_placeholder_feature() {
        let sections = vec![SectionFixture::module("mod")
            .row("Component", component("C1", "TARGETDIR"))
            .row("Shortcut", shortcut("SC1", "C1"))
            .backlink("Shortcut", "SC1", BacklinkKind::Shortcut, "C1")
            .build()];

        let mut sink = CollectingSink::new();
        let state = run(sections, &LinkerConfig::default(), &mut sink);
        assert_eq!(
            shortcut_target(&state),
            Value::from(MODULE_PLACEHOLDER_FEATURE)
        );
    }

    #[test]
    fn test_missing_target_is_unresolved() {
        let sections = vec![SectionFixture::product("prod")
            .row("Feature", feature("F1"))
            .row("Component", component("C1", "INSTALLDIR"))
            .feature_component("F1", "C1")
            .backlink("Shortcut", "Nope", BacklinkKind::Shortcut, "C1")
            .build()];

        let mut sink = CollectingSink::new();
        run(sections, &LinkerConfig::default(), &mut sink);
        assert_eq!(sink.ids(Severity::Error), vec![3]);
    }

    #[test]
    fn test_legendary_warns_once_for_implicit_primary() {
        let sections = vec![SectionFixture::product("prod")
            .row("Feature", feature("F1"))
            .row("Feature", feature("F2"))
            .row("Component", component("C1", "INSTALLDIR"))
            .row("Shortcut", shortcut("SC1", "C1"))
            .row("Shortcut", shortcut("SC2", "C1"))
            .feature_component("F1", "C1")
            .feature_component("F2", "C1")
            .backlink("Shortcut", "SC1", BacklinkKind::Shortcut, "C1")
            .backlink("Shortcut", "SC2", BacklinkKind::Shortcut, "C1")
            .build()];
        let config = LinkerConfig {
            pedantic: PedanticLevel::Legendary,
            ..Default::default()
        };

        let mut sink = CollectingSink::new();
        run(sections, &config, &mut sink);
        assert_eq!(sink.ids(Severity::Warning), vec![1003]);
    }
}
