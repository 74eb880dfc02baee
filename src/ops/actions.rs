//! The `actions` operation: list the standard action catalog.

use anyhow::Result;

use crate::core::{Action, Scheduling, SequenceType};
use crate::linker::StandardActions;

/// One catalog entry as shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionListing {
    pub sequence: SequenceType,
    pub id: String,
    pub position: i32,
    pub condition: Option<String>,
    /// Scheduled in every product
    pub required: bool,
}

/// Catalog entries ordered by sequence, then position.
pub fn list_actions(sequence: Option<SequenceType>) -> Result<Vec<ActionListing>> {
    let catalog = StandardActions::get()?;
    let sequences: Vec<SequenceType> = match sequence {
        Some(sequence) => vec![sequence],
        None => SequenceType::ALL.to_vec(),
    };

    let mut listings = Vec::new();
    for sequence in sequences {
        let required: Vec<_> = catalog.skeleton(sequence).collect();
        let mut entries: Vec<_> = catalog
            .sequence(sequence)
            .map(|action| listing(action, required.contains(&action.key())))
            .collect();
        entries.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        listings.extend(entries);
    }

    Ok(listings)
}

fn listing(action: &Action, required: bool) -> ActionListing {
    let position = match action.scheduling {
        Scheduling::Absolute(position) => position,
        _ => 0,
    };
    ActionListing {
        sequence: action.sequence,
        id: action.id.clone(),
        position,
        condition: action.condition.clone(),
        required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_one_sequence_in_order() {
        let listings = list_actions(Some(SequenceType::InstallExecute)).unwrap();

        assert!(listings
            .iter()
            .all(|l| l.sequence == SequenceType::InstallExecute));
        assert!(listings.windows(2).all(|w| w[0].position <= w[1].position));

        let validate = listings.iter().find(|l| l.id == "InstallValidate").unwrap();
        assert_eq!(validate.position, 1400);
        assert!(validate.required);

        let install_files = listings.iter().find(|l| l.id == "InstallFiles").unwrap();
        assert_eq!(install_files.position, 4000);
        assert!(!install_files.required);
    }

    #[test]
    fn test_list_all_sequences() {
        let listings = list_actions(None).unwrap();
        assert_eq!(listings.len(), StandardActions::get().unwrap().len());
        assert!(listings
            .iter()
            .any(|l| l.sequence == SequenceType::AdminUI));
    }
}
