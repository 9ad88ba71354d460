use std::collections::HashSet;

use stageconfig::{ExerciseConfig, StageConfig};

use crate::media::Rendition;
use crate::SequencerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseEntry {
    pub id: String,
    /// Shown to the user and sent to the coaching backend on selection.
    pub label: String,
    pub processed: String,
    pub raw: String,
    pub icon: Option<String>,
}

impl ExerciseEntry {
    pub fn source(&self, rendition: Rendition) -> &str {
        match rendition {
            Rendition::Processed => &self.processed,
            Rendition::Raw => &self.raw,
        }
    }
}

impl From<&ExerciseConfig> for ExerciseEntry {
    fn from(config: &ExerciseConfig) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            processed: config.processed.clone(),
            raw: config.raw.clone(),
            icon: config.icon.clone(),
        }
    }
}

/// Fixed, ordered, non-empty list of exercises with unique ids and labels.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ExerciseEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<ExerciseEntry>) -> Result<Self, SequencerError> {
        if entries.is_empty() {
            return Err(SequencerError::EmptyCatalog);
        }
        let mut ids = HashSet::new();
        let mut labels = HashSet::new();
        for entry in &entries {
            if !ids.insert(entry.id.as_str()) {
                return Err(SequencerError::DuplicateExercise {
                    field: "id",
                    value: entry.id.clone(),
                });
            }
            if !labels.insert(entry.label.as_str()) {
                return Err(SequencerError::DuplicateExercise {
                    field: "label",
                    value: entry.label.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn from_config(config: &StageConfig) -> Result<Self, SequencerError> {
        Self::new(config.exercises.iter().map(ExerciseEntry::from).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExerciseEntry> {
        self.entries.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExerciseEntry> {
        self.entries.iter()
    }

    /// Autoplay order wraps back to the first entry.
    pub fn next_after(&self, index: usize) -> usize {
        (index + 1) % self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_default_config() {
        let catalog = Catalog::from_config(&StageConfig::default()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.position("plank"), Some(2));
        let squats = catalog.get(0).unwrap();
        assert_eq!(squats.source(Rendition::Raw), "videos/squats_raw.mp4");
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(
            Catalog::new(Vec::new()),
            Err(SequencerError::EmptyCatalog)
        ));
    }

    #[test]
    fn rejects_repeated_ids_and_labels() {
        let base = Catalog::from_config(&StageConfig::default()).unwrap();
        let squats = base.get(0).unwrap().clone();

        let mut same_id = squats.clone();
        same_id.label = "Deep Squats".into();
        assert!(matches!(
            Catalog::new(vec![squats.clone(), same_id]),
            Err(SequencerError::DuplicateExercise { field: "id", .. })
        ));

        let mut same_label = squats.clone();
        same_label.id = "deep-squats".into();
        assert!(matches!(
            Catalog::new(vec![squats, same_label]),
            Err(SequencerError::DuplicateExercise { field: "label", ref value }) if value == "Squats"
        ));
    }

    #[test]
    fn next_after_wraps() {
        let catalog = Catalog::from_config(&StageConfig::default()).unwrap();
        assert_eq!(catalog.next_after(0), 1);
        assert_eq!(catalog.next_after(2), 0);
    }
}
