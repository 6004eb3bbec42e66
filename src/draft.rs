use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{ComposerError, Result};
use crate::models::{ExerciseDraft, MediaHandle, RoutineDraft, UploadResult};

/// Editable exercise fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseField {
    Title,
    Description,
    Category,
    Subcategory,
    Reps,
    Hold,
    Sets,
    Frequency,
}

impl ExerciseField {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Reps | Self::Hold | Self::Sets | Self::Frequency)
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "description" => Some(Self::Description),
            "category" => Some(Self::Category),
            "subcategory" => Some(Self::Subcategory),
            "reps" => Some(Self::Reps),
            "hold" => Some(Self::Hold),
            "sets" => Some(Self::Sets),
            "frequency" => Some(Self::Frequency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Count(u32),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Count(value)
    }
}

/// In-memory owner of the routine draft for one authoring session.
///
/// Every operation is total: out-of-range indexes and mismatched values are
/// ignored and reported through the returned `bool`, so the draft is always
/// in a valid shape.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    draft: RoutineDraft,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing routine (edit flow).
    pub fn hydrated(draft: RoutineDraft) -> Self {
        debug!("Hydrating draft with {} exercises", draft.exercises.len());
        Self { draft }
    }

    pub fn draft(&self) -> &RoutineDraft {
        &self.draft
    }

    /// Mutable access for the save saga, which records ids as it goes.
    pub fn draft_mut(&mut self) -> &mut RoutineDraft {
        &mut self.draft
    }

    /// Read a draft saved by `save_to_file`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ComposerError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::hydrated(serde_json::from_str(&content)?))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.draft)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn set_meta<N: Into<String>, C: Into<String>>(&mut self, name: N, category: C) {
        self.draft.name = name.into();
        self.draft.category = category.into();
    }

    /// Append a zero-valued exercise and return its index.
    pub fn add_exercise(&mut self) -> usize {
        self.draft.exercises.push(ExerciseDraft::default());
        self.draft.exercises.len() - 1
    }

    pub fn update_exercise_field<V: Into<FieldValue>>(
        &mut self,
        index: usize,
        field: ExerciseField,
        value: V,
    ) -> bool {
        let Some(exercise) = self.draft.exercises.get_mut(index) else {
            return false;
        };

        let value = value.into();
        if field.is_numeric() {
            let count = match value {
                FieldValue::Count(n) => n,
                FieldValue::Text(text) => match text.trim().parse::<u32>() {
                    Ok(n) => n,
                    Err(_) => return false,
                },
            };
            let slot = match field {
                ExerciseField::Reps => &mut exercise.reps,
                ExerciseField::Hold => &mut exercise.hold,
                ExerciseField::Sets => &mut exercise.sets,
                _ => &mut exercise.frequency,
            };
            *slot = count;
        } else {
            let text = match value {
                FieldValue::Text(text) => text,
                FieldValue::Count(n) => n.to_string(),
            };
            let slot = match field {
                ExerciseField::Title => &mut exercise.title,
                ExerciseField::Description => &mut exercise.description,
                ExerciseField::Category => &mut exercise.category,
                _ => &mut exercise.subcategory,
            };
            *slot = text;
        }
        true
    }

    /// Remove every exercise carrying the backend id `id`.
    pub fn remove_exercise(&mut self, id: &str) -> bool {
        let before = self.draft.exercises.len();
        self.draft
            .exercises
            .retain(|ex| ex.id.as_deref() != Some(id));
        self.draft.exercises.len() != before
    }

    /// Remove by position; needed for exercises that have no id yet.
    pub fn remove_exercise_at(&mut self, index: usize) -> bool {
        if index < self.draft.exercises.len() {
            self.draft.exercises.remove(index);
            true
        } else {
            false
        }
    }

    /// Record a newly picked video; any previous upload stays until replaced.
    pub fn select_media(&mut self, index: usize, handle: MediaHandle) -> bool {
        match self.draft.exercises.get_mut(index) {
            Some(exercise) => {
                exercise.media_source = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Merge an upload result into exactly one exercise.
    pub fn attach_media(&mut self, index: usize, result: UploadResult) -> bool {
        let Some(exercise) = self.draft.exercises.get_mut(index) else {
            return false;
        };
        exercise.video_url = Some(result.video_url);
        exercise.thumbnail_url = if result.thumbnail_url.is_empty() {
            None
        } else {
            Some(result.thumbnail_url)
        };
        exercise.uploaded_source = exercise.media_source.take().map(|handle| handle.uri);
        true
    }

    /// Sources already uploaded in an earlier session, with their results.
    pub fn uploaded_media(&self) -> Vec<(String, UploadResult)> {
        self.draft
            .exercises
            .iter()
            .filter_map(|ex| {
                let source = ex.uploaded_source.clone()?;
                let video_url = ex.video_url.clone()?;
                Some((
                    source,
                    UploadResult {
                        video_url,
                        thumbnail_url: ex.thumbnail_url.clone().unwrap_or_default(),
                    },
                ))
            })
            .collect()
    }

    /// Exercises whose picked media has not been uploaded yet.
    pub fn pending_media(&self) -> Vec<(usize, MediaHandle)> {
        self.draft
            .exercises
            .iter()
            .enumerate()
            .filter_map(|(i, ex)| ex.media_source.clone().map(|h| (i, h)))
            .collect()
    }
}
