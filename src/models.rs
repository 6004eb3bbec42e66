//! Draft state and backend wire types.
//!
//! Drafts are client-local: an absent `id` means the entity has not been
//! created on the backend yet. Wire types mirror the backend's JSON
//! documents, which key identifiers as `_id`.

use serde::{Deserialize, Serialize};

/// A locally picked media file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaHandle {
    /// `file://` path, plain path, `http(s)://` or `data:` URI
    pub uri: String,
    pub filename: String,
    pub mime_type: String,
}

impl MediaHandle {
    pub fn new<U, F, M>(uri: U, filename: F, mime_type: M) -> Self
    where
        U: Into<String>,
        F: Into<String>,
        M: Into<String>,
    {
        Self {
            uri: uri.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// One exercise being authored or edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    /// Repetition count
    #[serde(default)]
    pub reps: u32,
    /// Hold duration in seconds
    #[serde(default)]
    pub hold: u32,
    #[serde(default)]
    pub sets: u32,
    /// Sessions per week
    #[serde(default)]
    pub frequency: u32,
    /// Picked video, cleared once its upload is attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_source: Option<MediaHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Source URI behind `video_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_source: Option<String>,
}

impl ExerciseDraft {
    pub fn to_payload(&self) -> ExercisePayload {
        ExercisePayload {
            reps: self.reps,
            hold: self.hold,
            sets: self.sets,
            frequency: self.frequency,
            description: self.description.clone(),
            thumbnail_url: self.thumbnail_url.clone().unwrap_or_default(),
            video_url: self.video_url.clone().unwrap_or_default(),
            title: self.title.clone(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
        }
    }
}

impl From<ExerciseRecord> for ExerciseDraft {
    fn from(record: ExerciseRecord) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            id: Some(record.id),
            title: record.title,
            description: record.description,
            category: record.category,
            subcategory: record.subcategory,
            reps: record.reps,
            hold: record.hold,
            sets: record.sets,
            frequency: record.frequency,
            media_source: None,
            video_url: non_empty(record.video_url),
            thumbnail_url: non_empty(record.thumbnail_url),
            uploaded_source: None,
        }
    }
}

/// The routine being authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutineDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Display order only
    #[serde(default)]
    pub exercises: Vec<ExerciseDraft>,
}

/// Outcome of one successful media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub video_url: String,
    /// Empty when no thumbnail could be produced
    pub thumbnail_url: String,
}

/// Body of exercise create/update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePayload {
    pub reps: u32,
    pub hold: u32,
    pub sets: u32,
    pub frequency: u32,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub title: String,
    pub category: String,
    pub subcategory: String,
}

/// Exercise document as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub hold: u32,
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub frequency: u32,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRef {
    #[serde(rename = "_id")]
    pub id: String,
}

/// Body of routine create/update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutinePayload {
    pub name: String,
    pub category: String,
    pub exercises: Vec<ExerciseRef>,
}

/// Routine document as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseRef>,
}

/// Response of a create call; the backend names the key differently per resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CreatedResponse {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub routine_id: Option<String>,
    #[serde(default)]
    pub exercise_id: Option<String>,
}

impl CreatedResponse {
    pub(crate) fn into_id(self) -> Option<String> {
        self.routine_id.or(self.exercise_id).or(self.id)
    }
}
