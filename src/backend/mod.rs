// Backend REST access
//
// The backend stores JSON documents and offers no multi-document
// transactions; every call here is an independent write or read.
// - http: reqwest implementation against the deployed service

pub mod http;

use async_trait::async_trait;

pub use http::HttpBackend;

use crate::error::Result;
use crate::models::{ExercisePayload, ExerciseRecord, RoutinePayload, RoutineRecord};

/// Operations the authoring flow needs from the backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Create an exercise and return its new id.
    async fn create_exercise(&self, exercise: &ExercisePayload) -> Result<String>;

    async fn update_exercise(&self, id: &str, exercise: &ExercisePayload) -> Result<()>;

    /// Create a routine and return its new id.
    async fn create_routine(&self, routine: &RoutinePayload) -> Result<String>;

    async fn update_routine(&self, id: &str, routine: &RoutinePayload) -> Result<()>;

    /// Add a routine to the therapist's custom routines.
    async fn link_routine_to_owner(&self, owner_id: &str, routine_id: &str) -> Result<()>;

    async fn get_routine(&self, id: &str) -> Result<RoutineRecord>;

    async fn get_exercise(&self, id: &str) -> Result<ExerciseRecord>;

    async fn list_custom_routines(&self, owner_id: &str) -> Result<Vec<RoutineRecord>>;

    /// Put a routine on a patient's assigned list.
    async fn assign_routine(&self, patient_id: &str, routine_id: &str) -> Result<()>;
}
