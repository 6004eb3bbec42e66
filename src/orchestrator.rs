//! Routine save saga.
//!
//! Saving a routine is a chain of independent backend writes with no
//! rollback:
//!
//! 1. **Validate**: name, category and owner present, before any call
//! 2. **Exercises**: create or update each exercise in order, recording
//!    new ids into the draft as soon as they exist
//! 3. **Routine**: create or update the routine with the collected ids
//! 4. **Link**: attach the routine to the therapist (best effort)
//!
//! A failed step stops the saga. Everything written before it stays on the
//! backend and its id stays in the draft, so calling `save` again updates
//! those records instead of creating duplicates.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::BackendApi;
use crate::error::{Result, SaveError};
use crate::models::{ExerciseDraft, ExerciseRef, RoutineDraft, RoutinePayload};

pub struct RoutineCompositionOrchestrator {
    backend: Arc<dyn BackendApi>,
}

impl RoutineCompositionOrchestrator {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self { backend }
    }

    /// Persist the draft and return the routine id.
    pub async fn save(&self, draft: &mut RoutineDraft, owner_id: &str) -> std::result::Result<String, SaveError> {
        self.save_with_cancel(draft, owner_id, &CancellationToken::new()).await
    }

    /// Like `save`, checking `cancel` before every write that would create
    /// or change backend state.
    pub async fn save_with_cancel(
        &self,
        draft: &mut RoutineDraft,
        owner_id: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, SaveError> {
        validate(draft, owner_id)?;
        info!(
            name = %draft.name,
            exercises = draft.exercises.len(),
            "Saving routine"
        );

        let exercise_refs = self.upsert_exercises(&mut draft.exercises, cancel).await?;

        if cancel.is_cancelled() {
            return Err(SaveError::Cancelled {
                completed_exercises: exercise_refs.len(),
            });
        }
        let routine_id = self.upsert_routine(draft, exercise_refs).await?;

        if let Err(e) = self.backend.link_routine_to_owner(owner_id, &routine_id).await {
            warn!(routine_id = %routine_id, owner = %owner_id, "Linking routine to owner failed: {}", e);
        }

        info!(routine_id = %routine_id, "Routine saved");
        Ok(routine_id)
    }

    async fn upsert_exercises(
        &self,
        exercises: &mut [ExerciseDraft],
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<ExerciseRef>, SaveError> {
        let mut refs = Vec::with_capacity(exercises.len());

        for (index, exercise) in exercises.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Err(SaveError::Cancelled {
                    completed_exercises: index,
                });
            }

            let payload = exercise.to_payload();
            let id = match exercise.id.clone() {
                Some(id) => {
                    debug!(index, id = %id, "Updating exercise");
                    self.backend
                        .update_exercise(&id, &payload)
                        .await
                        .map_err(|source| exercise_failed(index, source))?;
                    id
                }
                None => {
                    debug!(index, "Creating exercise");
                    let id = self
                        .backend
                        .create_exercise(&payload)
                        .await
                        .map_err(|source| exercise_failed(index, source))?;
                    exercise.id = Some(id.clone());
                    id
                }
            };
            refs.push(ExerciseRef { id });
        }

        Ok(refs)
    }

    async fn upsert_routine(
        &self,
        draft: &mut RoutineDraft,
        exercises: Vec<ExerciseRef>,
    ) -> std::result::Result<String, SaveError> {
        let payload = RoutinePayload {
            name: draft.name.clone(),
            category: draft.category.clone(),
            exercises,
        };

        let result = match draft.id.clone() {
            Some(id) => self.backend.update_routine(&id, &payload).await.map(|_| id),
            None => self.backend.create_routine(&payload).await,
        };

        match result {
            Ok(id) => {
                draft.id = Some(id.clone());
                Ok(id)
            }
            Err(source) => {
                error!("Routine write failed, {} exercise(s) left unreferenced: {}", payload.exercises.len(), source);
                Err(SaveError::RoutineWriteFailed(source))
            }
        }
    }

    /// Fetch a routine and its exercises as an editable draft.
    pub async fn load(&self, routine_id: &str) -> Result<RoutineDraft> {
        let routine = self.backend.get_routine(routine_id).await?;
        debug!(routine_id, exercises = routine.exercises.len(), "Hydrating routine");

        let mut exercises = Vec::with_capacity(routine.exercises.len());
        for exercise_ref in &routine.exercises {
            let record = self.backend.get_exercise(&exercise_ref.id).await?;
            exercises.push(ExerciseDraft::from(record));
        }

        Ok(RoutineDraft {
            id: Some(routine.id),
            name: routine.name,
            category: routine.category,
            exercises,
        })
    }
}

fn exercise_failed(index: usize, source: crate::error::ComposerError) -> SaveError {
    error!(index, "Exercise write failed: {}", source);
    SaveError::ExerciseWriteFailed { index, source }
}

fn validate(draft: &RoutineDraft, owner_id: &str) -> std::result::Result<(), SaveError> {
    if draft.name.trim().is_empty() {
        return Err(SaveError::InvalidInput("routine name is required".to_string()));
    }
    if draft.category.trim().is_empty() {
        return Err(SaveError::InvalidInput("routine category is required".to_string()));
    }
    if owner_id.trim().is_empty() {
        return Err(SaveError::InvalidInput("owner id is required".to_string()));
    }
    Ok(())
}
