//! Task state machine
//!
//! Thin layer over [`TaskRepository`] that performs the three transitions the
//! orchestrator is allowed to make and logs each of them. Legality is checked
//! by the repository's conditional writes, not here, so two workers can never
//! both move the same task.

use std::sync::Arc;

use pictor_core::error::LogLevel;
use pictor_core::models::{TaskStatus, TransformationTask};
use pictor_core::{PipelineError, PipelineResult};
use pictor_db::{RepositoryError, TaskRepository};
use uuid::Uuid;

/// Result of trying to claim a task
#[derive(Debug)]
pub enum Claim {
    Acquired(TransformationTask),
    /// Another actor moved the task first
    Lost(TaskStatus),
}

#[derive(Clone)]
pub struct TaskLifecycle {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskLifecycle {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    /// PENDING -> IN_PROGRESS
    pub async fn start(&self, task_id: Uuid) -> PipelineResult<Claim> {
        match self.tasks.mark_in_progress(task_id).await {
            Ok(task) => {
                tracing::info!(task_id = %task_id, status = %task.status, "Task started");
                Ok(Claim::Acquired(task))
            }
            Err(RepositoryError::InvalidTransition { from, .. }) => {
                tracing::warn!(task_id = %task_id, status = %from, "Task claimed elsewhere, skipping");
                Ok(Claim::Lost(from))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// IN_PROGRESS -> SUCCESS
    pub async fn succeed(&self, task_id: Uuid, result_image_id: Uuid) -> PipelineResult<()> {
        self.tasks.mark_success(task_id, result_image_id).await?;
        tracing::info!(
            task_id = %task_id,
            result_image_id = %result_image_id,
            "Task succeeded"
        );
        Ok(())
    }

    /// Record `error` as the task's failure.
    ///
    /// Never fails: if the write itself is rejected (task already terminal,
    /// database down) the problem is logged and the original error still
    /// reaches the caller.
    pub async fn fail(&self, task_id: Uuid, error: &PipelineError) {
        let message = error.to_string();

        match error.log_level() {
            LogLevel::Error => tracing::error!(
                task_id = %task_id,
                error_code = error.error_code(),
                error = %message,
                "Task failed"
            ),
            LogLevel::Warn => tracing::warn!(
                task_id = %task_id,
                error_code = error.error_code(),
                error = %message,
                "Task failed"
            ),
            LogLevel::Debug => tracing::debug!(
                task_id = %task_id,
                error_code = error.error_code(),
                error = %message,
                "Task failed"
            ),
        }

        if let Err(e) = self.tasks.mark_failed(task_id, &message).await {
            tracing::warn!(task_id = %task_id, error = %e, "Could not record task failure");
        }
    }
}
