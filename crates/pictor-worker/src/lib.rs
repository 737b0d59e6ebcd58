//! Pictor worker
//!
//! The pipeline orchestrator that executes transformation tasks, the task
//! state machine it drives, and the worker pool that feeds it task ids.

pub mod lifecycle;
pub mod orchestrator;
pub mod queue;

pub use lifecycle::{Claim, TaskLifecycle};
pub use orchestrator::{ExecutionOutcome, PipelineOrchestrator};
pub use queue::{
    ChannelSource, RepositoryPoller, TaskFinishedSender, TaskQueue, TaskQueueConfig, TaskSource,
    STALE_TASK_MESSAGE,
};
