use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a transformation task.
///
/// ```text
/// PENDING ──► IN_PROGRESS ──► SUCCESS
///    │             │
///    │             └────────► FAILED
///    └──(empty chain)───────► FAILED
/// PENDING | IN_PROGRESS ──(external)──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    /// SUCCESS, FAILED and CANCELLED admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// States a task may be in for a move to `next` to be legal.
    pub fn allowed_predecessors(next: TaskStatus) -> &'static [TaskStatus] {
        match next {
            TaskStatus::Pending => &[],
            TaskStatus::InProgress => &[TaskStatus::Pending],
            TaskStatus::Success => &[TaskStatus::InProgress],
            // PENDING -> FAILED is only taken when a task is rejected before pickup
            // (empty transformation list).
            TaskStatus::Failed => &[TaskStatus::Pending, TaskStatus::InProgress],
            TaskStatus::Cancelled => &[TaskStatus::Pending, TaskStatus::InProgress],
        }
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        Self::allowed_predecessors(next).contains(self)
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILED" => Ok(TaskStatus::Failed),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

/// A single `{operation, params}` entry of a transformation chain.
///
/// Tasks keep their chain as raw JSON descriptors (that is what the API layer
/// stores); this type is the well-formed shape a descriptor is parsed into
/// before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationStep {
    pub operation: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl TransformationStep {
    /// Build a step from an operation name and a JSON object of parameters.
    /// Non-object `params` values are treated as "no parameters".
    pub fn new(operation: impl Into<String>, params: serde_json::Value) -> Self {
        let params = match params {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            operation: operation.into(),
            params,
        }
    }

    /// Step without parameters (`flip`, `mirror`, `grayscale`, ...).
    pub fn bare(operation: impl Into<String>) -> Self {
        Self::new(operation, serde_json::Value::Null)
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "operation": self.operation,
            "params": self.params,
        })
    }
}

/// Immutable snapshot of a transformation task record.
///
/// Serialized shape: `{id, owner_id, original_image_id, result_image_id?, status,
/// transformations: [{operation, params}], format?, error_message?, created_at, updated_at}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationTask {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_image_id: Uuid,
    pub result_image_id: Option<Uuid>,
    pub status: TaskStatus,
    pub transformations: Vec<serde_json::Value>,
    /// Requested output format; `None` means "same as the source".
    pub format: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransformationTask {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_transformations(&self) -> bool {
        !self.transformations.is_empty()
    }
}

/// Fields supplied by the API layer when it creates a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransformationTask {
    pub owner_id: Uuid,
    pub original_image_id: Uuid,
    pub transformations: Vec<serde_json::Value>,
    pub format: Option<String>,
}

impl NewTransformationTask {
    pub fn from_steps(
        owner_id: Uuid,
        original_image_id: Uuid,
        steps: &[TransformationStep],
        format: Option<&str>,
    ) -> Self {
        Self {
            owner_id,
            original_image_id,
            transformations: steps.iter().map(TransformationStep::to_value).collect(),
            format: format.map(str::to_string),
        }
    }
}
