use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Original upload. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImage {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Display file name given at upload (e.g. `holiday.jpg`)
    pub file_name: String,
    pub description: String,
    /// Blob store key of the original bytes
    pub storage_key: String,
    /// Format declared at upload time (e.g. `JPEG`)
    pub format: Option<String>,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

/// Metadata extracted from an encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub format: String,
    pub format_description: String,
    /// Pixel mode: `L`, `LA`, `RGB` or `RGBA`
    pub mode: String,
    pub width: u32,
    pub height: u32,
    /// Encoded size in bytes
    pub size: u64,
}

/// Result of a successful transformation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedImage {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub file_name: String,
    pub description: String,
    pub storage_key: String,
    pub storage_url: String,
    pub metadata: ImageMetadata,
    pub source_image_id: Uuid,
    pub transformation_task_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a [`TransformedImage`] record.
#[derive(Debug, Clone)]
pub struct NewTransformedImage {
    pub owner_id: Uuid,
    pub file_name: String,
    pub description: String,
    pub storage_key: String,
    pub storage_url: String,
    pub metadata: ImageMetadata,
    pub source_image_id: Uuid,
    pub transformation_task_id: Uuid,
}
