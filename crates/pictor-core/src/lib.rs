//! Pictor Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by every Pictor component: the transformation task record and its
//! status state machine, source/transformed image records, and the worker
//! configuration loaded from the environment.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{LogFormat, WorkerConfig};
pub use error::{LogLevel, PipelineError, PipelineResult};
pub use storage_types::StorageBackend;
