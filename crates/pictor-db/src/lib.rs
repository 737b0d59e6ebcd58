//! Pictor persistence layer
//!
//! Repository traits for transformation tasks and image records, with a
//! PostgreSQL implementation (sqlx) and an in-memory one.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::InMemoryRepository;
pub use postgres::{connect, PgRepository, TASK_NOTIFY_CHANNEL};
pub use traits::{ImageRepository, TaskRepository};
