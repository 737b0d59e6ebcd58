//! Pictor Infrastructure Library
//!
//! Shared process plumbing for Pictor binaries:
//! - Tracing subscriber initialisation
//! - Shutdown signal handling

pub mod shutdown;
pub mod telemetry;

pub use shutdown::shutdown_signal;
pub use telemetry::init_telemetry;
