//! Pictor processing
//!
//! The transform library, the operation registry that validates step
//! descriptors, and the codec layer that decodes sources and encodes results.

pub mod codec;
pub mod error;
pub mod image;
pub mod operation;
pub mod params;
pub mod pipeline;

pub use codec::{OutputFormat, PixelMode};
pub use error::TransformError;
pub use operation::{Operation, OperationRegistry, ResolvedStep};
pub use params::Params;
pub use pipeline::{render, render_blocking, FormatPreference, RenderedImage, TransformChain};
