//! Transform library
//!
//! Pure bitmap operations: geometry (crop, resize), orientation (rotate, flip,
//! mirror), colour filters and the text watermark. Every function takes an
//! image and returns a new one; none touches I/O, so they are safe to retry.

pub mod filters;
pub mod orientation;
pub mod resize;
pub mod watermark;

pub use filters::{ImageFilters, DEFAULT_BLUR_SIGMA};
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
pub use watermark::{Watermark, WatermarkConfig};
