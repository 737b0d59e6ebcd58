//! Data models shared by the pipeline crates

mod image;
mod task;

pub use image::*;
pub use task::*;
