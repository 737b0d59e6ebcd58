//! Colour and smoothing filters.

use image::{DynamicImage, Rgb, RgbImage};
use serde_json::Value;

use crate::error::TransformError;
use crate::params::Params;

/// Gaussian sigma used by the `blur` operation
pub const DEFAULT_BLUR_SIGMA: f32 = 2.0;

const SEPIA_MATRIX: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

pub struct ImageFilters;

impl ImageFilters {
    /// Single-channel luminance. Alpha is dropped.
    pub fn grayscale(img: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(img.to_luma8())
    }

    /// Classic sepia tone. Works on RGB, so grayscale and alpha inputs are
    /// widened/flattened first.
    pub fn sepia(img: &DynamicImage) -> DynamicImage {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let toned = RgbImage::from_fn(width, height, |x, y| {
            let Rgb([r, g, b]) = *rgb.get_pixel(x, y);
            let (r, g, b) = (r as f32, g as f32, b as f32);
            let channel = |row: [f32; 3]| (row[0] * r + row[1] * g + row[2] * b).round().clamp(0.0, 255.0) as u8;
            Rgb([
                channel(SEPIA_MATRIX[0]),
                channel(SEPIA_MATRIX[1]),
                channel(SEPIA_MATRIX[2]),
            ])
        });
        DynamicImage::ImageRgb8(toned)
    }

    /// Gaussian blur. Non-positive sigma leaves the image unchanged.
    pub fn blur(img: &DynamicImage, sigma: f32) -> DynamicImage {
        if sigma <= 0.0 {
            return img.clone();
        }
        img.blur(sigma)
    }

    /// Apply every filter named in `params`, in name order.
    ///
    /// `false` skips a filter and `true` applies it; `blur` also accepts a
    /// positive number, used as the sigma.
    pub fn apply_set(img: DynamicImage, params: &Params<'_>) -> Result<DynamicImage, TransformError> {
        let mut img = img;

        for (name, value) in params.sorted_entries() {
            let filter = FilterKind::from_name(name)?;
            let Some(setting) = FilterSetting::from_value(filter, value)? else {
                continue;
            };
            tracing::debug!(filter = name, "Applying filter");
            img = match (filter, setting) {
                (FilterKind::Blur, FilterSetting::Sigma(sigma)) => Self::blur(&img, sigma),
                (FilterKind::Blur, FilterSetting::Default) => Self::blur(&img, DEFAULT_BLUR_SIGMA),
                (FilterKind::Grayscale, _) => Self::grayscale(&img),
                (FilterKind::Sepia, _) => Self::sepia(&img),
            };
        }

        Ok(img)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    Blur,
    Grayscale,
    Sepia,
}

impl FilterKind {
    fn from_name(name: &str) -> Result<Self, TransformError> {
        match name.trim().to_lowercase().as_str() {
            "blur" => Ok(FilterKind::Blur),
            "grayscale" | "greyscale" => Ok(FilterKind::Grayscale),
            "sepia" => Ok(FilterKind::Sepia),
            _ => Err(TransformError::InvalidTransformation(format!(
                "unknown filter '{}'",
                name
            ))),
        }
    }
}

enum FilterSetting {
    Default,
    Sigma(f32),
}

impl FilterSetting {
    /// `None` means the filter is switched off.
    fn from_value(filter: FilterKind, value: &Value) -> Result<Option<Self>, TransformError> {
        match value {
            Value::Bool(false) | Value::Null => Ok(None),
            Value::Bool(true) => Ok(Some(FilterSetting::Default)),
            Value::Number(n) if filter == FilterKind::Blur => match n.as_f64() {
                Some(sigma) if sigma > 0.0 && sigma.is_finite() => {
                    Ok(Some(FilterSetting::Sigma(sigma as f32)))
                }
                _ => Err(TransformError::invalid_param(
                    "blur radius must be a positive number",
                )),
            },
            _ => Err(TransformError::invalid_param(format!(
                "filter {:?} expects a boolean",
                filter
            ))),
        }
    }
}
