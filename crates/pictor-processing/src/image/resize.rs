use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::error::TransformError;

/// Region selection and scaling
pub struct ImageResize;

impl ImageResize {
    /// Cut the `width` x `height` box whose top-left corner is (`x`, `y`).
    ///
    /// The box must be non-empty and lie entirely inside the image.
    pub fn crop(
        img: &DynamicImage,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, TransformError> {
        if width == 0 || height == 0 {
            return Err(TransformError::invalid_param(
                "crop width and height must be positive",
            ));
        }

        let (img_width, img_height) = img.dimensions();
        if x as u64 + width as u64 > img_width as u64 || y as u64 + height as u64 > img_height as u64
        {
            return Err(TransformError::invalid_param(format!(
                "crop box ({}, {}, {}, {}) exceeds image bounds {}x{}",
                x, y, width, height, img_width, img_height
            )));
        }

        Ok(img.crop_imm(x, y, width, height))
    }

    /// Scale to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, TransformError> {
        if width == 0 || height == 0 {
            return Err(TransformError::invalid_param(
                "resize width and height must be positive",
            ));
        }

        let (src_width, src_height) = img.dimensions();
        if (src_width, src_height) == (width, height) {
            return Ok(img.clone());
        }

        Ok(img.resize_exact(width, height, Self::select_filter(src_width, src_height, width, height)))
    }

    /// Lanczos3 when shrinking, CatmullRom when enlarging
    pub fn select_filter(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> FilterType {
        let src_pixels = src_w as u64 * src_h as u64;
        let dst_pixels = dst_w as u64 * dst_h as u64;
        if dst_pixels < src_pixels {
            FilterType::Lanczos3
        } else {
            FilterType::CatmullRom
        }
    }
}
