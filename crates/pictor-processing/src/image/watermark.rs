use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use super::orientation::ImageOrientation;
use crate::error::TransformError;

const GLYPH_SIZE: u32 = 8;
const FALLBACK_GLYPH: char = '?';

/// Text watermark configuration
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    pub text: String,
    /// Stroke colour; the alpha channel sets the opacity
    pub color: Rgba<u8>,
    /// Counter-clockwise angle of the text baseline
    pub angle_degrees: f64,
    /// Share of the image diagonal the text should span
    pub diagonal_coverage: f64,
}

impl WatermarkConfig {
    pub fn diagonal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: Rgba([255, 255, 255, 128]),
            angle_degrees: 45.0,
            diagonal_coverage: 0.6,
        }
    }
}

pub struct Watermark;

impl Watermark {
    /// Draw the configured text across the centre of the image.
    ///
    /// Output is always RGBA.
    pub fn apply(img: DynamicImage, config: &WatermarkConfig) -> Result<DynamicImage, TransformError> {
        let text = config.text.trim();
        if text.is_empty() {
            return Err(TransformError::invalid_param(
                "watermark text must not be empty",
            ));
        }

        let (img_width, img_height) = img.dimensions();
        let diagonal = ((img_width as f64).powi(2) + (img_height as f64).powi(2)).sqrt();
        let char_count = text.chars().count() as f64;
        let scale = ((diagonal * config.diagonal_coverage) / (char_count * GLYPH_SIZE as f64))
            .floor()
            .max(1.0) as u32;

        let stamp = Self::render_text(text, scale, config.color);
        let stamp = ImageOrientation::rotate_expanded(&stamp, config.angle_degrees);

        let x = (img_width as i64 - stamp.width() as i64) / 2;
        let y = (img_height as i64 - stamp.height() as i64) / 2;

        // Convert main image to RGBA if needed
        let mut img_rgba = img.to_rgba8();
        Self::blend(&mut img_rgba, &stamp, x, y);

        Ok(DynamicImage::ImageRgba8(img_rgba))
    }

    /// Source-over composite of `stamp` at (`x`, `y`). The result is never
    /// more transparent than the background pixel it covers.
    fn blend(dst: &mut RgbaImage, stamp: &RgbaImage, x: i64, y: i64) {
        let (width, height) = (dst.width() as i64, dst.height() as i64);
        for (sx, sy, src) in stamp.enumerate_pixels() {
            let (dx, dy) = (x + sx as i64, y + sy as i64);
            if src[3] == 0 || dx < 0 || dy < 0 || dx >= width || dy >= height {
                continue;
            }
            let pixel = dst.get_pixel_mut(dx as u32, dy as u32);
            let src_alpha = src[3] as f32 / 255.0;
            let dst_alpha = pixel[3] as f32 / 255.0;
            let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);
            for c in 0..3 {
                let blended = (src[c] as f32 * src_alpha
                    + pixel[c] as f32 * dst_alpha * (1.0 - src_alpha))
                    / out_alpha;
                pixel[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
            pixel[3] = ((out_alpha * 255.0).round().clamp(0.0, 255.0) as u8).max(pixel[3]);
        }
    }

    /// Rasterise `text` with the 8x8 bitmap font, each font pixel drawn as a
    /// `scale` x `scale` block.
    fn render_text(text: &str, scale: u32, color: Rgba<u8>) -> RgbaImage {
        let cell = GLYPH_SIZE * scale;
        let glyphs: Vec<[u8; 8]> = text
            .chars()
            .map(|c| {
                BASIC_FONTS
                    .get(c)
                    .or_else(|| BASIC_FONTS.get(FALLBACK_GLYPH))
                    .unwrap_or([0; 8])
            })
            .collect();

        let mut canvas = RgbaImage::from_pixel(cell * glyphs.len() as u32, cell, Rgba([0, 0, 0, 0]));
        for (index, glyph) in glyphs.iter().enumerate() {
            let origin_x = index as u32 * cell;
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_SIZE {
                    // Bit 0 is the leftmost column
                    if bits & (1 << col) == 0 {
                        continue;
                    }
                    let px = origin_x + col * scale;
                    let py = row as u32 * scale;
                    for dy in 0..scale {
                        for dx in 0..scale {
                            canvas.put_pixel(px + dx, py + dy, color);
                        }
                    }
                }
            }
        }
        canvas
    }
}
