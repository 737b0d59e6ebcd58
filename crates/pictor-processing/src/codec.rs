//! Decoding, pixel-mode conversion and encoding

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use pictor_core::models::ImageMetadata;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Cursor;

use crate::error::TransformError;

/// Formats a transformed image can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
}

impl OutputFormat {
    /// Parse a user-supplied format name (`jpg`, `JPEG`, `png`, ...)
    pub fn parse(s: &str) -> Result<Self, TransformError> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "gif" => Ok(OutputFormat::Gif),
            "bmp" => Ok(OutputFormat::Bmp),
            _ => Err(TransformError::invalid_param(format!(
                "unsupported output format '{}'",
                s
            ))),
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            ImageFormat::Png => Some(OutputFormat::Png),
            ImageFormat::WebP => Some(OutputFormat::WebP),
            ImageFormat::Gif => Some(OutputFormat::Gif),
            ImageFormat::Bmp => Some(OutputFormat::Bmp),
            _ => None,
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::WebP => ImageFormat::WebP,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Bmp => ImageFormat::Bmp,
        }
    }

    /// Upper-case name stored in result metadata
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WEBP",
            OutputFormat::Gif => "GIF",
            OutputFormat::Bmp => "BMP",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPEG (ISO 10918)",
            OutputFormat::Png => "Portable network graphics",
            OutputFormat::WebP => "WebP image",
            OutputFormat::Gif => "Compuserve GIF",
            OutputFormat::Bmp => "Windows Bitmap",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Bmp => "bmp",
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Bmp => "image/bmp",
        }
    }

    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Pixel layout of a bitmap, named the way result metadata reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMode {
    L,
    La,
    Rgb,
    Rgba,
}

impl PixelMode {
    pub fn of(img: &DynamicImage) -> Self {
        match img.color() {
            ColorType::L8 | ColorType::L16 => PixelMode::L,
            ColorType::La8 | ColorType::La16 => PixelMode::La,
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => PixelMode::Rgb,
            _ => PixelMode::Rgba,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PixelMode::L => "L",
            PixelMode::La => "LA",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelMode::La | PixelMode::Rgba)
    }
}

/// Decoded source image plus the container format it was sniffed as
pub struct DecodedImage {
    pub image: DynamicImage,
    pub detected_format: Option<ImageFormat>,
}

pub fn decode(data: &[u8]) -> Result<DecodedImage, TransformError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    let detected_format = reader.format();
    let image = reader
        .decode()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    Ok(DecodedImage {
        image,
        detected_format,
    })
}

/// Convert the bitmap into a layout the target encoder accepts.
///
/// JPEG cannot carry alpha, so RGBA is flattened straight to RGB (the alpha
/// channel is discarded, not composited) and LA becomes L.
pub fn prepare_for_format(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    let mode = PixelMode::of(&img);
    match format {
        OutputFormat::Jpeg => match img.color() {
            ColorType::L8 | ColorType::Rgb8 => img,
            _ if mode == PixelMode::L || mode == PixelMode::La => {
                DynamicImage::ImageLuma8(img.to_luma8())
            }
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        },
        OutputFormat::Png => img,
        OutputFormat::WebP | OutputFormat::Bmp => {
            if mode.has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            }
        }
        OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

/// Encode a bitmap already prepared for `format`.
pub fn encode(img: &DynamicImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>, TransformError> {
    let (width, height) = img.dimensions();
    let mut buffer = Vec::with_capacity((width as usize * height as usize * 3) / 4);

    match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100));
            img.write_with_encoder(encoder)
                .map_err(|e| TransformError::failed(format!("JPEG encoding failed: {}", e)))?;
        }
        other => {
            img.write_to(&mut Cursor::new(&mut buffer), other.to_image_format())
                .map_err(|e| {
                    TransformError::failed(format!("{} encoding failed: {}", other, e))
                })?;
        }
    }

    Ok(buffer)
}

/// Metadata describing an encoded result
pub fn extract_metadata(img: &DynamicImage, format: OutputFormat, encoded_len: usize) -> ImageMetadata {
    let (width, height) = img.dimensions();
    ImageMetadata {
        format: format.as_str().to_string(),
        format_description: format.description().to_string(),
        mode: PixelMode::of(img).as_str().to_string(),
        width,
        height,
        size: encoded_len as u64,
    }
}
