use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate counter-clockwise by `degrees`.
    ///
    /// Multiples of 90 are lossless pixel shuffles. Any other angle is rendered
    /// onto a canvas large enough for the rotated bounding box, so no content is
    /// cropped; the uncovered corners are transparent and the result is RGBA.
    pub fn rotate(img: DynamicImage, degrees: f64) -> DynamicImage {
        let normalized = degrees.rem_euclid(360.0);

        if normalized.abs() < f64::EPSILON {
            return img;
        }
        if (normalized - 90.0).abs() < f64::EPSILON {
            return img.rotate270();
        }
        if (normalized - 180.0).abs() < f64::EPSILON {
            return img.rotate180();
        }
        if (normalized - 270.0).abs() < f64::EPSILON {
            return img.rotate90();
        }

        DynamicImage::ImageRgba8(Self::rotate_expanded(&img.to_rgba8(), normalized))
    }

    /// Arbitrary-angle rotation with canvas expansion, transparent fill.
    pub(crate) fn rotate_expanded(src: &RgbaImage, degrees_ccw: f64) -> RgbaImage {
        let (w, h) = src.dimensions();
        let radians = degrees_ccw.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());

        // Shave float noise so an exact fit does not grow by a pixel.
        let new_w = ((w as f64 * cos + h as f64 * sin) - 1e-6).ceil().max(1.0) as u32;
        let new_h = ((w as f64 * sin + h as f64 * cos) - 1e-6).ceil().max(1.0) as u32;

        let mut canvas = RgbaImage::from_pixel(new_w, new_h, Rgba([0, 0, 0, 0]));
        let offset_x = (new_w.saturating_sub(w) / 2) as i64;
        let offset_y = (new_h.saturating_sub(h) / 2) as i64;
        imageops::replace(&mut canvas, src, offset_x, offset_y);

        // imageproc rotates clockwise for positive theta.
        rotate_about_center(
            &canvas,
            -(radians as f32),
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        )
    }

    /// Top-to-bottom flip
    pub fn flip(img: DynamicImage) -> DynamicImage {
        img.flipv()
    }

    /// Left-to-right mirror
    pub fn mirror(img: DynamicImage) -> DynamicImage {
        img.fliph()
    }
}
