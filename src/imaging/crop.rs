use image::RgbImage;
use image::imageops;

use crate::error::Result;
use crate::imaging::geometry::crop_fractions;
use crate::records::types::Sensor;

/// Half-open pixel rectangle `[x1, x2) x [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: u32,
    pub x2: u32,
    pub y1: u32,
    pub y2: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Scales a fractional span onto `dim` pixels, keeping at least one pixel
/// inside `[0, dim)` whenever `dim > 0`.
fn span(lo: f64, hi: f64, dim: u32) -> (u32, u32) {
    if dim == 0 {
        return (0, 0);
    }
    let scale = |f: f64| (f * dim as f64).round_ties_even().clamp(0.0, dim as f64) as u32;
    let start = scale(lo).min(dim - 1);
    let end = scale(hi).clamp(start + 1, dim);
    (start, end)
}

/// Pixel bounds of `sensor` on a `width` x `height` scan of `pattern`.
///
/// Scans differ slightly in size, so the fractions are applied to the actual
/// dimensions every time.
pub fn crop_bounds(pattern: Option<i64>, sensor: Sensor, width: u32, height: u32) -> Result<PixelRect> {
    let f = crop_fractions(pattern, sensor)?;
    let (x1, x2) = span(f.x1, f.x2, width);
    let (y1, y2) = span(f.y1, f.y2, height);
    Ok(PixelRect { x1, x2, y1, y2 })
}

/// Cuts `sensor`'s sub-image out of a whole-board scan.
///
/// # Errors
///
/// [`crate::PipelineError::Geometry`] if `(pattern, sensor)` is not calibrated.
pub fn crop(image: &RgbImage, pattern: Option<i64>, sensor: Sensor) -> Result<RgbImage> {
    let rect = crop_bounds(pattern, sensor, image.width(), image.height())?;
    Ok(imageops::crop_imm(image, rect.x1, rect.y1, rect.width(), rect.height()).to_image())
}
