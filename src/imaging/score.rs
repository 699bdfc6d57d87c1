use image::RgbImage;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::records::types::Age;

/// Mean intensity of each colour channel over an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelMeans {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl ChannelMeans {
    /// `None` for an image with no pixels.
    pub fn of(image: &RgbImage) -> Option<Self> {
        let count = image.width() as u64 * image.height() as u64;
        if count == 0 {
            return None;
        }

        let mut sums = [0u64; 3];
        for pixel in image.pixels() {
            for (sum, &channel) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += channel as u64;
            }
        }

        let n = count as f64;
        Some(Self {
            r: sums[0] as f64 / n,
            g: sums[1] as f64 / n,
            b: sums[2] as f64 / n,
        })
    }

    /// Euclidean distance between the two mean colours.
    pub fn distance(&self, other: &ChannelMeans) -> f64 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Colour shift between a sensor's pristine and exposed crops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DendriteScore {
    pub score: f64,
    pub pristine: ChannelMeans,
    pub exposed: ChannelMeans,
}

/// Scores a pristine/exposed crop pair.
///
/// The score is the distance between the two mean colours. It is a coarse
/// proxy for visible growth, not a pixel-level diff: spatially rearranged
/// pixels with the same mean score zero.
///
/// # Errors
///
/// [`PipelineError::Missing`] if either crop is absent or empty.
pub fn score(pristine: Option<&RgbImage>, exposed: Option<&RgbImage>) -> Result<DendriteScore> {
    let pristine = pristine
        .and_then(ChannelMeans::of)
        .ok_or(PipelineError::Missing(Age::Pristine))?;
    let exposed = exposed
        .and_then(ChannelMeans::of)
        .ok_or(PipelineError::Missing(Age::Exposed))?;

    Ok(DendriteScore {
        score: pristine.distance(&exposed),
        pristine,
        exposed,
    })
}
