//! Image-to-scalar feature extraction.
//!
//! A whole-board scan is cut into per-sensor crops using a fixed table of
//! normalized rectangles ([`geometry`], [`crop`]), and a pristine/exposed
//! crop pair is reduced to a single colour-shift score ([`score`]).

pub mod crop;
pub mod geometry;
pub mod score;
pub mod table;

pub use crop::{PixelRect, crop, crop_bounds};
pub use geometry::{CropFractions, KNOWN_PATTERNS, crop_fractions};
pub use score::{ChannelMeans, DendriteScore, score};
pub use table::{ImageChannelMeans, channel_mean_table};
