use serde::Serialize;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{PipelineError, Result};
use crate::imaging::score::ChannelMeans;
use crate::utility::round_to;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Per-image mean colour, one row of the channel-mean table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageChannelMeans {
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Mean_R")]
    pub mean_r: f64,
    #[serde(rename = "Mean_G")]
    pub mean_g: f64,
    #[serde(rename = "Mean_B")]
    pub mean_b: f64,
}

/// Mean R/G/B, rounded to two decimals, of every image directly inside `dir`.
///
/// Images that fail to decode are logged and left out.
pub fn channel_mean_table(dir: &Path) -> Result<Vec<ImageChannelMeans>> {
    if !dir.is_dir() {
        return Err(PipelineError::not_found(format!(
            "image directory {}",
            dir.display()
        )));
    }

    let mut rows = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_image {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let means = match image::open(path) {
            Ok(img) => ChannelMeans::of(&img.to_rgb8()),
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to load image");
                continue;
            }
        };
        let Some(means) = means else {
            warn!(file = %name, "Image has no pixels");
            continue;
        };

        rows.push(ImageChannelMeans {
            image: name,
            mean_r: round_to(means.r, 2),
            mean_g: round_to(means.g, 2),
            mean_b: round_to(means.b, 2),
        });
    }

    Ok(rows)
}
