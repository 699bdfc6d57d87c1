use image::RgbImage;
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

use super::{FileResolver, not_found_at};
use crate::error::{PipelineError, Result};
use crate::records::types::Age;

/// A decoded whole-board scan and the file it came from.
#[derive(Debug, Clone)]
pub struct BoardScan {
    pub file_name: String,
    pub image: RgbImage,
}

impl FileResolver {
    /// Finds the scan file for `board_id` in the `age` scan directory.
    ///
    /// Scan names are `{batch}_{pattern}_{id}_{edit-marker}`, so a file matches
    /// when its name is the Board ID followed by `_` or `.`; `B1_1_010_*` is
    /// not a scan of `B1_1_01`. When several files match, the first in
    /// lexicographic order wins; a board scanned more than once therefore
    /// always resolves to the same file, though not necessarily the newest.
    pub fn find_board_scan(&self, board_id: &str, age: Age) -> Result<PathBuf> {
        let dir = self.layout().scans_dir(age);

        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .find(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|name| is_scan_of(name, board_id))
            })
            .map(|e| e.into_path())
            .ok_or_else(|| {
                PipelineError::not_found(format!(
                    "{age} scan for board {board_id} in {}",
                    dir.display()
                ))
            })
    }

    /// Resolves and decodes the `age` scan of `board_id`.
    pub fn resolve_board_image(&self, board_id: &str, age: Age) -> Result<BoardScan> {
        let path = self.find_board_scan(board_id, age)?;
        let image = image::open(&path)
            .map_err(|e| not_found_at(&path, e))?
            .to_rgb8();

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        debug!(
            board_id,
            age = %age,
            file = %file_name,
            width = image.width(),
            height = image.height(),
            "Board scan decoded"
        );

        Ok(BoardScan { file_name, image })
    }
}

fn is_scan_of(file_name: &str, board_id: &str) -> bool {
    file_name
        .strip_prefix(board_id)
        .is_some_and(|rest| rest.starts_with('_') || rest.starts_with('.'))
}
