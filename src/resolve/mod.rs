//! Resolvers for the satellite files referenced by the master sheet.
//!
//! Three families are located purely by naming convention: current-vs-time
//! traces, CF/CV sweep files, and whole-board scan images. A missing or
//! unparsable file is always reported as [`PipelineError::NotFound`] so the
//! caller can leave one record's fields empty and carry on.

mod board_image;
mod sweep;
mod time_series;

pub use board_image::BoardScan;
pub use sweep::{SweepFile, SweepKey};

use std::fmt::Display;
use std::fs::File;
use std::path::Path;

use crate::config::DataLayout;
use crate::error::{PipelineError, Result};
use crate::utility::parse_number;

/// Looks up satellite files under a [`DataLayout`].
#[derive(Debug, Clone)]
pub struct FileResolver {
    layout: DataLayout,
}

impl FileResolver {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }
}

/// A CSV whose surviving rows are entirely numeric.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumericTable {
    pub columns: Vec<String>,
    /// (data row number in the file, values)
    pub rows: Vec<(usize, Vec<f64>)>,
    pub dropped: usize,
}

/// Reads a headed CSV, coercing every cell to a number and dropping rows that
/// do not coerce, are not UTF-8, or have the wrong width.
pub(crate) fn read_numeric_csv(path: &Path) -> Result<NumericTable> {
    let file = File::open(path).map_err(|e| not_found_at(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| not_found_at(path, e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if columns.is_empty() {
        return Err(PipelineError::not_found(format!(
            "{}: no columns",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    let mut dropped = 0;

    for (row_number, result) in rdr.byte_records().enumerate() {
        let record = result.map_err(|e| not_found_at(path, e))?;
        if record.len() != columns.len() {
            dropped += 1;
            continue;
        }
        match record.iter().map(numeric_cell).collect::<Option<Vec<f64>>>() {
            Some(values) => rows.push((row_number, values)),
            None => dropped += 1,
        }
    }

    Ok(NumericTable {
        columns,
        rows,
        dropped,
    })
}

fn numeric_cell(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw).ok().and_then(parse_number)
}

pub(crate) fn not_found_at(path: &Path, e: impl Display) -> PipelineError {
    PipelineError::not_found(format!("{}: {e}", path.display()))
}
