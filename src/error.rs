//! Error types for the dendrite pipeline.

use thiserror::Error;

use crate::records::types::{Age, Sensor};

/// Unified error type for the record pipeline and image scoring.
///
/// Only [`PipelineError::Data`] is fatal to a whole run. The remaining
/// variants are recovered per record by the augmenter and joiner.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The master spreadsheet is malformed (missing required columns, not CSV).
    #[error("data error: {0}")]
    Data(String),

    /// A satellite file or board scan is absent or unparsable.
    #[error("not found: {0}")]
    NotFound(String),

    /// No crop rectangle is calibrated for this (pattern, sensor) pair.
    #[error("no crop geometry for pattern {pattern:?} sensor {sensor}")]
    Geometry { pattern: Option<i64>, sensor: Sensor },

    /// A score cannot be computed because one of the crops is absent.
    #[error("{0} crop missing, score unavailable")]
    Missing(Age),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn data(message: impl Into<String>) -> Self {
        PipelineError::Data(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        PipelineError::NotFound(what.into())
    }

    /// True for failures that only void one record's derived fields.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::NotFound(_) | PipelineError::Missing(_) | PipelineError::Geometry { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
