use tracing::debug;

use super::{FileResolver, read_numeric_csv};
use crate::error::{PipelineError, Result};
use crate::records::types::{SatelliteRef, TimeSeriesSample};

impl FileResolver {
    /// Resolves the raw `Current` cell of a record into its current-vs-time trace.
    ///
    /// A numeric literal is a directly measured current, not a file, and is
    /// reported as [`PipelineError::NotFound`] just like a blank cell or an
    /// absent file.
    pub fn resolve_time_series(&self, reference: &str) -> Result<Vec<TimeSeriesSample>> {
        match SatelliteRef::parse(reference) {
            Some(r) => self.time_series_for(&r),
            None => Err(PipelineError::not_found("blank current reference")),
        }
    }

    /// Typed form of [`FileResolver::resolve_time_series`].
    pub fn time_series_for(&self, reference: &SatelliteRef) -> Result<Vec<TimeSeriesSample>> {
        let file_name = match reference {
            SatelliteRef::File(name) => name,
            SatelliteRef::Measured(v) => {
                return Err(PipelineError::not_found(format!(
                    "current {v} is a measured value, not a file"
                )));
            }
        };

        let path = self.layout().current_time_dir().join(file_name);
        let table = read_numeric_csv(&path)?;
        if table.columns.len() < 2 {
            return Err(PipelineError::not_found(format!(
                "{}: expected Time and Current columns",
                path.display()
            )));
        }

        debug!(
            file = %file_name,
            samples = table.rows.len(),
            dropped = table.dropped,
            "Current trace read"
        );

        Ok(table
            .rows
            .into_iter()
            .map(|(_, values)| TimeSeriesSample {
                time: values[0],
                current: values[1],
            })
            .collect())
    }
}
