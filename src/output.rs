//! Flat CSV tables for the record set and the joins.
//!
//! Column names follow the master sheet so the tables can be loaded next to
//! it by the plotting side.

use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::join::{SweepRow, TimeSeriesRow};
use crate::records::{Age, SatelliteRef, Sensor, SensorRecord};

/// One row of the augmented record table.
#[derive(Debug, Serialize)]
pub struct RecordRow<'a> {
    #[serde(rename = "Board ID")]
    pub board_id: &'a str,
    #[serde(rename = "Sensor")]
    pub sensor: Sensor,
    #[serde(rename = "Pattern")]
    pub pattern: Option<i64>,
    #[serde(rename = "Voltage")]
    pub voltage: i64,
    #[serde(rename = "Solution")]
    pub solution: &'a str,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Time to Failure (ms)")]
    pub time_to_failure_ms: Option<f64>,
    #[serde(rename = "Ph")]
    pub ph: Option<f64>,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Current")]
    pub current: Option<String>,
    #[serde(rename = "CF_Baseline")]
    pub cf_baseline: Option<String>,
    #[serde(rename = "CF_Post")]
    pub cf_post: Option<String>,
    #[serde(rename = "CV_Baseline")]
    pub cv_baseline: Option<String>,
    #[serde(rename = "CV_Post")]
    pub cv_post: Option<String>,
    #[serde(rename = "Image_PRISTINE")]
    pub image_pristine: Option<&'a str>,
    #[serde(rename = "Image_EXPOSED")]
    pub image_exposed: Option<&'a str>,
    #[serde(rename = "Dendrite Score")]
    pub dendrite_score: Option<f64>,
    #[serde(rename = "R_PRISTINE")]
    pub r_pristine: Option<f64>,
    #[serde(rename = "G_PRISTINE")]
    pub g_pristine: Option<f64>,
    #[serde(rename = "B_PRISTINE")]
    pub b_pristine: Option<f64>,
    #[serde(rename = "R_EXPOSED")]
    pub r_exposed: Option<f64>,
    #[serde(rename = "G_EXPOSED")]
    pub g_exposed: Option<f64>,
    #[serde(rename = "B_EXPOSED")]
    pub b_exposed: Option<f64>,
}

impl<'a> From<&'a SensorRecord> for RecordRow<'a> {
    fn from(r: &'a SensorRecord) -> Self {
        let text = |v: &Option<SatelliteRef>| v.as_ref().map(SatelliteRef::to_string);
        let d = r.dendrite.as_ref();

        RecordRow {
            board_id: &r.board_id,
            sensor: r.sensor,
            pattern: r.pattern,
            voltage: r.voltage,
            solution: &r.solution,
            status: r.status.as_ref().map(ToString::to_string),
            time_to_failure_ms: r.time_to_failure_ms,
            ph: r.ph,
            date: r.date,
            current: text(&r.current),
            cf_baseline: text(&r.cf_baseline),
            cf_post: text(&r.cf_post),
            cv_baseline: text(&r.cv_baseline),
            cv_post: text(&r.cv_post),
            image_pristine: r.image_for(Age::Pristine),
            image_exposed: r.image_for(Age::Exposed),
            dendrite_score: d.map(|d| d.score),
            r_pristine: d.map(|d| d.pristine.r),
            g_pristine: d.map(|d| d.pristine.g),
            b_pristine: d.map(|d| d.pristine.b),
            r_exposed: d.map(|d| d.exposed.r),
            g_exposed: d.map(|d| d.exposed.g),
            b_exposed: d.map(|d| d.exposed.b),
        }
    }
}

/// One row of the current-vs-time join.
#[derive(Debug, Serialize)]
pub struct TimeSeriesCsvRow<'a> {
    #[serde(rename = "Board ID")]
    pub board_id: &'a str,
    #[serde(rename = "Sensor")]
    pub sensor: Sensor,
    #[serde(rename = "Pattern")]
    pub pattern: Option<i64>,
    #[serde(rename = "Voltage")]
    pub voltage: i64,
    #[serde(rename = "Solution")]
    pub solution: &'a str,
    #[serde(rename = "Dendrite Score")]
    pub dendrite_score: Option<f64>,
    #[serde(rename = "Time (ms)")]
    pub time: f64,
    #[serde(rename = "Current (mA)")]
    pub current: f64,
}

impl<'a> From<&TimeSeriesRow<'a>> for TimeSeriesCsvRow<'a> {
    fn from(row: &TimeSeriesRow<'a>) -> Self {
        let r = row.record;
        TimeSeriesCsvRow {
            board_id: &r.board_id,
            sensor: r.sensor,
            pattern: r.pattern,
            voltage: r.voltage,
            solution: &r.solution,
            dendrite_score: r.dendrite_score(),
            time: row.sample.time,
            current: row.sample.current,
        }
    }
}

/// One value of the sweep join, in long form so files with different
/// columns share a table.
#[derive(Debug, Serialize)]
pub struct SweepCsvRow<'a> {
    #[serde(rename = "Board ID")]
    pub board_id: &'a str,
    #[serde(rename = "Sensor")]
    pub sensor: Sensor,
    #[serde(rename = "Pattern")]
    pub pattern: Option<i64>,
    #[serde(rename = "Voltage")]
    pub voltage: i64,
    #[serde(rename = "Solution")]
    pub solution: &'a str,
    #[serde(rename = "Age")]
    pub age: Age,
    #[serde(rename = "Sample")]
    pub sample: usize,
    #[serde(rename = "Column")]
    pub column: &'a str,
    #[serde(rename = "Value")]
    pub value: f64,
}

/// Expands a sweep row into one CSV row per column.
pub fn sweep_csv_rows<'a>(row: &'a SweepRow<'a>) -> impl Iterator<Item = SweepCsvRow<'a>> + 'a {
    let r = row.record;
    row.columns
        .iter()
        .zip(row.sample.values.iter())
        .map(move |(column, &value)| SweepCsvRow {
            board_id: &r.board_id,
            sensor: r.sensor,
            pattern: r.pattern,
            voltage: r.voltage,
            solution: &r.solution,
            age: row.age,
            sample: row.sample.index,
            column,
            value,
        })
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
///
/// Returns the number of data rows written.
pub fn write_csv<T, I>(path: &Path, rows: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    debug!(path = %path.display(), "Writing CSV table");
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = count, "CSV table written");
    Ok(count)
}

pub fn write_records(path: &Path, records: &[SensorRecord]) -> Result<usize> {
    write_csv(path, records.iter().map(RecordRow::from))
}

pub fn write_time_series(path: &Path, rows: &[TimeSeriesRow<'_>]) -> Result<usize> {
    write_csv(path, rows.iter().map(TimeSeriesCsvRow::from))
}

pub fn write_sweep(path: &Path, rows: &[SweepRow<'_>]) -> Result<usize> {
    write_csv(path, rows.iter().flat_map(sweep_csv_rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ChannelMeans, DendriteScore};
    use crate::records::{Status, SweepSample, TimeSeriesSample};
    use std::fs;
    use std::sync::Arc;

    fn record() -> SensorRecord {
        SensorRecord {
            board_id: "B1_1_01".into(),
            sensor: Sensor::U1,
            pattern: Some(1),
            voltage: 5,
            solution: "DI Water".into(),
            status: Some(Status::Complete),
            time_to_failure_ms: None,
            ph: None,
            date: None,
            current: Some(SatelliteRef::Measured(0.5)),
            cf_baseline: None,
            cf_post: None,
            cv_baseline: None,
            cv_post: None,
            image_pristine: Some("B1_1_01_edited.png".into()),
            image_exposed: None,
            dendrite: None,
        }
    }

    #[test]
    fn test_write_records_header_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");

        let n = write_records(&path, &[record()]).unwrap();
        assert_eq!(n, 1);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Board ID,Sensor,Pattern,Voltage,Solution,Status"));
        assert!(lines[0].contains("Dendrite Score"));
        assert!(lines[1].starts_with("B1_1_01,U1,1,5,DI Water,Complete,,,,0.5,"));
    }

    #[test]
    fn test_record_row_flattens_score() {
        let mut r = record();
        let means = ChannelMeans {
            r: 1.0,
            g: 2.0,
            b: 3.0,
        };
        r.dendrite = Some(DendriteScore {
            score: 0.0,
            pristine: means,
            exposed: means,
        });
        let row = RecordRow::from(&r);
        assert_eq!(row.dendrite_score, Some(0.0));
        assert_eq!(row.b_exposed, Some(3.0));
        assert_eq!(row.image_pristine, Some("B1_1_01_edited.png"));
        assert_eq!(row.image_exposed, None);
    }

    #[test]
    fn test_write_time_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ct.csv");
        let r = record();
        let rows = vec![TimeSeriesRow {
            record: &r,
            sample: TimeSeriesSample {
                time: 1.0,
                current: 0.25,
            },
        }];

        write_time_series(&path, &rows).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("Time (ms),Current (mA)"));
        assert!(content.contains(",1.0,0.25"));
    }

    #[test]
    fn test_sweep_rows_are_long_form() {
        let r = record();
        let row = SweepRow {
            record: &r,
            age: Age::Exposed,
            columns: Arc::from(vec!["Frequency".to_string(), "Capacitance".to_string()]),
            sample: SweepSample {
                index: 4,
                values: vec![100.0, 2.5],
            },
        };
        let flat: Vec<_> = sweep_csv_rows(&row).collect();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].column, "Capacitance");
        assert_eq!(flat[1].value, 2.5);
        assert_eq!(flat[1].sample, 4);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.csv");
        assert_eq!(write_sweep(&path, &[row]).unwrap(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("B1_1_01,U1,1,5,DI Water,EXPOSED,4,Frequency,100.0"));
    }
}
