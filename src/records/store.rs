use chrono::NaiveDate;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::records::types::{SatelliteRef, Sensor, SensorKey, SensorRecord, Status};
use crate::utility::{parse_int, parse_number};

const COL_BOARD_ID: &str = "Board ID";
const COL_SENSOR: &str = "Sensor";
const COL_PATTERN: &str = "Pattern";
const COL_VOLTAGE: &str = "Voltage";
const COL_SOLUTION: &str = "Solution";
const COL_STATUS: &str = "Status";
const COL_TIME_TO_FAILURE: &str = "Time to Failure (ms)";
const COL_PH: &str = "Ph";
const COL_DATE: &str = "Date";
const COL_CURRENT: &str = "Current";
const COL_CF_BASELINE: &str = "CF_Baseline";
const COL_CF_POST: &str = "CF_Post";
const COL_CV_BASELINE: &str = "CV_Baseline";
const COL_CV_POST: &str = "CV_Post";

const REQUIRED_COLUMNS: &[&str] = &[
    COL_BOARD_ID,
    COL_SENSOR,
    COL_PATTERN,
    COL_VOLTAGE,
    COL_SOLUTION,
    COL_STATUS,
];

/// Counts of rows the clean stage kept and dropped during [`RecordStore::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub kept: usize,
    pub incomplete_status: usize,
    pub missing_solution: usize,
    pub missing_voltage: usize,
    pub unkeyed: usize,
    pub duplicates: usize,
}

/// Counts over the records currently held by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub records: usize,
    pub boards: usize,
    pub with_pattern: usize,
    pub with_current_file: usize,
    pub scored: usize,
}

enum RowOutcome {
    Keep(SensorRecord),
    IncompleteStatus,
    MissingSolution,
    MissingVoltage,
    Unkeyed,
}

/// Header name to column position, after trimming stray whitespace.
struct Columns(HashMap<String, usize>);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        Self(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.trim().to_string(), i))
                .collect(),
        )
    }

    fn check_required(&self) -> Result<()> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.0.contains_key(*c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::data(format!(
                "master sheet is missing required column(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// A non-blank cell, or `None` for blank cells and absent columns.
    fn cell<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        let idx = *self.0.get(name)?;
        row.get(idx).map(str::trim).filter(|s| !s.is_empty())
    }
}

/// The canonical per-sensor record table, keyed by (Board ID, Sensor).
///
/// Built once from the master sheet and passed by reference to the resolvers,
/// augmenter and joins. Records keep the order in which they first appear in
/// the sheet.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<SensorRecord>,
    index: HashMap<SensorKey, usize>,
    load_summary: LoadSummary,
}

impl RecordStore {
    /// Loads and cleans the master sheet at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Data`] if the file cannot be read as CSV or a
    /// required column is absent. Bad values inside rows never fail the load.
    #[tracing::instrument(skip_all)]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PipelineError::data(format!("cannot open master sheet {}: {e}", path.display()))
        })?;
        let store = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            records = store.len(),
            rows_read = store.load_summary.rows_read,
            duplicates = store.load_summary.duplicates,
            "Master sheet loaded"
        );
        Ok(store)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| PipelineError::data(format!("cannot read master sheet header: {e}")))?
            .clone();
        let columns = Columns::from_headers(&headers);
        columns.check_required()?;

        let mut store = RecordStore::default();

        for (line, result) in rdr.records().enumerate() {
            let row =
                result.map_err(|e| PipelineError::data(format!("master sheet row {line}: {e}")))?;
            store.load_summary.rows_read += 1;

            match parse_row(&columns, &row) {
                RowOutcome::Keep(record) => {
                    if !store.insert(record) {
                        store.load_summary.duplicates += 1;
                    }
                }
                RowOutcome::IncompleteStatus => store.load_summary.incomplete_status += 1,
                RowOutcome::MissingSolution => store.load_summary.missing_solution += 1,
                RowOutcome::MissingVoltage => store.load_summary.missing_voltage += 1,
                RowOutcome::Unkeyed => {
                    warn!(line, "Skipping row without a usable Board ID / Sensor");
                    store.load_summary.unkeyed += 1;
                }
            }
        }

        store.load_summary.kept = store.records.len();
        Ok(store)
    }

    /// Inserts unless the key is already present; the first occurrence wins.
    fn insert(&mut self, record: SensorRecord) -> bool {
        let key = record.key();
        if self.index.contains_key(&key) {
            debug!(key = %key, "Duplicate key, keeping first occurrence");
            return false;
        }
        self.index.insert(key, self.records.len());
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[SensorRecord] {
        &self.records
    }

    pub fn get(&self, key: &SensorKey) -> Option<&SensorRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, key: &SensorKey) -> Option<&mut SensorRecord> {
        let i = *self.index.get(key)?;
        self.records.get_mut(i)
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut SensorRecord> {
        self.records.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = SensorKey> + '_ {
        self.records.iter().map(SensorRecord::key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn load_summary(&self) -> &LoadSummary {
        &self.load_summary
    }

    pub fn summary(&self) -> RecordSummary {
        let mut boards: Vec<&str> = self.records.iter().map(|r| r.board_id.as_str()).collect();
        boards.sort_unstable();
        boards.dedup();

        RecordSummary {
            records: self.records.len(),
            boards: boards.len(),
            with_pattern: self.records.iter().filter(|r| r.pattern.is_some()).count(),
            with_current_file: self
                .records
                .iter()
                .filter(|r| r.current.as_ref().and_then(SatelliteRef::file_name).is_some())
                .count(),
            scored: self.records.iter().filter(|r| r.dendrite.is_some()).count(),
        }
    }
}

fn parse_row(columns: &Columns, row: &StringRecord) -> RowOutcome {
    // clean-stage filters first; these are the only reasons a keyed row is dropped
    let status = columns.cell(row, COL_STATUS).map(Status::parse);
    if status.as_ref().is_some_and(Status::is_incomplete) {
        return RowOutcome::IncompleteStatus;
    }
    let Some(solution) = columns.cell(row, COL_SOLUTION) else {
        return RowOutcome::MissingSolution;
    };
    let Some(voltage) = columns.cell(row, COL_VOLTAGE).and_then(parse_int) else {
        return RowOutcome::MissingVoltage;
    };

    let Some(board_id) = columns.cell(row, COL_BOARD_ID) else {
        return RowOutcome::Unkeyed;
    };
    let Some(sensor) = columns
        .cell(row, COL_SENSOR)
        .and_then(|s| s.parse::<Sensor>().ok())
    else {
        return RowOutcome::Unkeyed;
    };

    let satellite = |name: &str| columns.cell(row, name).and_then(SatelliteRef::parse);

    RowOutcome::Keep(SensorRecord {
        board_id: board_id.to_string(),
        sensor,
        pattern: columns.cell(row, COL_PATTERN).and_then(parse_int),
        voltage,
        solution: solution.to_string(),
        status,
        time_to_failure_ms: columns.cell(row, COL_TIME_TO_FAILURE).and_then(parse_number),
        ph: columns.cell(row, COL_PH).and_then(parse_number),
        date: columns.cell(row, COL_DATE).and_then(parse_date),
        current: satellite(COL_CURRENT),
        cf_baseline: satellite(COL_CF_BASELINE),
        cf_post: satellite(COL_CF_POST),
        cv_baseline: satellite(COL_CV_BASELINE),
        cv_post: satellite(COL_CV_POST),
        image_pristine: None,
        image_exposed: None,
        dendrite: None,
    })
}

/// The sheet is hand-edited, so accept US and ISO date forms.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}
