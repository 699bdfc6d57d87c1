//! Data types shared by the record store, resolvers and joins.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::imaging::score::DendriteScore;
use crate::utility::parse_number;

/// One of the four fixed test structures on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Sensor {
    U1,
    U2,
    U3,
    U4,
}

impl Sensor {
    pub const ALL: [Sensor; 4] = [Sensor::U1, Sensor::U2, Sensor::U3, Sensor::U4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensor::U1 => "U1",
            Sensor::U2 => "U2",
            Sensor::U3 => "U3",
            Sensor::U4 => "U4",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "U1" => Ok(Sensor::U1),
            "U2" => Ok(Sensor::U2),
            "U3" => Ok(Sensor::U3),
            "U4" => Ok(Sensor::U4),
            other => Err(format!("unknown sensor '{other}'")),
        }
    }
}

/// Before/after state of a board relative to submersion testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Age {
    #[serde(rename = "PRISTINE")]
    Pristine,
    #[serde(rename = "EXPOSED")]
    Exposed,
}

impl Age {
    pub const ALL: [Age; 2] = [Age::Pristine, Age::Exposed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Age::Pristine => "PRISTINE",
            Age::Exposed => "EXPOSED",
        }
    }

    /// Iteration number 0 is the pristine measurement, anything else is post-exposure.
    pub fn from_iteration(iteration: i64) -> Self {
        if iteration == 0 {
            Age::Pristine
        } else {
            Age::Exposed
        }
    }

    /// Marker used in generated crop file names.
    pub fn file_code(&self) -> &'static str {
        match self {
            Age::Pristine => "000",
            Age::Exposed => "001",
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test progress recorded in the master sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Complete,
    InProgress,
    NotStarted,
    Other(String),
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_ascii_lowercase();
        if lower.contains("in progress") {
            Status::InProgress
        } else if lower.contains("not started") {
            Status::NotStarted
        } else if lower == "complete" || lower == "completed" {
            Status::Complete
        } else {
            Status::Other(raw.trim().to_string())
        }
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, Status::InProgress | Status::NotStarted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Complete => f.write_str("Complete"),
            Status::InProgress => f.write_str("In progress"),
            Status::NotStarted => f.write_str("Not started"),
            Status::Other(s) => f.write_str(s),
        }
    }
}

/// A master-sheet cell that points at satellite data.
///
/// Some rows carry a directly measured number instead of a file name, so the
/// two are kept apart rather than treating every non-file as missing.
#[derive(Debug, Clone, PartialEq)]
pub enum SatelliteRef {
    Measured(f64),
    File(String),
}

impl SatelliteRef {
    /// Returns `None` for blank or NaN cells.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return None;
        }
        match parse_number(trimmed) {
            Some(v) => Some(SatelliteRef::Measured(v)),
            None => Some(SatelliteRef::File(trimmed.to_string())),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            SatelliteRef::File(name) => Some(name),
            SatelliteRef::Measured(_) => None,
        }
    }
}

impl fmt::Display for SatelliteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatelliteRef::Measured(v) => write!(f, "{v}"),
            SatelliteRef::File(name) => f.write_str(name),
        }
    }
}

/// Sweep measurement family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SweepFamily {
    CF,
    CV,
}

impl SweepFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepFamily::CF => "CF",
            SweepFamily::CV => "CV",
        }
    }
}

impl fmt::Display for SweepFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SweepFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CF" => Ok(SweepFamily::CF),
            "CV" => Ok(SweepFamily::CV),
            other => Err(format!("unknown sweep family '{other}'")),
        }
    }
}

/// Primary key of the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorKey {
    pub board_id: String,
    pub sensor: Sensor,
}

impl SensorKey {
    pub fn new(board_id: impl Into<String>, sensor: Sensor) -> Self {
        Self {
            board_id: board_id.into(),
            sensor,
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.board_id, self.sensor)
    }
}

/// One sensor on one board, as read from the master sheet and enriched by
/// the augmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    pub board_id: String,
    pub sensor: Sensor,
    pub pattern: Option<i64>,
    pub voltage: i64,
    pub solution: String,
    pub status: Option<Status>,
    pub time_to_failure_ms: Option<f64>,
    pub ph: Option<f64>,
    pub date: Option<NaiveDate>,

    // satellite references
    pub current: Option<SatelliteRef>,
    pub cf_baseline: Option<SatelliteRef>,
    pub cf_post: Option<SatelliteRef>,
    pub cv_baseline: Option<SatelliteRef>,
    pub cv_post: Option<SatelliteRef>,

    // derived by the augmenter; image names are board scan files
    pub image_pristine: Option<String>,
    pub image_exposed: Option<String>,
    pub dendrite: Option<DendriteScore>,
}

impl SensorRecord {
    pub fn key(&self) -> SensorKey {
        SensorKey::new(self.board_id.clone(), self.sensor)
    }

    /// The Baseline column feeds the pristine sweep, Post the exposed one.
    pub fn sweep_ref(&self, family: SweepFamily, age: Age) -> Option<&SatelliteRef> {
        match (family, age) {
            (SweepFamily::CF, Age::Pristine) => self.cf_baseline.as_ref(),
            (SweepFamily::CF, Age::Exposed) => self.cf_post.as_ref(),
            (SweepFamily::CV, Age::Pristine) => self.cv_baseline.as_ref(),
            (SweepFamily::CV, Age::Exposed) => self.cv_post.as_ref(),
        }
    }

    pub fn image_for(&self, age: Age) -> Option<&str> {
        match age {
            Age::Pristine => self.image_pristine.as_deref(),
            Age::Exposed => self.image_exposed.as_deref(),
        }
    }

    pub fn dendrite_score(&self) -> Option<f64> {
        self.dendrite.as_ref().map(|d| d.score)
    }

    pub(crate) fn clear_derived(&mut self) {
        self.image_pristine = None;
        self.image_exposed = None;
        self.dendrite = None;
    }
}

/// A (Time, Current) row from a current-vs-time trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeSeriesSample {
    pub time: f64,
    pub current: f64,
}

/// One numeric row of a CF/CV sweep file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSample {
    pub index: usize,
    pub values: Vec<f64>,
}
