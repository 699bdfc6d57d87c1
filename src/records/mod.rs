//! The master-sheet record store.
//!
//! Reads the canonical spreadsheet into typed [`SensorRecord`]s keyed by
//! (Board ID, Sensor), applying the clean-stage filters on Status, Solution
//! and Voltage. Everything else in the pipeline hangs off this table.

pub mod store;
pub mod types;

pub use store::{LoadSummary, RecordStore, RecordSummary};
pub use types::{
    Age, SatelliteRef, Sensor, SensorKey, SensorRecord, Status, SweepFamily, SweepSample,
    TimeSeriesSample,
};
