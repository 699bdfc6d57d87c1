//! Correlates sensor degradation measurements on IDC test boards with optical
//! evidence of dendrite growth.
//!
//! The pipeline has three stages:
//!
//! 1. **Ingest** ([`records`]): the master sheet becomes a [`RecordStore`] of
//!    typed per-sensor records keyed by (Board ID, Sensor).
//! 2. **Augment** ([`augment`]): board scans are resolved, cropped per sensor
//!    ([`imaging`]) and scored, and the score is written back onto each record.
//! 3. **Join** ([`join`]): records are expanded against their current traces and
//!    CF/CV sweep files for plotting.
//!
//! Missing or malformed satellite files never drop a record; they only leave
//! that record's derived fields empty or exclude it from one join.

pub mod augment;
pub mod config;
pub mod error;
pub mod generate;
pub mod imaging;
pub mod join;
pub mod output;
pub mod records;
pub mod resolve;
pub mod utility;

pub use augment::{AugmentSummary, augment};
pub use config::DataLayout;
pub use error::{PipelineError, Result};
pub use join::{SweepRow, TimeSeriesRow, join_sweep, join_time_series};
pub use records::{RecordStore, SensorKey, SensorRecord};
pub use resolve::FileResolver;
