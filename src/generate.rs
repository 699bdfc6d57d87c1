//! Offline generation of per-sensor crop images.
//!
//! Decoding full board scans is slow, so the crops are written once into the
//! `Imgscans_{AGE}_sensors` directories and reused by later inspection.

use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::imaging::crop;
use crate::records::{Age, RecordStore, Sensor, SensorRecord};
use crate::resolve::FileResolver;

/// Counts from one [`generate_sensor_crops`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub written: usize,
    pub failed: usize,
}

/// `{Board ID}_{000|001}_{Sensor}.jpg`
pub fn crop_file_name(board_id: &str, age: Age, sensor: Sensor) -> String {
    format!("{board_id}_{}_{sensor}.jpg", age.file_code())
}

/// Writes the pristine and exposed crop of every record.
///
/// A record whose scan is missing or whose pattern is uncalibrated is logged
/// and counted as failed; the remaining crops are still written.
///
/// # Errors
///
/// Only if an output directory cannot be created.
#[tracing::instrument(skip_all)]
pub fn generate_sensor_crops(store: &RecordStore, resolver: &FileResolver) -> Result<GenerateSummary> {
    for age in Age::ALL {
        fs::create_dir_all(resolver.layout().sensors_dir(age))?;
    }

    let written = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let jobs: Vec<(&SensorRecord, Age)> = Age::ALL
        .iter()
        .flat_map(|&age| store.records().iter().map(move |r| (r, age)))
        .collect();

    jobs.par_iter().for_each(|&(record, age)| {
        match write_crop(resolver, record, age) {
            Ok(path) => {
                let n = written.fetch_add(1, Ordering::Relaxed) + 1;
                if n % 100 == 0 {
                    info!(generated = n, "Sensor crops written");
                }
                debug!(path = %path.display(), "Crop written");
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                warn!(key = %record.key(), age = %age, error = %e, "Crop not generated");
            }
        }
    });

    let summary = GenerateSummary {
        written: written.into_inner(),
        failed: failed.into_inner(),
    };
    info!(
        written = summary.written,
        failed = summary.failed,
        "Sensor crop generation complete"
    );
    Ok(summary)
}

fn write_crop(resolver: &FileResolver, record: &SensorRecord, age: Age) -> Result<PathBuf> {
    let scan = resolver.resolve_board_image(&record.board_id, age)?;
    let cropped = crop(&scan.image, record.pattern, record.sensor)?;
    let path = resolver
        .layout()
        .sensors_dir(age)
        .join(crop_file_name(&record.board_id, age, record.sensor));
    cropped.save(&path)?;
    Ok(path)
}
