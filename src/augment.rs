//! Attaches board-scan references and dendrite scores to the record store.
//!
//! Records are grouped by board so each scan is decoded once per age and then
//! cropped for every sensor on that board. Boards are processed on the rayon
//! pool; results come back tagged with their [`SensorKey`] and are written to
//! the store by key.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::imaging::{DendriteScore, crop, score};
use crate::records::{Age, RecordStore, Sensor, SensorKey};
use crate::resolve::{BoardScan, FileResolver};
use crate::utility::mean;

/// Counts from one [`augment`] run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AugmentSummary {
    pub records: usize,
    pub boards: usize,
    pub scored: usize,
    pub missing_images: usize,
    pub geometry_errors: usize,
    pub other_errors: usize,
    pub mean_score: Option<f64>,
}

struct SensorOutcome {
    key: SensorKey,
    image_pristine: Option<String>,
    image_exposed: Option<String>,
    score: Result<DendriteScore>,
}

/// Recomputes Image_PRISTINE / Image_EXPOSED and the dendrite score of every
/// record.
///
/// Image_PRISTINE / Image_EXPOSED name the whole-board scan the score was
/// cropped from, so every sensor on a board carries the same value. The
/// per-sensor crop files are only written by
/// [`generate_sensor_crops`](crate::generate::generate_sensor_crops) and need
/// not exist when augmenting.
///
/// Never fails as a whole: a record whose scans are missing or whose pattern
/// has no crop geometry simply ends up with empty derived fields. Running it
/// twice gives the same store.
#[tracing::instrument(skip_all)]
pub fn augment(store: &mut RecordStore, resolver: &FileResolver) -> AugmentSummary {
    for record in store.records_mut() {
        record.clear_derived();
    }

    let mut boards: BTreeMap<&str, Vec<(Sensor, Option<i64>)>> = BTreeMap::new();
    for record in store.records() {
        boards
            .entry(record.board_id.as_str())
            .or_default()
            .push((record.sensor, record.pattern));
    }
    let boards: Vec<_> = boards.into_iter().collect();

    info!(
        records = store.len(),
        boards = boards.len(),
        "Augmenting records with board scans"
    );

    let outcomes: Vec<SensorOutcome> = boards
        .par_iter()
        .flat_map_iter(|(board_id, sensors)| augment_board(resolver, board_id, sensors))
        .collect();

    let mut summary = AugmentSummary {
        records: store.len(),
        boards: boards.len(),
        ..Default::default()
    };
    let mut scores = Vec::new();

    for outcome in outcomes {
        match &outcome.score {
            Ok(s) => {
                summary.scored += 1;
                scores.push(s.score);
            }
            Err(PipelineError::Missing(_)) => summary.missing_images += 1,
            Err(PipelineError::Geometry { .. }) => summary.geometry_errors += 1,
            Err(e) => {
                summary.other_errors += 1;
                if !e.is_recoverable() {
                    warn!(key = %outcome.key, error = %e, "Scoring failed");
                }
            }
        }

        let Some(record) = store.get_mut(&outcome.key) else {
            continue;
        };
        record.image_pristine = outcome.image_pristine;
        record.image_exposed = outcome.image_exposed;
        record.dendrite = outcome.score.ok();
    }

    if !scores.is_empty() {
        summary.mean_score = Some(mean(&scores));
    }

    info!(
        scored = summary.scored,
        missing_images = summary.missing_images,
        geometry_errors = summary.geometry_errors,
        "Augmentation complete"
    );
    summary
}

fn augment_board(
    resolver: &FileResolver,
    board_id: &str,
    sensors: &[(Sensor, Option<i64>)],
) -> Vec<SensorOutcome> {
    let _span = tracing::debug_span!("augment_board", board_id).entered();

    let [pristine, exposed] = Age::ALL.map(|age| {
        resolver
            .resolve_board_image(board_id, age)
            .inspect_err(|e| debug!(age = %age, error = %e, "Board scan unavailable"))
            .ok()
    });

    sensors
        .iter()
        .map(|&(sensor, pattern)| {
            let score = crop_and_score(pristine.as_ref(), exposed.as_ref(), pattern, sensor);
            if let Err(e @ PipelineError::Geometry { .. }) = &score {
                warn!(sensor = %sensor, error = %e, "Cannot crop sensor");
            }
            SensorOutcome {
                key: SensorKey::new(board_id, sensor),
                image_pristine: pristine.as_ref().map(|s| s.file_name.clone()),
                image_exposed: exposed.as_ref().map(|s| s.file_name.clone()),
                score,
            }
        })
        .collect()
}

fn crop_and_score(
    pristine: Option<&BoardScan>,
    exposed: Option<&BoardScan>,
    pattern: Option<i64>,
    sensor: Sensor,
) -> Result<DendriteScore> {
    let pristine_crop = pristine
        .map(|s| crop(&s.image, pattern, sensor))
        .transpose()?;
    let exposed_crop = exposed
        .map(|s| crop(&s.image, pattern, sensor))
        .transpose()?;
    score(pristine_crop.as_ref(), exposed_crop.as_ref())
}
