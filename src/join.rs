//! Denormalized per-measurement tables for the reporting layer.
//!
//! Each record is expanded against the satellite file its reference column
//! names. These are inner joins: a record whose reference is blank, a measured
//! number, or an unresolvable file contributes no rows, but it is never
//! removed from the record set.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::records::{Age, SatelliteRef, SensorRecord, SweepFamily, SweepSample, TimeSeriesSample};
use crate::resolve::{FileResolver, SweepFile};

/// One current-vs-time sample with the record it belongs to.
#[derive(Debug, Clone)]
pub struct TimeSeriesRow<'a> {
    pub record: &'a SensorRecord,
    pub sample: TimeSeriesSample,
}

/// One sweep sample with its record and the age of the column it came from.
#[derive(Debug, Clone)]
pub struct SweepRow<'a> {
    pub record: &'a SensorRecord,
    pub age: Age,
    /// Column names of the file the sample was read from.
    pub columns: Arc<[String]>,
    pub sample: SweepSample,
}

/// Joins records with their `Current` trace files.
#[tracing::instrument(skip_all)]
pub fn join_time_series<'a>(
    records: &'a [SensorRecord],
    resolver: &FileResolver,
) -> Vec<TimeSeriesRow<'a>> {
    let mut cache: HashMap<&str, Option<Vec<TimeSeriesSample>>> = HashMap::new();
    let mut rows = Vec::new();
    let mut joined_records = 0;

    for record in records {
        let Some(reference @ SatelliteRef::File(name)) = &record.current else {
            continue;
        };

        let samples = cache.entry(name.as_str()).or_insert_with(|| {
            resolver
                .time_series_for(reference)
                .inspect_err(|e| debug!(error = %e, "Current trace unavailable"))
                .ok()
        });
        let Some(samples) = samples else {
            continue;
        };

        joined_records += 1;
        rows.extend(samples.iter().map(|&sample| TimeSeriesRow { record, sample }));
    }

    info!(
        records = joined_records,
        rows = rows.len(),
        "Current-time join complete"
    );
    rows
}

/// Joins records with their `{family}_Baseline` (pristine) and `{family}_Post`
/// (exposed) sweep files.
///
/// The age tag comes from the column the file was referenced in. A file whose
/// name encodes another family is skipped.
#[tracing::instrument(skip_all, fields(family = %family))]
pub fn join_sweep<'a>(
    records: &'a [SensorRecord],
    resolver: &FileResolver,
    family: SweepFamily,
) -> Vec<SweepRow<'a>> {
    let mut cache: HashMap<&str, Option<(SweepFile, Arc<[String]>)>> = HashMap::new();
    let mut rows = Vec::new();

    for age in Age::ALL {
        for record in records {
            let Some(name) = record.sweep_ref(family, age).and_then(SatelliteRef::file_name) else {
                continue;
            };

            let resolved = cache.entry(name).or_insert_with(|| {
                let file = resolver
                    .resolve_sweep(name)
                    .inspect_err(|e| debug!(error = %e, "Sweep file unavailable"))
                    .ok()?;
                if file.key.family != family {
                    warn!(file = %name, found = %file.key.family, "Sweep file is from another family");
                    return None;
                }
                let columns: Arc<[String]> = file.columns.clone().into();
                Some((file, columns))
            });
            let Some((file, columns)) = resolved else {
                continue;
            };

            if file.key.age != age {
                warn!(
                    file = %name,
                    column_age = %age,
                    name_age = %file.key.age,
                    "Sweep file name disagrees with its column"
                );
            }

            rows.extend(file.samples.iter().map(|sample| SweepRow {
                record,
                age,
                columns: Arc::clone(columns),
                sample: sample.clone(),
            }));
        }
    }

    info!(rows = rows.len(), "Sweep join complete");
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataLayout;
    use crate::records::RecordStore;
    use std::fs;

    const HEADER: &str = "Board ID,Sensor,Pattern,Voltage,Solution,Status,Current,CF_Baseline,CF_Post,CV_Baseline,CV_Post";

    fn fixture(rows: &[&str]) -> (tempfile::TempDir, RecordStore, FileResolver) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::with_root(dir.path());
        fs::create_dir_all(layout.current_time_dir()).unwrap();
        for age in Age::ALL {
            fs::create_dir_all(layout.sweep_dir(SweepFamily::CF, age)).unwrap();
            fs::create_dir_all(layout.sweep_dir(SweepFamily::CV, age)).unwrap();
        }
        let text = format!("{HEADER}\n{}", rows.join("\n"));
        let store = RecordStore::from_reader(text.as_bytes()).unwrap();
        (dir, store, FileResolver::new(layout))
    }

    fn write(path: std::path::PathBuf, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_time_series_inner_join() {
        let (_dir, store, resolver) = fixture(&[
            "B1_1_01,U1,1,5,DI Water,Complete,ct_u1.csv,,,,",
            "B1_1_01,U2,1,5,DI Water,Complete,0.5,,,,",
            "B1_1_01,U3,1,5,DI Water,Complete,absent.csv,,,,",
            "B1_1_01,U4,1,5,DI Water,Complete,,,,,",
        ]);
        write(
            resolver.layout().current_time_dir().join("ct_u1.csv"),
            "Time (ms),Current (mA)\n0,0.1\n1,0.2\n2,0.4\n",
        );

        let rows = join_time_series(store.records(), &resolver);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.record.sensor == crate::records::Sensor::U1));
        assert_eq!(rows[2].sample.current, 0.4);
        // records without traces are still in the store
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_sweep_join_unions_baseline_and_post() {
        let (_dir, store, resolver) = fixture(&[
            "B1_1_01,U1,1,5,DI Water,Complete,,B1_1_01_U1_5V_CF_0.csv,B1_1_01_U1_5V_CF_1.csv,,",
        ]);
        let layout = resolver.layout();
        write(
            layout.sweep_dir(SweepFamily::CF, Age::Pristine).join("B1_1_01_U1_5V_CF_0.csv"),
            "Frequency,Capacitance\n100,1.0\n200,2.0\n",
        );
        write(
            layout.sweep_dir(SweepFamily::CF, Age::Exposed).join("B1_1_01_U1_5V_CF_1.csv"),
            "Frequency,Capacitance\n100,1.5\n200,2.5\n300,3.5\n",
        );

        let rows = join_sweep(store.records(), &resolver, SweepFamily::CF);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows.iter().filter(|r| r.age == Age::Pristine).count(), 2);
        assert_eq!(rows.iter().filter(|r| r.age == Age::Exposed).count(), 3);
        assert_eq!(&*rows[0].columns, &["Frequency".to_string(), "Capacitance".to_string()]);

        assert!(join_sweep(store.records(), &resolver, SweepFamily::CV).is_empty());
    }

    #[test]
    fn test_sweep_join_skips_malformed_and_foreign_files() {
        let (_dir, store, resolver) = fixture(&[
            "B1_1_01,U1,1,5,DI Water,Complete,,badname.csv,B1_1_01_U1_5V_CV_1.csv,,",
        ]);
        write(
            resolver
                .layout()
                .sweep_dir(SweepFamily::CV, Age::Exposed)
                .join("B1_1_01_U1_5V_CV_1.csv"),
            "Voltage,Current\n0,0\n",
        );

        assert!(join_sweep(store.records(), &resolver, SweepFamily::CF).is_empty());
    }

    #[test]
    fn test_shared_file_joins_every_referencing_record() {
        let (_dir, store, resolver) = fixture(&[
            "B1_1_01,U1,1,5,DI Water,Complete,shared.csv,,,,",
            "B1_1_01,U2,1,5,DI Water,Complete,shared.csv,,,,",
        ]);
        write(
            resolver.layout().current_time_dir().join("shared.csv"),
            "Time,Current\n0,1\n",
        );

        let rows = join_time_series(store.records(), &resolver);
        assert_eq!(rows.len(), 2);
    }
}
