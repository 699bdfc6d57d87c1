use dendrite_pipeline::output;
use dendrite_pipeline::records::{Age, Sensor, SweepFamily};
use dendrite_pipeline::{
    DataLayout, FileResolver, PipelineError, RecordStore, SensorKey, augment, join_sweep,
    join_time_series,
};
use image::{Rgb, RgbImage};
use std::fs;
use tempfile::TempDir;

const HEADER: &str = "Board ID,Sensor,Pattern,Voltage,Solution,Status,Time to Failure (ms),Ph,Date,Current,CF_Baseline,CF_Post,CV_Baseline,CV_Post";

/// Builds a data root with the master sheet and every satellite directory.
fn data_root(rows: &[&str]) -> (TempDir, FileResolver) {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::with_root(dir.path());

    fs::create_dir_all(layout.current_time_dir()).unwrap();
    for age in Age::ALL {
        fs::create_dir_all(layout.scans_dir(age)).unwrap();
        fs::create_dir_all(layout.sweep_dir(SweepFamily::CF, age)).unwrap();
        fs::create_dir_all(layout.sweep_dir(SweepFamily::CV, age)).unwrap();
    }
    fs::write(
        layout.master_path(),
        format!("{HEADER}\n{}\n", rows.join("\n")),
    )
    .unwrap();

    (dir, FileResolver::new(layout))
}

fn save_scan(resolver: &FileResolver, age: Age, name: &str, colour: [u8; 3]) {
    RgbImage::from_pixel(200, 150, Rgb(colour))
        .save(resolver.layout().scans_dir(age).join(name))
        .unwrap();
}

#[test]
fn test_identical_scans_score_zero() {
    let (_dir, resolver) = data_root(&["B1_1_01,U1,1,5,DI Water,Complete,1200,7,03/14/2025,,,,,"]);
    save_scan(&resolver, Age::Pristine, "B1_1_01_edited.png", [90, 140, 60]);
    save_scan(&resolver, Age::Exposed, "B1_1_01_edited.png", [90, 140, 60]);

    let mut store = RecordStore::load(resolver.layout().master_path()).unwrap();
    let summary = augment(&mut store, &resolver);
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.mean_score, Some(0.0));

    let record = store.get(&SensorKey::new("B1_1_01", Sensor::U1)).unwrap();
    assert_eq!(record.dendrite_score(), Some(0.0));
    assert_eq!(record.image_pristine.as_deref(), Some("B1_1_01_edited.png"));
    assert_eq!(record.image_exposed.as_deref(), Some("B1_1_01_edited.png"));
}

#[test]
fn test_missing_exposed_scan_leaves_record_intact() {
    let (dir, resolver) = data_root(&[
        "B1_1_01,U1,1,5,DI Water,Complete,1200,7,03/14/2025,ct.csv,,,,",
        "B1_1_01,U2,1,5,DI Water,Complete,,,,,,,,",
    ]);
    save_scan(&resolver, Age::Pristine, "B1_1_01_edited.png", [200, 10, 10]);

    let mut store = RecordStore::load(resolver.layout().master_path()).unwrap();
    let before = store.records().to_vec();
    let summary = augment(&mut store, &resolver);

    assert_eq!(summary.scored, 0);
    assert_eq!(summary.missing_images, 2);
    assert_eq!(store.len(), 2);

    for (old, new) in before.iter().zip(store.records()) {
        assert!(new.dendrite.is_none());
        assert_eq!(new.image_pristine.as_deref(), Some("B1_1_01_edited.png"));
        assert_eq!(new.image_exposed, None);
        assert_eq!(new.board_id, old.board_id);
        assert_eq!(new.current, old.current);
        assert_eq!(new.date, old.date);
        assert_eq!(new.time_to_failure_ms, old.time_to_failure_ms);
    }

    let out = dir.path().join("augmented.csv");
    assert_eq!(output::write_records(&out, store.records()).unwrap(), 2);
}

#[test]
fn test_unknown_pattern_only_affects_its_record() {
    let (_dir, resolver) = data_root(&[
        "B2_1_01,U1,1,5,DI Water,Complete,,,,,,,,",
        "B2_1_01,U2,3,5,DI Water,Complete,,,,,,,,",
    ]);
    save_scan(&resolver, Age::Pristine, "B2_1_01_a.png", [10, 10, 10]);
    save_scan(&resolver, Age::Exposed, "B2_1_01_b.png", [40, 10, 10]);

    let mut store = RecordStore::load(resolver.layout().master_path()).unwrap();
    let summary = augment(&mut store, &resolver);
    assert_eq!(summary.scored, 1);
    assert_eq!(summary.geometry_errors, 1);

    let scored = store.get(&SensorKey::new("B2_1_01", Sensor::U1)).unwrap();
    assert_eq!(scored.dendrite_score(), Some(30.0));
    let unscored = store.get(&SensorKey::new("B2_1_01", Sensor::U2)).unwrap();
    assert_eq!(unscored.dendrite_score(), None);
}

#[test]
fn test_sweep_join_covers_both_ages() {
    let (_dir, resolver) = data_root(&[
        "B1_1_01,U1,1,5,DI Water,Complete,,,,,B1_1_01_U1_5V_CF_0.csv,B1_1_01_U1_5V_CF_1.csv,,",
    ]);
    let layout = resolver.layout();
    fs::write(
        layout
            .sweep_dir(SweepFamily::CF, Age::Pristine)
            .join("B1_1_01_U1_5V_CF_0.csv"),
        "Frequency,Capacitance\n100,1.0\n1000,0.9\n10000,0.8\n",
    )
    .unwrap();
    fs::write(
        layout
            .sweep_dir(SweepFamily::CF, Age::Exposed)
            .join("B1_1_01_U1_5V_CF_1.csv"),
        "Frequency,Capacitance\n100,1.4\n1000,1.2\n",
    )
    .unwrap();

    let store = RecordStore::load(layout.master_path()).unwrap();
    let rows = join_sweep(store.records(), &resolver, SweepFamily::CF);

    assert_eq!(rows.len(), 5);
    assert_eq!(rows.iter().filter(|r| r.age == Age::Pristine).count(), 3);
    assert_eq!(rows.iter().filter(|r| r.age == Age::Exposed).count(), 2);
}

#[test]
fn test_measured_current_is_not_a_file() {
    let (_dir, resolver) = data_root(&["B1_1_01,U1,1,5,DI Water,Complete,,,,0.5,,,,"]);

    let err = resolver.resolve_time_series("0.5").unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    let store = RecordStore::load(resolver.layout().master_path()).unwrap();
    assert!(join_time_series(store.records(), &resolver).is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_duplicate_keys_keep_first_row() {
    let (_dir, resolver) = data_root(&[
        "B1_1_01,U1,1,5,DI Water,Complete,,,,,,,,",
        "B1_1_01,U1,4,10,Salt Water,Complete,,,,,,,,",
        "B1_1_01,U2,1,5,DI Water,In Progress,,,,,,,,",
        "B1_1_01,U3,1,,DI Water,Complete,,,,,,,,",
    ]);

    let store = RecordStore::load(resolver.layout().master_path()).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.load_summary().duplicates, 1);
    assert_eq!(store.load_summary().incomplete_status, 1);
    assert_eq!(store.load_summary().missing_voltage, 1);

    let kept = store.get(&SensorKey::new("B1_1_01", Sensor::U1)).unwrap();
    assert_eq!(kept.pattern, Some(1));
    assert_eq!(kept.voltage, 5);
    assert_eq!(kept.solution, "DI Water");
}

#[test]
fn test_current_time_join_end_to_end() {
    let (dir, resolver) = data_root(&["B1_1_01,U1,1,5,DI Water,Complete,,,,ct.csv,,,,"]);
    fs::write(
        resolver.layout().current_time_dir().join("ct.csv"),
        "Time (ms),Current (mA)\n0,0.0\n10,0.1\nbad,row\n20,0.3\n",
    )
    .unwrap();

    let store = RecordStore::load(resolver.layout().master_path()).unwrap();
    let rows = join_time_series(store.records(), &resolver);
    assert_eq!(rows.len(), 3);

    let out = dir.path().join("current_time.csv");
    assert_eq!(output::write_time_series(&out, &rows).unwrap(), 3);
}
