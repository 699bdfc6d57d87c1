use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::records::types::{Age, SweepFamily};

/// Where the master sheet and satellite files live under a data root.
///
/// Every entry except `root` is relative to `root`. Stored on disk as a JSON
/// object; omitted keys fall back to the defaults:
/// ```json
/// {
///   "root": "/data/darts_idc_analysis",
///   "master": "IDCSubmersionMasterlist_20250505.csv",
///   "current_time_dir": "CurrentTime"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataLayout {
    pub root: PathBuf,
    pub master: PathBuf,
    pub current_time_dir: PathBuf,
    pub cf_dir: PathBuf,
    pub cv_dir: PathBuf,
    pub scans_pristine_dir: PathBuf,
    pub scans_exposed_dir: PathBuf,
    pub sensors_pristine_dir: PathBuf,
    pub sensors_exposed_dir: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            master: PathBuf::from("IDCSubmersionMasterlist_20250505.csv"),
            current_time_dir: PathBuf::from("CurrentTime"),
            cf_dir: PathBuf::from("CF"),
            cv_dir: PathBuf::from("CV"),
            scans_pristine_dir: PathBuf::from("Imgscans_PRISTINE_edited"),
            scans_exposed_dir: PathBuf::from("Imgscans_EXPOSED_edited"),
            sensors_pristine_dir: PathBuf::from("Imgscans_PRISTINE_sensors"),
            sensors_exposed_dir: PathBuf::from("Imgscans_EXPOSED_sensors"),
        }
    }
}

impl DataLayout {
    /// Default layout rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Loads a layout from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn master_path(&self) -> PathBuf {
        self.root.join(&self.master)
    }

    pub fn current_time_dir(&self) -> PathBuf {
        self.root.join(&self.current_time_dir)
    }

    /// Sweep files are split by family and then by age, e.g. `CF/CF_PRISTINE`.
    pub fn sweep_dir(&self, family: SweepFamily, age: Age) -> PathBuf {
        let family_dir = match family {
            SweepFamily::CF => &self.cf_dir,
            SweepFamily::CV => &self.cv_dir,
        };
        self.root.join(family_dir).join(format!("{family}_{age}"))
    }

    /// Directory of whole-board scans for `age`.
    pub fn scans_dir(&self, age: Age) -> PathBuf {
        match age {
            Age::Pristine => self.root.join(&self.scans_pristine_dir),
            Age::Exposed => self.root.join(&self.scans_exposed_dir),
        }
    }

    /// Directory of generated per-sensor crops for `age`.
    pub fn sensors_dir(&self, age: Age) -> PathBuf {
        match age {
            Age::Pristine => self.root.join(&self.sensors_pristine_dir),
            Age::Exposed => self.root.join(&self.sensors_exposed_dir),
        }
    }
}
