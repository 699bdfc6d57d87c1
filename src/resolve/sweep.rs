use std::path::Path;
use tracing::debug;

use super::{FileResolver, read_numeric_csv};
use crate::error::{PipelineError, Result};
use crate::records::types::{Age, SweepFamily, SweepSample};

const SWEEP_NAME_COMPONENTS: usize = 7;

/// Typed form of a sweep file name `{6-component-prefix}_{family}_{iteration}.ext`.
///
/// The name is the only place the family and age of a sweep are recorded,
/// so it is validated once here and carried around afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SweepKey {
    pub family: SweepFamily,
    pub age: Age,
    pub name: String,
}

impl SweepKey {
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] unless the stem has exactly seven
    /// underscore-delimited components, the sixth is `CF` or `CV` and the
    /// seventh is an integer.
    pub fn parse(file_name: &str) -> Result<Self> {
        let malformed =
            |why: &str| PipelineError::not_found(format!("sweep file name '{file_name}': {why}"));

        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| malformed("no file stem"))?;

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() != SWEEP_NAME_COMPONENTS {
            let why = format!(
                "expected {SWEEP_NAME_COMPONENTS} components, found {}",
                parts.len()
            );
            return Err(malformed(why.as_str()));
        }

        let family = parts[5]
            .parse::<SweepFamily>()
            .map_err(|e| malformed(e.as_str()))?;
        let iteration = parts[6]
            .parse::<i64>()
            .map_err(|_| malformed("iteration is not an integer"))?;

        Ok(Self {
            family,
            age: Age::from_iteration(iteration),
            name: file_name.to_string(),
        })
    }
}

/// The numeric content of one sweep file.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFile {
    pub key: SweepKey,
    pub columns: Vec<String>,
    pub samples: Vec<SweepSample>,
}

impl FileResolver {
    /// Parses `file_name` and reads it from `{family dir}/{family}_{AGE}/`.
    ///
    /// Malformed names and unreadable files are [`PipelineError::NotFound`],
    /// never fatal.
    pub fn resolve_sweep(&self, file_name: &str) -> Result<SweepFile> {
        let key = SweepKey::parse(file_name.trim())?;
        let path = self
            .layout()
            .sweep_dir(key.family, key.age)
            .join(&key.name);
        let table = read_numeric_csv(&path)?;

        debug!(
            file = %key.name,
            family = %key.family,
            age = %key.age,
            samples = table.rows.len(),
            dropped = table.dropped,
            "Sweep file read"
        );

        Ok(SweepFile {
            key,
            columns: table.columns,
            samples: table
                .rows
                .into_iter()
                .map(|(index, values)| SweepSample { index, values })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataLayout;
    use std::fs;

    #[test]
    fn test_parse_pristine_cf() {
        let key = SweepKey::parse("B1_1_01_U1_5V_CF_0.csv").unwrap();
        assert_eq!(key.family, SweepFamily::CF);
        assert_eq!(key.age, Age::Pristine);
        assert_eq!(key.name, "B1_1_01_U1_5V_CF_0.csv");
    }

    #[test]
    fn test_parse_exposed_cv() {
        let key = SweepKey::parse("B1_1_01_U1_5V_CV_3.csv").unwrap();
        assert_eq!(key.family, SweepFamily::CV);
        assert_eq!(key.age, Age::Exposed);
    }

    #[test]
    fn test_wrong_component_count_is_not_found() {
        for name in ["B1_1_01_CF_0.csv", "a_b_c_d_e_f_CF_0.csv", "", "plain.csv"] {
            let err = SweepKey::parse(name).unwrap_err();
            assert!(matches!(err, PipelineError::NotFound(_)), "{name}");
        }
    }

    #[test]
    fn test_bad_family_or_iteration_is_not_found() {
        assert!(SweepKey::parse("B1_1_01_U1_5V_XX_0.csv").is_err());
        assert!(SweepKey::parse("B1_1_01_U1_5V_CF_first.csv").is_err());
    }

    #[test]
    fn test_resolve_reads_from_family_age_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::with_root(dir.path());
        let sweep_dir = layout.sweep_dir(SweepFamily::CF, Age::Exposed);
        fs::create_dir_all(&sweep_dir).unwrap();
        fs::write(
            sweep_dir.join("B1_1_01_U1_5V_CF_1.csv"),
            "Frequency,Capacitance\n100,1e-9\n200,2e-9\n",
        )
        .unwrap();

        let resolver = FileResolver::new(layout);
        let sweep = resolver.resolve_sweep("B1_1_01_U1_5V_CF_1.csv").unwrap();
        assert_eq!(sweep.key.age, Age::Exposed);
        assert_eq!(sweep.columns, vec!["Frequency", "Capacitance"]);
        assert_eq!(sweep.samples.len(), 2);
        assert_eq!(sweep.samples[1].values, vec![200.0, 2e-9]);

        // same name but iteration 0 points at the pristine dir, which is empty
        assert!(resolver.resolve_sweep("B1_1_01_U1_5V_CF_0.csv").is_err());
    }
}
