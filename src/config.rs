//! # Run configuration
//!
//! TOML description of an evaluation run: where the observations live, which
//! constraints to score, with which statistical test, and how model redshifts map
//! to snapshots.
//!
//! ```rust
//! use shark_constraints::config::EvaluationConfig;
//! use shark_constraints::stat_tests::StatTestKind;
//!
//! let config = EvaluationConfig::from_toml_str(r#"
//!     obs_dir = "data/Observations"
//!     constraints = "HIMF,SMF_z0(9-12)*2"
//!     stat_test = "student_t"
//!     subvolumes = [0, 1]
//!
//!     [[redshift_table]]
//!     z = 0.0
//!     snapshot = 199
//! "#).unwrap();
//!
//! assert_eq!(config.stat_test, StatTestKind::StudentT);
//! assert_eq!(config.parse_constraints().unwrap().len(), 2);
//! ```
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::RedshiftTable,
    constants::{Redshift, SnapshotId, Subvolume},
    constraint_errors::ConstraintError,
    constraints::{parse, ConstraintSet},
    observations::ObservationStore,
    stat_tests::StatTestKind,
};

/// One row of the redshift → snapshot table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RedshiftEntry {
    pub z: Redshift,
    pub snapshot: SnapshotId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Root of the observational datasets.
    pub obs_dir: Utf8PathBuf,

    /// Constraint specification, e.g. `"HIMF,SMF_z0(8-12)*2"`.
    pub constraints: String,

    #[serde(default)]
    pub stat_test: StatTestKind,

    #[serde(default = "default_subvolumes")]
    pub subvolumes: Vec<Subvolume>,

    /// Diagnostic curves are written here when set.
    #[serde(default)]
    pub plot_outputdir: Option<Utf8PathBuf>,

    #[serde(default)]
    pub redshift_table: Vec<RedshiftEntry>,

    /// Read the merged `multiple_batches` pseudo-subvolume when several subvolumes are requested.
    #[serde(default = "default_merge_subvolumes")]
    pub merge_subvolumes: bool,
}

fn default_subvolumes() -> Vec<Subvolume> {
    vec![0]
}

fn default_merge_subvolumes() -> bool {
    true
}

impl EvaluationConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self, ConstraintError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConstraintError> {
        let config: EvaluationConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConstraintError> {
        if self.subvolumes.is_empty() {
            return Err(ConstraintError::InvalidConfig(
                "at least one subvolume is required".to_string(),
            ));
        }
        if let Some(entry) = self.redshift_table.iter().find(|e| !(e.z >= 0.0)) {
            return Err(ConstraintError::InvalidConfig(format!(
                "invalid redshift in snapshot table: {}",
                entry.z
            )));
        }
        Ok(())
    }

    /// Constraints of the run, with the subvolume merging policy applied.
    pub fn parse_constraints(&self) -> Result<ConstraintSet, ConstraintError> {
        let constraints = parse(&self.constraints)?
            .into_inner()
            .into_iter()
            .map(|c| c.with_multiple_batches(self.merge_subvolumes))
            .collect();
        ConstraintSet::new(constraints)
    }

    pub fn redshift_table(&self) -> RedshiftTable {
        self.redshift_table
            .iter()
            .map(|e| (e.z, e.snapshot))
            .collect()
    }

    pub fn observation_store(&self) -> ObservationStore {
        ObservationStore::new(self.obs_dir.clone())
    }
}
