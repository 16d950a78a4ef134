//! # Observational reference datasets
//!
//! Loading of the observational curves (mass functions, luminosity functions…)
//! the model is compared against.
//!
//! ## Overview
//! -----------------
//! * [`ObservationStore`] – Root of the on-disk observation layout; reads a table
//!   relative to that root and extracts columns by index.
//! * [`ObservationSet`] – One observational curve: `x`, `y` and the asymmetric
//!   error bounds (`y_err_down`, `y_err_up`), as loaded (**unsorted**) and after
//!   any cosmology correction applied by the constraint.
//!
//! ## File format
//! -----------------
//! Flat text, whitespace-delimited numeric columns, `#` comments. See
//! [`reader`] for the parsing rules.
//!
//! ## See also
//! ------------
//! * [`crate::constraints::ConstraintKind::get_obs_x_y_err`] – Per-constraint loading
//!   and correction.
pub mod reader;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::constraint_errors::ConstraintError;

/// One observational curve with asymmetric error bounds.
///
/// Invariants
/// -----------------
/// * `x.len() == y.len() == y_err_down.len() == y_err_up.len()`
/// * Entries are in file order; sorting happens during alignment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub y_err_down: Vec<f64>,
    pub y_err_up: Vec<f64>,
}

impl ObservationSet {
    pub fn new(x: Vec<f64>, y: Vec<f64>, y_err_down: Vec<f64>, y_err_up: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len(), "x/y length mismatch");
        debug_assert_eq!(x.len(), y_err_down.len(), "x/err_down length mismatch");
        debug_assert_eq!(x.len(), y_err_up.len(), "x/err_up length mismatch");
        ObservationSet {
            x,
            y,
            y_err_down,
            y_err_up,
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Keep only the rows for which `keep(row)` is `true`.
    pub fn retain_rows<F>(self, mut keep: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        let mask: Vec<bool> = (0..self.len()).map(&mut keep).collect();
        let select = |v: Vec<f64>| -> Vec<f64> {
            v.into_iter()
                .zip(&mask)
                .filter_map(|(value, &k)| k.then_some(value))
                .collect()
        };
        ObservationSet {
            x: select(self.x),
            y: select(self.y),
            y_err_down: select(self.y_err_down),
            y_err_up: select(self.y_err_up),
        }
    }
}

/// Root directory of the observational datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationStore {
    root: Utf8PathBuf,
}

impl ObservationStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        ObservationStore { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Load selected columns of a dataset.
    ///
    /// Arguments
    /// -----------------
    /// * `relative`: Path of the table under the store root (e.g. `mf/SMF/GAMAII_BBD_GSMFs.dat`).
    /// * `cols`: Zero-based column indices, returned in the same order.
    ///
    /// Return
    /// ----------
    /// * One vector per requested column.
    /// * [`ConstraintError::ObservationIo`] if the file cannot be read.
    /// * A parse error if the table is malformed.
    pub fn load_columns(
        &self,
        relative: &str,
        cols: &[usize],
    ) -> Result<Vec<Vec<f64>>, ConstraintError> {
        let path = self.root.join(relative);
        let content =
            std::fs::read_to_string(&path).map_err(|source| ConstraintError::ObservationIo {
                path: path.clone(),
                source,
            })?;
        let columns = reader::read_columns(&content, &path, cols)?;
        debug!(
            path = %path,
            rows = columns.first().map_or(0, Vec::len),
            "loaded observation table"
        );
        Ok(columns)
    }

    /// Load exactly `N` columns, destructurable as an array.
    pub fn load_array<const N: usize>(
        &self,
        relative: &str,
        cols: [usize; N],
    ) -> Result<[Vec<f64>; N], ConstraintError> {
        let mut columns = self.load_columns(relative, &cols)?.into_iter();
        Ok(std::array::from_fn(|_| columns.next().unwrap_or_default()))
    }
}
