//! # Diagnostic plot output
//!
//! When an evaluation is given a plot directory, every constraint hands its aligned
//! curves to a [`ConstraintPlotter`]. Rendering is left to the implementor; the crate
//! ships [`CsvCurveWriter`], which dumps the curves as a CSV table that any plotting
//! tool can pick up.
//!
//! ## Output layout
//! -----------------
//! One file per constraint, `<outdir>/<title>.csv` (see [`PlotData::file_stem`]),
//! with one row per point:
//!
//! | column       | meaning                                                    |
//! |--------------|------------------------------------------------------------|
//! | `series`     | `observation` or `model`                                   |
//! | `x`          | abscissa (sorted ascending within a series)                |
//! | `y`          | observed value, or raw model value                         |
//! | `y_err_down` | lower error bound (empty for the model)                    |
//! | `y_err_up`   | upper error bound (empty for the model)                    |
//! | `y_model`    | model interpolated at `x` (empty for the model series)     |
//! | `in_domain`  | whether the point is compared by the statistical test      |
//!
//! The scores are not part of the table; they are logged alongside the file path.
use std::fs;

use camino::Utf8Path;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{alignment::Alignment, constants::Domain, constraint_errors::ConstraintError};

/// Everything a plotter receives for one constraint.
#[derive(Debug, Clone)]
pub struct PlotData<'a> {
    /// Display form of the constraint, e.g. `SMF_z0(8.0-13.0)`.
    pub title: String,
    pub domain: Domain,
    pub alignment: &'a Alignment,
    pub chi2: f64,
    pub student_t: f64,
}

impl PlotData<'_> {
    /// File stem derived from the full title, so constraints of the same kind with
    /// different domains or weights get distinct files.
    ///
    /// Path separators, commas and spaces are replaced by `_`:
    /// `SMF_z0(8.0-10.0), weight=2.00, rel_weight=0.67` becomes
    /// `SMF_z0(8.0-10.0)_weight=2.00_rel_weight=0.67`.
    pub fn file_stem(&self) -> String {
        self.title
            .split(", ")
            .join("_")
            .replace(['/', '\\', ',', ' '], "_")
    }
}

/// Sink for the diagnostic curves of a constraint.
pub trait ConstraintPlotter {
    /// Emit the curves of one constraint under `outdir`.
    fn plot(&self, outdir: &Utf8Path, data: &PlotData<'_>) -> Result<(), ConstraintError>;
}

/// One CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRow {
    pub series: String,
    pub x: f64,
    pub y: f64,
    pub y_err_down: Option<f64>,
    pub y_err_up: Option<f64>,
    pub y_model: Option<f64>,
    pub in_domain: bool,
}

/// [`ConstraintPlotter`] writing one CSV file per constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCurveWriter;

impl CsvCurveWriter {
    pub fn new() -> Self {
        CsvCurveWriter
    }

    /// Rows written for `data`, observation first.
    pub fn rows(data: &PlotData<'_>) -> Vec<CurveRow> {
        let obs = &data.alignment.observation;
        let model = &data.alignment.model;

        let observation_rows = obs
            .x
            .iter()
            .zip(&obs.y)
            .zip(obs.y_err_down.iter().zip(&obs.y_err_up))
            .zip(&data.alignment.y_mod_interp)
            .map(|(((&x, &y), (&dn, &up)), &ym)| CurveRow {
                series: "observation".to_string(),
                x,
                y,
                y_err_down: Some(dn),
                y_err_up: Some(up),
                y_model: Some(ym),
                in_domain: data.domain.contains(x),
            });

        let model_rows = model.x.iter().zip(&model.y).map(|(&x, &y)| CurveRow {
            series: "model".to_string(),
            x,
            y,
            y_err_down: None,
            y_err_up: None,
            y_model: None,
            in_domain: data.domain.contains(x),
        });

        observation_rows.chain(model_rows).collect()
    }
}

impl ConstraintPlotter for CsvCurveWriter {
    fn plot(&self, outdir: &Utf8Path, data: &PlotData<'_>) -> Result<(), ConstraintError> {
        fs::create_dir_all(outdir)?;
        let path = outdir.join(format!("{}.csv", data.file_stem()));

        let mut writer = csv::Writer::from_path(&path)?;
        for row in Self::rows(data) {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(
            constraint = %data.title,
            path = %path,
            chi2 = data.chi2,
            student_t = data.student_t,
            "wrote constraint curves"
        );
        Ok(())
    }
}

#[cfg(test)]
mod test_plotting {
    use super::*;
    use crate::{
        alignment::{align, ModelCurve},
        observations::ObservationSet,
    };
    use camino::Utf8PathBuf;

    fn alignment() -> Alignment {
        let obs = ObservationSet::new(
            vec![9.0, 8.0, 12.0],
            vec![-2.0, -1.5, -4.0],
            vec![0.1, 0.1, 0.2],
            vec![0.1, 0.2, 0.2],
        );
        let model = ModelCurve::new(vec![8.1, 10.1], vec![-1.6, -2.8]);
        align(&obs, &model, &Domain::new(8.0, 11.0)).unwrap()
    }

    fn plot_data(alignment: &Alignment) -> PlotData<'_> {
        PlotData {
            title: "SMF_z0(8.0-11.0), weight=2.00, rel_weight=1.00".to_string(),
            domain: Domain::new(8.0, 11.0),
            alignment,
            chi2: 1.0,
            student_t: 0.5,
        }
    }

    #[test]
    fn file_stem_keeps_domain_and_weights() {
        let alignment = alignment();
        let mut data = plot_data(&alignment);
        assert_eq!(
            data.file_stem(),
            "SMF_z0(8.0-11.0)_weight=2.00_rel_weight=1.00"
        );

        data.title = "HIMF(7.0-12.0)".to_string();
        assert_eq!(data.file_stem(), "HIMF(7.0-12.0)");

        data.title = "a/b,c d".to_string();
        assert_eq!(data.file_stem(), "a_b_c_d");
    }

    #[test]
    fn rows_cover_both_series() {
        let alignment = alignment();
        let rows = CsvCurveWriter::rows(&plot_data(&alignment));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].series, "observation");
        assert_eq!(rows[0].x, 8.0);
        assert!(rows[0].in_domain);
        assert!(!rows[2].in_domain);
        assert_eq!(rows[3].series, "model");
        assert_eq!(rows[3].y_model, None);
    }

    #[test]
    fn writes_one_csv_per_constraint() {
        let outdir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
            .unwrap()
            .join("shark_constraints_plotting_unit_test");
        let alignment = alignment();
        CsvCurveWriter::new()
            .plot(&outdir, &plot_data(&alignment))
            .unwrap();

        let path = outdir.join("SMF_z0(8.0-11.0)_weight=2.00_rel_weight=1.00.csv");
        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<CurveRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, CsvCurveWriter::rows(&plot_data(&alignment)));
    }
}
