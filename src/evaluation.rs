//! # Constraint evaluation
//!
//! Score a model run against a [`ConstraintSet`](crate::constraints::ConstraintSet)
//! and report the results of a batch of runs.
//!
//! ## Overview
//! -----------------
//! * [`evaluate_constraint`] – One constraint, errors propagated.
//! * [`evaluate`] – Every constraint of a set against one model run. A failing
//!   constraint is logged and scored [`PENALTY`]; the others are unaffected.
//! * [`evaluate_particles`] – The same for several model runs (the particles of
//!   an optimiser), one score vector per particle.
//! * [`log_results`] – Fixed-width table of a batch, with the best particle flagged.
//!
//! ## Fault isolation
//! -----------------
//! A score is `stat_test(y_obs, y_mod, err) * weight`. Any error raised while
//! loading, aligning or scoring (missing file, unknown redshift, empty selection,
//! non-finite score, plot failure…) is converted into [`PENALTY`] for that
//! constraint only, so an optimiser always receives one finite number per constraint.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use shark_constraints::{
//!     binning::Binning,
//!     catalog::{MemoryCatalogReader, RedshiftTable},
//!     constraints::parse,
//!     evaluation::{evaluate, EvaluationContext},
//!     observations::ObservationStore,
//!     stat_tests::StatTestKind,
//! };
//!
//! let binning = Binning::shark_default();
//! let store = ObservationStore::new("data/Observations");
//! let reader = MemoryCatalogReader::new();
//! let table: RedshiftTable = [(0.0, 199), (1.0, 156)].into_iter().collect();
//! let ctx = EvaluationContext::new(&binning, &store, &reader, &table);
//!
//! let constraints = parse("HIMF,SMF_z0*2").unwrap();
//! let run = Utf8Path::new("run");
//! let scores = evaluate(&ctx, &constraints, &StatTestKind::Chi2, run, &[0], None);
//! assert_eq!(scores.len(), 2);
//! ```
//!
//! ## See also
//! ------------
//! * [`crate::constraints::Constraint::get_data`] – Data reduction behind each score.
//! * [`crate::stat_tests`] – Built-in statistical tests.
use std::fmt::Write as _;

use camino::Utf8Path;
use itertools::Itertools;
use tracing::{error, info};

use crate::{
    binning::Binning,
    catalog::{CatalogReader, RedshiftTable},
    constants::{Subvolume, PENALTY},
    constraint_errors::ConstraintError,
    constraints::Constraint,
    observations::ObservationStore,
    plotting::ConstraintPlotter,
    stat_tests::StatTest,
};

/// Shared, read-only resources of an evaluation.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub binning: &'a Binning,
    pub observations: &'a ObservationStore,
    pub catalogs: &'a dyn CatalogReader,
    pub redshift_table: &'a RedshiftTable,
    pub plotter: Option<&'a dyn ConstraintPlotter>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        binning: &'a Binning,
        observations: &'a ObservationStore,
        catalogs: &'a dyn CatalogReader,
        redshift_table: &'a RedshiftTable,
    ) -> Self {
        EvaluationContext {
            binning,
            observations,
            catalogs,
            redshift_table,
            plotter: None,
        }
    }

    /// Attach the collaborator used when a plot directory is given.
    pub fn with_plotter(mut self, plotter: &'a dyn ConstraintPlotter) -> Self {
        self.plotter = Some(plotter);
        self
    }
}

/// Score one constraint against one model run.
///
/// Arguments
/// -----------------
/// * `ctx`: Shared evaluation resources.
/// * `constraint`: Constraint to score.
/// * `stat_test`: Goodness-of-fit measure.
/// * `modeldir`: Output directory of the model run.
/// * `subvols`: Subvolumes to read.
/// * `plot_outputdir`: Optional directory for the diagnostic curves.
///
/// Return
/// ----------
/// * `stat_test(y_obs, y_mod, err) * weight`.
/// * [`ConstraintError::EmptySelection`] if no observation point lies in the domain.
/// * [`ConstraintError::NonFiniteScore`] if the test returns NaN or infinity.
/// * Any loading error of the constraint.
pub fn evaluate_constraint(
    ctx: &EvaluationContext<'_>,
    constraint: &Constraint,
    stat_test: &dyn StatTest,
    modeldir: &Utf8Path,
    subvols: &[Subvolume],
    plot_outputdir: Option<&Utf8Path>,
) -> Result<f64, ConstraintError> {
    let sample = constraint.get_data(ctx, modeldir, subvols, plot_outputdir)?;
    if sample.is_empty() {
        return Err(ConstraintError::EmptySelection(constraint.to_string()));
    }

    let score = stat_test.evaluate(&sample.y_obs, &sample.y_mod, &sample.err);
    if !score.is_finite() {
        return Err(ConstraintError::NonFiniteScore(score));
    }
    Ok(score * constraint.weight())
}

/// Score every constraint against one model run.
///
/// Return
/// ----------
/// * One score per constraint, in order. Failing constraints score [`PENALTY`].
pub fn evaluate(
    ctx: &EvaluationContext<'_>,
    constraints: &[Constraint],
    stat_test: &dyn StatTest,
    modeldir: &Utf8Path,
    subvols: &[Subvolume],
    plot_outputdir: Option<&Utf8Path>,
) -> Vec<f64> {
    constraints
        .iter()
        .map(|constraint| {
            evaluate_constraint(ctx, constraint, stat_test, modeldir, subvols, plot_outputdir)
                .unwrap_or_else(|err| {
                    error!(
                        constraint = %constraint,
                        modeldir = %modeldir,
                        subvols = ?subvols,
                        error = %error_chain(&err),
                        "Error while evaluating constraint, returning {PENALTY:e}"
                    );
                    PENALTY
                })
        })
        .collect()
}

/// `err: cause: cause…`, walking the whole source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {cause}");
        source = cause.source();
    }
    chain
}

/// Score every constraint against several model runs.
///
/// Return
/// ----------
/// * One score vector per entry of `modeldirs`, in order.
pub fn evaluate_particles<P: AsRef<Utf8Path>>(
    ctx: &EvaluationContext<'_>,
    constraints: &[Constraint],
    stat_test: &dyn StatTest,
    modeldirs: &[P],
    subvols: &[Subvolume],
    plot_outputdir: Option<&Utf8Path>,
) -> Vec<Vec<f64>> {
    modeldirs
        .iter()
        .map(|dir| {
            evaluate(
                ctx,
                constraints,
                stat_test,
                dir.as_ref(),
                subvols,
                plot_outputdir,
            )
        })
        .collect()
}

/// Totals of a batch of particle scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSummary {
    /// Sum of the scores of each particle.
    pub totals: Vec<f64>,
    /// First particle with the lowest total, `None` for an empty batch.
    pub best_particle: Option<usize>,
}

impl ParticleSummary {
    pub fn new(results: &[Vec<f64>]) -> Self {
        let totals: Vec<f64> = results.iter().map(|r| r.iter().sum()).collect();
        let best_particle = totals.iter().position_min_by(|a, b| a.total_cmp(b));
        ParticleSummary {
            totals,
            best_particle,
        }
    }
}

/// C-style `%e` rendering: six decimals, signed exponent of at least two digits.
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let repr = format!("{value:.6e}");
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => repr,
    }
}

/// Fixed-width table of a batch of particle scores.
///
/// One column per constraint plus a `Total` column, one row per particle.
/// The first particle with the lowest total is flagged with `*` in the `Min` column.
pub fn format_results_table(constraints: &[Constraint], results: &[Vec<f64>]) -> String {
    let summary = ParticleSummary::new(results);
    let n_cols = constraints.len() + 1;

    let mut msg = String::from("Particle evaluation results per-particle, per-constraint:\n");

    let header = constraints
        .iter()
        .map(|c| format!("{:>20.20}", c.to_string()))
        .chain(std::iter::once(format!("{:>20.20}", "Total")))
        .join(" ");
    let _ = writeln!(msg, "   {header} Min");
    let _ = writeln!(msg, "   {} ===", vec!["=".repeat(20); n_cols].join(" "));

    for (particle, (result, total)) in results.iter().zip(&summary.totals).enumerate() {
        let scores = result
            .iter()
            .map(|v| format!("{:>20}", format_sci(*v)))
            .join(" ");
        let flag = if summary.best_particle == Some(particle) {
            "*"
        } else {
            ""
        };
        let _ = writeln!(
            msg,
            "{particle:>2} {scores} {:>20} {flag:>2}",
            format_sci(*total)
        );
    }
    msg
}

/// Log the table of [`format_results_table`] at `info` level and return it.
pub fn log_results(constraints: &[Constraint], results: &[Vec<f64>]) -> String {
    let table = format_results_table(constraints, results);
    info!("{table}");
    table
}

#[cfg(test)]
mod test_evaluation {
    use super::*;
    use crate::{
        catalog::{Catalog, MemoryCatalogReader},
        constraints::{parse, ConstraintKind},
        model_data::GALAXIES,
        stat_tests::{chi2, StatTestKind},
    };
    use approx::assert_relative_eq;
    use camino::Utf8PathBuf;

    const H0: f64 = 0.6751;

    fn fixture_store() -> ObservationStore {
        ObservationStore::new(Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data"))
    }

    /// Galaxies log-uniformly spread over the mass grid.
    fn galaxies(n: usize) -> Catalog {
        let log_mass = |lo: f64, hi: f64| -> Vec<f64> {
            (0..n)
                .map(|i| H0 * 10f64.powf(lo + (hi - lo) * i as f64 / n as f64))
                .collect()
        };
        Catalog::new(H0, 1.0e4)
            .with_field(GALAXIES, "mstars_disk", log_mass(7.5, 12.5))
            .with_field(GALAXIES, "mstars_bulge", vec![0.0; n])
            .with_field(GALAXIES, "matom_disk", log_mass(6.5, 11.5))
            .with_field(GALAXIES, "matom_bulge", vec![0.0; n])
    }

    struct Fixture {
        binning: Binning,
        store: ObservationStore,
        reader: MemoryCatalogReader,
        table: RedshiftTable,
    }

    impl Fixture {
        fn new() -> Self {
            let mut reader = MemoryCatalogReader::new();
            reader.insert("run", 199, 0, galaxies(2000));
            Fixture {
                binning: Binning::shark_default(),
                store: fixture_store(),
                reader,
                // no z = 1 snapshot on purpose
                table: [(0.0, 199)].into_iter().collect(),
            }
        }

        fn ctx(&self) -> EvaluationContext<'_> {
            EvaluationContext::new(&self.binning, &self.store, &self.reader, &self.table)
        }
    }

    #[test]
    fn failing_constraint_is_isolated() {
        let fixture = Fixture::new();
        let constraints = parse("HIMF,SMF_z1,SMF_z0").unwrap();
        let scores = evaluate(
            &fixture.ctx(),
            &constraints,
            &StatTestKind::Chi2,
            Utf8Path::new("run"),
            &[0],
            None,
        );

        assert_eq!(scores.len(), 3);
        assert!(scores[0].is_finite() && scores[0] < PENALTY);
        assert_eq!(scores[1], PENALTY);
        assert!(scores[2].is_finite() && scores[2] < PENALTY);
    }

    #[test]
    fn weight_scales_the_score() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let run = Utf8Path::new("run");
        let unit = Constraint::new(ConstraintKind::SmfZ0);
        let doubled = unit.clone().with_weight(2.0).unwrap();

        let a = evaluate_constraint(&ctx, &unit, &chi2, run, &[0], None).unwrap();
        let b = evaluate_constraint(&ctx, &doubled, &chi2, run, &[0], None).unwrap();
        assert_relative_eq!(b, 2.0 * a, max_relative = 1e-12);
    }

    #[test]
    fn non_finite_and_empty_selection_are_errors() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx();
        let run = Utf8Path::new("run");
        let constraint = Constraint::new(ConstraintKind::Himf);

        let nan_test = |_: &[f64], _: &[f64], _: &[f64]| f64::NAN;
        let err = evaluate_constraint(&ctx, &constraint, &nan_test, run, &[0], None).unwrap_err();
        assert!(matches!(err, ConstraintError::NonFiniteScore(_)));
        let scores = evaluate(&ctx, &[constraint], &nan_test, run, &[0], None);
        assert_eq!(scores, vec![PENALTY]);

        // Fixture HIMF stops at 10.8 in h70 units.
        let narrow = Constraint::new(ConstraintKind::Himf)
            .with_domain(crate::constants::Domain::new(11.5, 12.0))
            .unwrap();
        let err = evaluate_constraint(&ctx, &narrow, &chi2, run, &[0], None).unwrap_err();
        assert_eq!(err, ConstraintError::EmptySelection(narrow.to_string()));
    }

    #[test]
    fn particles_are_scored_independently() {
        let mut fixture = Fixture::new();
        fixture.reader.insert("run2", 199, 0, galaxies(500));
        let constraints = parse("HIMF,SMF_z0").unwrap();
        let results = evaluate_particles(
            &fixture.ctx(),
            &constraints,
            &StatTestKind::StudentT,
            &["run", "missing", "run2"],
            &[0],
            None,
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[1], vec![PENALTY, PENALTY]);
        assert!(results[0].iter().chain(&results[2]).all(|s| *s < PENALTY));
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = ConstraintError::ObservationIo {
            path: "obs/missing.dat".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let chain = error_chain(&err);
        assert!(chain.contains("obs/missing.dat"));
        assert!(chain.ends_with(": gone"));
    }

    #[test]
    fn printf_style_scientific_notation() {
        assert_eq!(format_sci(1e20), "1.000000e+20");
        assert_eq!(format_sci(0.0), "0.000000e+00");
        assert_eq!(format_sci(1.5e-3), "1.500000e-03");
        assert_eq!(format_sci(-2.5e100), "-2.500000e+100");
        assert_eq!(format_sci(123.456), "1.234560e+02");
    }

    #[test]
    fn results_table_flags_first_minimum() {
        let constraints = parse("HIMF,SMF_z0").unwrap();
        let results = vec![vec![1.0, 2.0], vec![0.5, 1.0], vec![1.0, 0.5]];
        let table = format_results_table(&constraints, &results);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Particle evaluation results per-particle, per-constraint:");
        assert_eq!(
            lines[1],
            format!("   {:>20} {:>20} {:>20} Min", "HIMF(7.0-12.0)", "SMF_z0(8.0-13.0)", "Total")
        );
        assert_eq!(lines[2], format!("   {} ===", vec!["=".repeat(20); 3].join(" ")));
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[4],
            format!(
                " 1 {:>20} {:>20} {:>20}  *",
                "5.000000e-01", "1.000000e+00", "1.500000e+00"
            )
        );
        // Particle 2 ties with particle 1 but is not flagged.
        assert!(lines[5].ends_with("   "));
        assert_eq!(lines.iter().filter(|l| l.ends_with('*')).count(), 1);
    }

    #[test]
    fn long_constraint_names_are_truncated() {
        let constraints = parse("SMF_z0(9-12)*2,HIMF").unwrap();
        let table = format_results_table(&constraints, &[vec![1.0, 1.0]]);
        let header = table.lines().nth(1).unwrap();
        assert!(header.starts_with("   SMF_z0(9.0-12.0), we "));
        assert_eq!(ParticleSummary::new(&[vec![1.0, 1.0]]).best_particle, Some(0));
        assert_eq!(ParticleSummary::new(&[]).best_particle, None);
    }
}
