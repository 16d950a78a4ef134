//! # Observational constraints
//!
//! A [`Constraint`] is one comparison between the model and an observational
//! dataset: which redshifts the model is read at, which x range is compared,
//! and how much the comparison weighs in the total fitness.
//!
//! ## Variants
//! -----------------
//! The set of comparisons is closed and registered in [`ConstraintKind`]:
//!
//! | Name     | Default domain | z     | Model histogram | Observation               |
//! |----------|----------------|-------|-----------------|---------------------------|
//! | `HIMF`   | 7 – 12         | `[0]` | HI mass function | Jones et al. (2018)      |
//! | `SMF_z0` | 8 – 13         | `[0]` | stellar mass function | GAMA II (Baldry et al.) |
//! | `SMF_z1` | 8 – 13         | `[1]` | stellar mass function | Wright et al. (2018)  |
//!
//! Each variant provides two operations:
//! * [`ConstraintKind::get_obs_x_y_err`] – load and cosmology-correct the observation.
//! * [`ConstraintKind::get_model_x_y`] – pick the valid bins of the relevant model histogram.
//!
//! Everything else (loading the model, aligning, plotting) is shared and lives in
//! [`Constraint::get_data`].
//!
//! ## Display
//! -----------------
//! `Name(lo-hi)`, followed by `, weight=W, rel_weight=R` when the weight is not 1.
//! Used for logs and figure names.
//!
//! ## See also
//! ------------
//! * [`spec_parser`] – Textual specification of a constraint set.
//! * [`crate::alignment`] – The reduction applied by [`Constraint::get_data`].
//! * [`crate::evaluation`] – Scoring of a constraint set against model runs.
mod himf;
mod smf;
pub mod spec_parser;

use std::{fmt, str::FromStr};

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::{
    alignment::{align, AlignedSample, Alignment, ModelCurve},
    binning::BinGrid,
    catalog::Subvolumes,
    constants::{Domain, HubbleParam, Redshift, Subvolume},
    constraint_errors::ConstraintError,
    evaluation::EvaluationContext,
    model_data::{load_model_data, ModelHistograms},
    observations::{ObservationSet, ObservationStore},
    plotting::PlotData,
    stat_tests::{chi2, student_t},
};

pub use spec_parser::{parse, ConstraintSet};

/// Registry of the available comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// HI mass function at z = 0.
    Himf,
    /// Stellar mass function at z = 0.
    SmfZ0,
    /// Stellar mass function at z = 1.
    SmfZ1,
}

impl ConstraintKind {
    /// Every registered variant.
    pub const ALL: [ConstraintKind; 3] =
        [ConstraintKind::Himf, ConstraintKind::SmfZ0, ConstraintKind::SmfZ1];

    /// Name used in specifications, logs and figure names.
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintKind::Himf => "HIMF",
            ConstraintKind::SmfZ0 => "SMF_z0",
            ConstraintKind::SmfZ1 => "SMF_z1",
        }
    }

    /// Widest domain the comparison supports.
    pub fn default_domain(&self) -> Domain {
        match self {
            ConstraintKind::Himf => himf::DOMAIN,
            ConstraintKind::SmfZ0 | ConstraintKind::SmfZ1 => smf::DOMAIN,
        }
    }

    /// Redshifts the model must be read at.
    pub fn redshifts(&self) -> &'static [Redshift] {
        match self {
            ConstraintKind::Himf => &[0.0],
            ConstraintKind::SmfZ0 => &[0.0],
            ConstraintKind::SmfZ1 => &[1.0],
        }
    }

    /// Load the observational curve, corrected to the model cosmology.
    ///
    /// Arguments
    /// -----------------
    /// * `store`: Root of the observational datasets.
    /// * `h0`: Dimensionless Hubble parameter of the model run.
    ///
    /// Return
    /// ----------
    /// * The unsorted observation, or the I/O / parse error of its table.
    pub fn get_obs_x_y_err(
        &self,
        store: &ObservationStore,
        h0: HubbleParam,
    ) -> Result<ObservationSet, ConstraintError> {
        match self {
            ConstraintKind::Himf => himf::observations(store, h0),
            ConstraintKind::SmfZ0 => smf::observations_z0(store),
            ConstraintKind::SmfZ1 => smf::observations_z1(store),
        }
    }

    /// Model curve compared with the observation.
    ///
    /// Only bins holding a valid logged density are returned, so the curve may be
    /// shorter than the grid.
    pub fn get_model_x_y(&self, grid: &BinGrid, hists: &ModelHistograms) -> ModelCurve {
        match self {
            ConstraintKind::Himf => valid_bins(grid.centers(), hists.himf.as_slice()),
            ConstraintKind::SmfZ0 | ConstraintKind::SmfZ1 => {
                valid_bins(grid.centers(), hists.smf.as_slice())
            }
        }
    }
}

impl FromStr for ConstraintKind {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstraintKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConstraintError::UnknownConstraint(s.to_string()))
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bins whose logged density is negative.
///
/// Empty bins keep a raw value of zero after the log transform and are skipped;
/// densities are far below unity so every populated bin is negative.
fn valid_bins(centers: &[f64], logged: &[f64]) -> ModelCurve {
    let (x, y) = centers
        .iter()
        .zip(logged)
        .filter(|&(_, &y)| y < 0.0)
        .map(|(&x, &y)| (x, y))
        .unzip();
    ModelCurve::new(x, y)
}

/// One configured comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    kind: ConstraintKind,
    domain: Domain,
    weight: f64,
    rel_weight: f64,
    convert_to_multiple_batches: bool,
}

impl Constraint {
    /// Constraint with its default domain and a unit weight.
    pub fn new(kind: ConstraintKind) -> Self {
        Constraint {
            kind,
            domain: kind.default_domain(),
            weight: 1.0,
            rel_weight: 1.0,
            convert_to_multiple_batches: true,
        }
    }

    /// Narrow the comparison domain.
    ///
    /// Return
    /// ----------
    /// * The updated constraint, or a validation error if `domain` leaves the
    ///   default domain of the variant or is inverted.
    pub fn with_domain(mut self, domain: Domain) -> Result<Self, ConstraintError> {
        let allowed = self.kind.default_domain();
        if domain.lo < allowed.lo {
            return Err(ConstraintError::DomainLowOutOfRange {
                requested: domain.lo,
                allowed: allowed.lo,
            });
        }
        if domain.hi > allowed.hi {
            return Err(ConstraintError::DomainUpOutOfRange {
                requested: domain.hi,
                allowed: allowed.hi,
            });
        }
        if domain.lo > domain.hi {
            return Err(ConstraintError::InvertedDomain {
                lo: domain.lo,
                hi: domain.hi,
            });
        }
        self.domain = domain;
        Ok(self)
    }

    /// Set the user weight (finite, non-negative).
    pub fn with_weight(mut self, weight: f64) -> Result<Self, ConstraintError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConstraintError::InvalidWeight(weight.to_string()));
        }
        self.weight = weight;
        Ok(self)
    }

    /// Read several subvolumes separately instead of the merged batch.
    pub fn with_multiple_batches(mut self, convert: bool) -> Self {
        self.convert_to_multiple_batches = convert;
        self
    }

    pub(crate) fn set_rel_weight(&mut self, rel_weight: f64) {
        self.rel_weight = rel_weight;
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn z(&self) -> &'static [Redshift] {
        self.kind.redshifts()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn rel_weight(&self) -> f64 {
        self.rel_weight
    }

    pub fn convert_to_multiple_batches(&self) -> bool {
        self.convert_to_multiple_batches
    }

    /// See [`ConstraintKind::get_obs_x_y_err`].
    pub fn get_obs_x_y_err(
        &self,
        store: &ObservationStore,
        h0: HubbleParam,
    ) -> Result<ObservationSet, ConstraintError> {
        self.kind.get_obs_x_y_err(store, h0)
    }

    /// See [`ConstraintKind::get_model_x_y`].
    pub fn get_model_x_y(&self, grid: &BinGrid, hists: &ModelHistograms) -> ModelCurve {
        self.kind.get_model_x_y(grid, hists)
    }

    /// Load the model histograms this constraint needs from one model run.
    pub fn load_model_data(
        &self,
        ctx: &EvaluationContext<'_>,
        modeldir: &Utf8Path,
        subvols: &[Subvolume],
    ) -> Result<(HubbleParam, ModelHistograms), ConstraintError> {
        let subvolumes = Subvolumes::select(subvols, self.convert_to_multiple_batches);
        load_model_data(
            ctx.catalogs,
            ctx.redshift_table,
            modeldir,
            self.z(),
            &subvolumes,
            ctx.binning,
        )
    }

    /// Raw, unsorted observation and model curves for one model run.
    pub fn get_raw_data(
        &self,
        ctx: &EvaluationContext<'_>,
        modeldir: &Utf8Path,
        subvols: &[Subvolume],
    ) -> Result<(ObservationSet, ModelCurve), ConstraintError> {
        let (h0, hists) = self.load_model_data(ctx, modeldir, subvols)?;
        let observation = self.get_obs_x_y_err(ctx.observations, h0)?;
        let model = self.get_model_x_y(&ctx.binning.mass, &hists);
        Ok((observation, model))
    }

    /// Observation and model aligned on the observation grid, within the domain.
    ///
    /// Arguments
    /// -----------------
    /// * `ctx`: Shared evaluation resources (grids, readers, plotter).
    /// * `modeldir`: Output directory of the model run.
    /// * `subvols`: Subvolumes to read.
    /// * `plot_outputdir`: When set, the curves are also handed to the context plotter.
    ///
    /// Return
    /// ----------
    /// * The [`AlignedSample`] fed to the statistical test.
    pub fn get_data(
        &self,
        ctx: &EvaluationContext<'_>,
        modeldir: &Utf8Path,
        subvols: &[Subvolume],
        plot_outputdir: Option<&Utf8Path>,
    ) -> Result<AlignedSample, ConstraintError> {
        let (observation, model) = self.get_raw_data(ctx, modeldir, subvols)?;
        let alignment = align(&observation, &model, &self.domain)?;
        debug!(
            constraint = %self,
            observed = observation.len(),
            model_bins = model.len(),
            selected = alignment.selected.len(),
            "aligned model and observation"
        );

        if let Some(outdir) = plot_outputdir {
            self.plot(ctx, outdir, &alignment)?;
        }

        Ok(alignment.selected)
    }

    fn plot(
        &self,
        ctx: &EvaluationContext<'_>,
        outdir: &Utf8Path,
        alignment: &Alignment,
    ) -> Result<(), ConstraintError> {
        let Some(plotter) = ctx.plotter else {
            warn!(constraint = %self, "plot requested but no plotter configured");
            return Ok(());
        };

        let sel = &alignment.selected;
        let data = PlotData {
            title: self.to_string(),
            domain: self.domain,
            alignment,
            chi2: chi2(&sel.y_obs, &sel.y_mod, &sel.err),
            student_t: student_t(&sel.y_obs, &sel.y_mod, &sel.err),
        };
        plotter.plot(outdir, &data)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.domain)?;
        if self.weight != 1.0 {
            write!(
                f,
                ", weight={:.2}, rel_weight={:.2}",
                self.weight, self.rel_weight
            )?;
        }
        Ok(())
    }
}
