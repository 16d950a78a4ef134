//! # Data alignment & reduction
//!
//! Bring an observational curve and a model curve onto the same x grid so that
//! a statistical test can compare them point by point.
//!
//! ## Pipeline
//! -----------------
//! 1. Sort the observation by x (y and both error bounds follow the same permutation).
//! 2. Sort the model by x.
//! 3. Linearly interpolate the model onto the observation x values. Outside the
//!    model x range the boundary model value is used (no exclusion).
//! 4. Keep the observation points whose x lies inside the constraint domain (inclusive).
//! 5. Merge the asymmetric errors into `max(|down|, |up|)`.
//!
//! The reduction is pure: same inputs, same [`AlignedSample`].
use itertools::{izip, Itertools};

use crate::{
    constants::Domain, constraint_errors::ConstraintError, observations::ObservationSet,
};

/// Model curve as `(x, y)` pairs, in any order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelCurve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ModelCurve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len(), "model x/y length mismatch");
        ModelCurve { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Observation and model restricted to the domain, ready for a statistical test.
///
/// Invariants
/// -----------------
/// * All vectors have the same length.
/// * `x` is sorted ascending and lies inside the domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignedSample {
    pub x: Vec<f64>,
    pub y_obs: Vec<f64>,
    pub y_mod: Vec<f64>,
    pub err: Vec<f64>,
}

impl AlignedSample {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Everything produced along the way, used by plotting collaborators.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alignment {
    /// Observation sorted by x.
    pub observation: ObservationSet,
    /// Model sorted by x.
    pub model: ModelCurve,
    /// Model interpolated at every (sorted) observation x.
    pub y_mod_interp: Vec<f64>,
    /// Domain-restricted result.
    pub selected: AlignedSample,
}

/// Indices that sort `x` ascending (NaN last).
fn argsort(x: &[f64]) -> Vec<usize> {
    (0..x.len())
        .sorted_by(|&a, &b| x[a].total_cmp(&x[b]))
        .collect()
}

fn permute(values: &[f64], order: &[usize]) -> Vec<f64> {
    order.iter().map(|&i| values[i]).collect()
}

/// Sort an observation by x, moving y and both error bounds consistently.
pub fn sort_observation(obs: &ObservationSet) -> ObservationSet {
    let order = argsort(&obs.x);
    ObservationSet::new(
        permute(&obs.x, &order),
        permute(&obs.y, &order),
        permute(&obs.y_err_down, &order),
        permute(&obs.y_err_up, &order),
    )
}

/// Sort a model curve by x.
pub fn sort_model(model: &ModelCurve) -> ModelCurve {
    let order = argsort(&model.x);
    ModelCurve::new(permute(&model.x, &order), permute(&model.y, &order))
}

/// One-dimensional piecewise linear interpolation.
///
/// `xp` must be sorted ascending. Points below `xp[0]` take `fp[0]`, points above
/// the last knot take the last value.
///
/// Return
/// ----------
/// * The interpolated values, or [`ConstraintError::EmptyModel`] if `xp` is empty.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Result<Vec<f64>, ConstraintError> {
    debug_assert_eq!(xp.len(), fp.len(), "xp/fp length mismatch");
    let (Some(&x_first), Some(&x_last)) = (xp.first(), xp.last()) else {
        return Err(ConstraintError::EmptyModel);
    };
    let (f_first, f_last) = (fp[0], fp[fp.len() - 1]);

    Ok(x.iter()
        .map(|&xi| {
            if xi.is_nan() {
                return f64::NAN;
            }
            if xi <= x_first {
                return f_first;
            }
            if xi >= x_last {
                return f_last;
            }
            // First knot strictly above xi; exists since xi < x_last.
            let j = xp.partition_point(|&k| k <= xi);
            let (x0, x1) = (xp[j - 1], xp[j]);
            let (f0, f1) = (fp[j - 1], fp[j]);
            if x1 == x0 {
                return f1;
            }
            f0 + (xi - x0) * (f1 - f0) / (x1 - x0)
        })
        .collect())
}

/// Combine asymmetric error bounds into one magnitude per point.
#[inline]
pub fn combine_errors(err_down: f64, err_up: f64) -> f64 {
    err_down.abs().max(err_up.abs())
}

/// Run the full alignment pipeline.
///
/// Arguments
/// -----------------
/// * `observation`: Observational curve, unsorted.
/// * `model`: Model curve, unsorted.
/// * `domain`: Inclusive x range kept in the result.
///
/// Return
/// ----------
/// * The [`Alignment`] holding intermediate curves and the selected sample.
/// * [`ConstraintError::EmptyModel`] if the model curve has no point.
pub fn align(
    observation: &ObservationSet,
    model: &ModelCurve,
    domain: &Domain,
) -> Result<Alignment, ConstraintError> {
    let observation = sort_observation(observation);
    let model = sort_model(model);

    let y_mod_interp = interp(&observation.x, &model.x, &model.y)?;

    let mut selected = AlignedSample::default();
    for (&x, &y, &dn, &up, &ym) in izip!(
        &observation.x,
        &observation.y,
        &observation.y_err_down,
        &observation.y_err_up,
        &y_mod_interp
    ) {
        if domain.contains(x) {
            selected.x.push(x);
            selected.y_obs.push(y);
            selected.y_mod.push(ym);
            selected.err.push(combine_errors(dn, up));
        }
    }

    Ok(Alignment {
        observation,
        model,
        y_mod_interp,
        selected,
    })
}
