//! HI mass function at z = 0 (Jones et al. 2018, ALFALFA).
//!
//! The table is in `h70` units: masses scale as `h^-2`, densities as `h^3`.
use crate::{
    constants::{Domain, HubbleParam, HOBS},
    constraint_errors::ConstraintError,
    observations::{ObservationSet, ObservationStore},
};

pub(super) const DOMAIN: Domain = Domain::new(7.0, 12.0);

const TABLE: &str = "mf/GasMF/HIMF_Jones18.dat";

/// Columns: `log MHI`, `log phi`, `log phi` lower bound, `log phi` upper bound.
///
/// The bounds are turned into distances from the central value, then both axes
/// are moved from the survey cosmology to `h0`.
pub(super) fn observations(
    store: &ObservationStore,
    h0: HubbleParam,
) -> Result<ObservationSet, ConstraintError> {
    let [lm, p, p_dn, p_up] = store.load_array(TABLE, [0, 1, 2, 3])?;

    let x_shift = (HOBS.powi(2) / h0.powi(2)).log10();
    let y_shift = (h0.powi(3) / HOBS.powi(3)).log10();

    let y_err_down = p.iter().zip(&p_dn).map(|(p, dn)| p - dn).collect();
    let y_err_up = p.iter().zip(&p_up).map(|(p, up)| up - p).collect();
    let x = lm.iter().map(|m| m + x_shift).collect();
    let y = p.iter().map(|p| p + y_shift).collect();

    Ok(ObservationSet::new(x, y, y_err_down, y_err_up))
}
