//! Stellar mass functions at z = 0 (GAMA II) and z = 1 (Wright et al. 2018).
use crate::{
    constants::{Domain, HOBS, LOG_LOWER_BOUND_FLOOR},
    constraint_errors::ConstraintError,
    observations::{ObservationSet, ObservationStore},
};

pub(super) const DOMAIN: Domain = Domain::new(8.0, 13.0);

const GAMA_TABLE: &str = "mf/SMF/GAMAII_BBD_GSMFs.dat";
const WRIGHT_TABLE: &str = "mf/SMF/Wright18_CombinedSMF.dat";

/// Redshift slice of the combined Wright et al. table compared at z = 1.
const WRIGHT_Z: f64 = 1.0;

/// GAMA II, linear densities.
///
/// Rows with a non-positive density are dropped. Lower bounds that would go
/// negative are floored at [`LOG_LOWER_BOUND_FLOOR`] before taking the log.
pub(super) fn observations_z0(store: &ObservationStore) -> Result<ObservationSet, ConstraintError> {
    let [lm, p, dp_dn, dp_up] = store.load_array(GAMA_TABLE, [0, 1, 2, 3])?;

    let raw = ObservationSet::new(lm, p, dp_dn, dp_up);
    let kept = raw.clone().retain_rows(|i| raw.y[i] > 0.0);

    let y: Vec<f64> = kept.y.iter().map(|p| p.log10()).collect();
    let y_err_down = kept
        .y
        .iter()
        .zip(&kept.y_err_down)
        .zip(&y)
        .map(|((p, dn), log_p)| {
            let lower = p - dn;
            let lower = if lower < 0.0 { LOG_LOWER_BOUND_FLOOR } else { lower };
            log_p - lower.log10()
        })
        .collect();
    let y_err_up = kept
        .y
        .iter()
        .zip(&kept.y_err_up)
        .zip(&y)
        .map(|((p, up), log_p)| (p + up).log10() - log_p)
        .collect();

    Ok(ObservationSet::new(kept.x, y, y_err_down, y_err_up))
}

/// Wright et al. combined table, restricted to its z = 1 slice and moved to `h = 1` units.
pub(super) fn observations_z1(store: &ObservationStore) -> Result<ObservationSet, ConstraintError> {
    let [z, lm, p, dp_dn, dp_up] = store.load_array(WRIGHT_TABLE, [0, 1, 2, 3, 4])?;

    let log_h = HOBS.log10();
    let x = lm.iter().map(|m| m - log_h).collect();
    let y = p.iter().map(|p| p - 3.0 * log_h).collect();

    Ok(ObservationSet::new(x, y, dp_dn, dp_up).retain_rows(|i| z[i] == WRIGHT_Z))
}
