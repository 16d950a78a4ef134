//! # Model data loader
//!
//! Reduce raw per-galaxy catalog columns into binned mass functions.
//!
//! ## Overview
//! -----------------
//! For every redshift a constraint is evaluated at, the matching snapshot is read
//! through a [`CatalogReader`], the stellar and HI masses of each galaxy are binned
//! on the mass grid of [`Binning`], and the counts are turned into number densities
//! (per comoving `Mpc^3` per dex) that are **added** into a [`ModelHistograms`]
//! accumulator. Once all redshifts are in, non-empty bins are converted to `log10`.
//!
//! ## Units & Conventions
//! -----------------
//! * Masses in the catalog are in `Msun/h`; binned quantities are `log10(M / Msun)`.
//! * HI mass is the atomic gas mass times the hydrogen fraction [`XH`].
//! * Densities are normalised by `volume / h0^3` and by the bin width.
//! * Zero and negative bins are **left untouched** by the log transform; consumers
//!   must filter them out rather than rely on a clamped value.
//!
//! ## See also
//! ------------
//! * [`crate::catalog`] – Reader interface and snapshot lookup.
//! * [`crate::constraints`] – Selection of the valid bins of each histogram.
use camino::Utf8Path;
use nalgebra::DVector;
use tracing::debug;

use crate::{
    binning::{BinGrid, Binning},
    catalog::{Catalog, CatalogReader, FieldRequest, RedshiftTable, Subvolumes},
    constants::{HubbleParam, Redshift, XH},
    constraint_errors::ConstraintError,
};

/// Catalog table holding the galaxy properties.
pub const GALAXIES: &str = "galaxies";

const GALAXY_FIELDS: [&str; 4] = ["mstars_disk", "mstars_bulge", "matom_disk", "matom_bulge"];

/// Mass function histograms on the mass grid.
///
/// Values are densities while accumulating, `log10` densities after
/// [`ModelHistograms::take_logs`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHistograms {
    /// Stellar mass function.
    pub smf: DVector<f64>,
    /// HI mass function.
    pub himf: DVector<f64>,
}

impl ModelHistograms {
    /// Freshly allocated, all-zero accumulator.
    pub fn zeros(grid: &BinGrid) -> Self {
        ModelHistograms {
            smf: DVector::zeros(grid.len()),
            himf: DVector::zeros(grid.len()),
        }
    }

    /// Replace every strictly positive bin by its `log10`.
    pub fn take_logs(&mut self) {
        for hist in [&mut self.smf, &mut self.himf] {
            hist.iter_mut()
                .filter(|v| **v > 0.0)
                .for_each(|v| *v = v.log10());
        }
    }
}

/// Columns required from each snapshot.
pub fn galaxy_fields() -> FieldRequest {
    FieldRequest::new().with(GALAXIES, &GALAXY_FIELDS)
}

/// `log10((a + b) / h0)` for every galaxy with a positive total.
fn log_total_mass<'a>(
    catalog: &'a Catalog,
    first: &str,
    second: &str,
    scale: f64,
) -> Result<impl Iterator<Item = f64> + 'a, ConstraintError> {
    let a = catalog.field(GALAXIES, first)?;
    let b = catalog.field(GALAXIES, second)?;
    if a.len() != b.len() {
        return Err(ConstraintError::FieldLengthMismatch {
            field: second.to_string(),
            expected: a.len(),
            found: b.len(),
        });
    }

    let h0 = catalog.h0;
    Ok(a.iter()
        .zip(b)
        .map(move |(x, y)| scale * (x + y))
        .filter(|m| *m > 0.0)
        .map(move |m| (m / h0).log10()))
}

/// Bin one snapshot and add its mass functions into `hists`.
///
/// Arguments
/// -----------------
/// * `catalog`: Galaxies of one snapshot, with the columns of [`galaxy_fields`].
/// * `grid`: Mass grid the histograms are defined on.
/// * `hists`: Accumulator, mutated in place.
///
/// Return
/// ----------
/// * `Ok(())`, or an error if a column is missing or the cosmology/volume is not usable.
pub fn accumulate_mass_functions(
    catalog: &Catalog,
    grid: &BinGrid,
    hists: &mut ModelHistograms,
) -> Result<(), ConstraintError> {
    if !(catalog.h0 > 0.0) {
        return Err(ConstraintError::Catalog(format!(
            "invalid h0 in catalog: {}",
            catalog.h0
        )));
    }
    if !(catalog.volume > 0.0) {
        return Err(ConstraintError::Catalog(format!(
            "invalid catalog volume: {}",
            catalog.volume
        )));
    }

    // (Mpc/h)^3 -> Mpc^3, and per dex.
    let norm = catalog.volume / catalog.h0.powi(3) * grid.step();

    let smf = grid.histogram(log_total_mass(catalog, "mstars_disk", "mstars_bulge", 1.0)?);
    let himf = grid.histogram(log_total_mass(catalog, "matom_disk", "matom_bulge", XH)?);

    hists.smf += DVector::from_vec(smf) / norm;
    hists.himf += DVector::from_vec(himf) / norm;
    Ok(())
}

/// Load and bin the model mass functions at the given redshifts.
///
/// Arguments
/// -----------------
/// * `reader`: Catalog back-end.
/// * `redshift_table`: Redshift → snapshot lookup.
/// * `modeldir`: Output directory of the model run.
/// * `redshifts`: Redshifts to accumulate, in order.
/// * `subvolumes`: Subvolume selection forwarded to the reader.
/// * `binning`: Grids; the mass grid is used.
///
/// Return
/// ----------
/// * `(h0, histograms)` where `h0` comes from the last snapshot read and the
///   histograms hold `log10` densities in their non-empty bins.
pub fn load_model_data(
    reader: &dyn CatalogReader,
    redshift_table: &RedshiftTable,
    modeldir: &Utf8Path,
    redshifts: &[Redshift],
    subvolumes: &Subvolumes,
    binning: &Binning,
) -> Result<(HubbleParam, ModelHistograms), ConstraintError> {
    let fields = galaxy_fields();
    let mut hists = ModelHistograms::zeros(&binning.mass);
    let mut h0 = None;

    for &z in redshifts {
        let snapshot = redshift_table.snapshot(z)?;
        let catalog = reader.read(modeldir, snapshot, &fields, subvolumes)?;
        debug!(
            modeldir = %modeldir,
            z,
            snapshot,
            subvolumes = %subvolumes,
            h0 = catalog.h0,
            "binning model catalog"
        );
        accumulate_mass_functions(&catalog, &binning.mass, &mut hists)?;
        h0 = Some(catalog.h0);
    }

    let h0 = h0.ok_or_else(|| ConstraintError::Catalog("no redshift requested".to_string()))?;
    hists.take_logs();
    Ok((h0, hists))
}
