#![allow(dead_code)]

use camino::Utf8PathBuf;
use shark_constraints::{
    binning::Binning,
    catalog::{Catalog, MemoryCatalogReader, RedshiftTable},
    model_data::GALAXIES,
    observations::ObservationStore,
    EvaluationContext,
};

pub const H0: f64 = 0.6751;
pub const SNAP_Z0: u32 = 199;
pub const SNAP_Z1: u32 = 156;

pub fn data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

/// `n` galaxies log-uniformly spread in stellar mass over `[lo, hi)` and in HI mass one dex lower.
pub fn galaxies(n: usize, volume: f64, lo: f64, hi: f64) -> Catalog {
    let masses = |offset: f64| -> Vec<f64> {
        (0..n)
            .map(|i| H0 * 10f64.powf(lo - offset + (hi - lo) * i as f64 / n as f64))
            .collect()
    };
    Catalog::new(H0, volume)
        .with_field(GALAXIES, "mstars_disk", masses(0.0))
        .with_field(GALAXIES, "mstars_bulge", vec![0.0; n])
        .with_field(GALAXIES, "matom_disk", masses(1.0))
        .with_field(GALAXIES, "matom_bulge", vec![0.0; n])
}

pub struct Setup {
    pub binning: Binning,
    pub store: ObservationStore,
    pub reader: MemoryCatalogReader,
    pub table: RedshiftTable,
}

impl Setup {
    /// Model run `run` with one subvolume at z = 0 and z = 1.
    pub fn new() -> Self {
        let mut reader = MemoryCatalogReader::new();
        reader.insert("run", SNAP_Z0, 0, galaxies(3000, 1.0e4, 7.5, 12.5));
        reader.insert("run", SNAP_Z1, 0, galaxies(1500, 1.0e4, 7.8, 12.0));
        Setup {
            binning: Binning::shark_default(),
            store: ObservationStore::new(data_dir()),
            reader,
            table: [(0.0, SNAP_Z0), (1.0, SNAP_Z1)].into_iter().collect(),
        }
    }

    pub fn ctx(&self) -> EvaluationContext<'_> {
        EvaluationContext::new(&self.binning, &self.store, &self.reader, &self.table)
    }
}
