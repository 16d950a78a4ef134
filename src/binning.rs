//! # Binning configuration
//!
//! Fixed coordinate grids used to discretize continuous physical quantities
//! (log stellar mass, log HI mass, log specific star formation rate) into
//! histogram domains.
//!
//! ## Overview
//! -----------------
//! A [`BinGrid`] is described by a lower bound, an upper bound and a constant
//! step. Its lower edges follow the `arange` convention (`low, low + step, …`
//! strictly below `upp`), so the number of bins is `ceil((upp - low) / step)`.
//! Bin centers sit half a step above each lower edge.
//!
//! A [`Binning`] groups the three grids shared by every constraint. It is built
//! once (see [`Binning::shark_default`]) and then handed out by reference: no
//! component ever mutates it.
//!
//! ## Histogram convention
//! -----------------
//! [`BinGrid::bin_index`] uses half-open bins `[a, b)`, except the last bin which
//! is closed `[a, b]`. Values outside the grid (and NaN) map to `None`.
//!
//! ## See also
//! ------------
//! * [`crate::model_data`] – Accumulates catalog fields into histograms on these grids.

/// Regular one-dimensional grid of bins.
#[derive(Debug, Clone, PartialEq)]
pub struct BinGrid {
    low: f64,
    upp: f64,
    step: f64,
    edges: Vec<f64>,
    centers: Vec<f64>,
}

impl BinGrid {
    /// Build a grid covering `[low, upp)` with bins of width `step`.
    ///
    /// Arguments
    /// -----------------
    /// * `low`: Lower edge of the first bin.
    /// * `upp`: Upper limit; the last lower edge is strictly below it.
    /// * `step`: Bin width, must be strictly positive.
    ///
    /// Panics
    /// ----------
    /// * If `step <= 0` or `upp <= low`. Grids are compile-time configuration, a
    ///   wrong one is a programming error.
    /// * If the range is narrower than the rounding tolerance and holds no bin.
    pub fn new(low: f64, upp: f64, step: f64) -> Self {
        assert!(step > 0.0, "bin step must be positive");
        assert!(upp > low, "bin upper limit must be above the lower one");

        // Guard against (upp - low) / step landing a hair above an integer.
        let n = ((upp - low) / step - 1e-9).ceil() as usize;
        assert!(n >= 1, "bin grid must hold at least one bin");
        let edges: Vec<f64> = (0..n).map(|i| low + i as f64 * step).collect();
        let centers = edges.iter().map(|e| e + step / 2.0).collect();

        BinGrid {
            low,
            upp,
            step,
            edges,
            centers,
        }
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn upp(&self) -> f64 {
        self.upp
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Lower edge of every bin.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Center of every bin (`edge + step / 2`).
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Index of the bin holding `x`, if any.
    ///
    /// The histogram range is `[low, upp]`; the last bin is closed on the right.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !x.is_finite() || x < self.low || x > self.upp {
            return None;
        }
        let idx = ((x - self.low) / self.step).floor() as usize;
        Some(idx.min(self.len() - 1))
    }

    /// Count how many `values` fall in each bin.
    pub fn histogram<I>(&self, values: I) -> Vec<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0.0; self.len()];
        for idx in values.into_iter().filter_map(|v| self.bin_index(v)) {
            counts[idx] += 1.0;
        }
        counts
    }
}

/// The grids shared by all constraints of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Binning {
    /// Log mass grid used by the mass functions.
    pub mass: BinGrid,
    /// Coarser log mass grid.
    pub mass_coarse: BinGrid,
    /// Log specific star formation rate grid.
    pub ssfr: BinGrid,
}

impl Binning {
    /// Grids matching the standard shark analysis scripts.
    pub fn shark_default() -> Self {
        Binning {
            mass: BinGrid::new(5.0, 14.0, 0.2),
            mass_coarse: BinGrid::new(5.0, 14.0, 0.3),
            ssfr: BinGrid::new(-6.0, 4.0, 0.2),
        }
    }
}

impl Default for Binning {
    fn default() -> Self {
        Self::shark_default()
    }
}
