//! # Constants and type definitions for shark_constraints
//!
//! This module centralizes the **physical constants**, **fixed numerical policies**, and
//! **common type aliases** used by the constraint evaluation engine.
//!
//! ## Overview
//!
//! - Cosmology and composition constants used to rescale observational data
//! - The penalty score handed to the optimizer when a constraint cannot be evaluated
//! - Type aliases documenting the physical meaning of plain `f64`/`u32` values
//! - [`Domain`], the inclusive x-range over which a constraint is compared

// -------------------------------------------------------------------------------------------------
// Physical constants
// -------------------------------------------------------------------------------------------------

/// Dimensionless Hubble parameter assumed by the reference observational datasets
pub const HOBS: f64 = 0.7;

/// Hydrogen mass fraction, converts atomic gas mass into HI mass
pub const XH: f64 = 0.72;

/// Floor applied to linear lower error bounds before taking their logarithm
pub const LOG_LOWER_BOUND_FLOOR: f64 = 1e-4;

// -------------------------------------------------------------------------------------------------
// Evaluation policy
// -------------------------------------------------------------------------------------------------

/// Score assigned to a constraint whose evaluation failed.
///
/// Worse than any real fit, yet finite so the optimizer can still rank particles.
pub const PENALTY: f64 = 1e20;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Dimensionless Hubble parameter `h0 = H0 / (100 km/s/Mpc)`
pub type HubbleParam = f64;
/// Redshift value used as key of the snapshot table
pub type Redshift = f64;
/// Discrete simulation output identifier
pub type SnapshotId = u32;
/// Spatial partition index of the simulation box
pub type Subvolume = u32;

// -------------------------------------------------------------------------------------------------
// Comparison domain
// -------------------------------------------------------------------------------------------------

/// Inclusive range `[lo, hi]` over the x-axis of a constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub lo: f64,
    pub hi: f64,
}

impl Domain {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Domain { lo, hi }
    }

    /// `true` when `x` lies inside the domain, bounds included.
    #[inline]
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lo && x <= self.hi
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}-{:.1}", self.lo, self.hi)
    }
}

impl From<(f64, f64)> for Domain {
    fn from((lo, hi): (f64, f64)) -> Self {
        Domain { lo, hi }
    }
}
