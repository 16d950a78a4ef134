//! # Constraint specification parser
//!
//! Turns a comma-separated textual specification into a validated
//! [`ConstraintSet`].
//!
//! ## Grammar
//! -----------------
//! ```text
//! spec       := constraint ("," constraint)*
//! constraint := NAME ["(" NUMBER "-" NUMBER ")"] ["*" NUMBER]
//! NAME       := [0-9A-Za-z_]+
//! NUMBER     := [0-9.]+
//! ```
//!
//! Each token must match the grammar in full (surrounding whitespace is ignored).
//!
//! ## Validation
//! -----------------
//! * `NAME` must be a registered [`ConstraintKind`].
//! * A domain override must stay inside the default domain of the variant and
//!   must not be inverted.
//! * The weight must be a finite, non-negative number; the weights must not all be zero.
//!
//! After parsing, each `rel_weight` is set to `weight / Σ weight`.
//!
//! ## Example
//! -----------------
//! ```rust
//! use shark_constraints::constraints::spec_parser::parse;
//!
//! let set = parse("HIMF,SMF_z0(9-12)*2").unwrap();
//! assert_eq!(set.len(), 2);
//! assert_eq!(set[1].to_string(), "SMF_z0(9.0-12.0), weight=2.00, rel_weight=0.67");
//! ```
use std::{fmt, ops::Deref, str::FromStr};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::Domain,
    constraint_errors::ConstraintError,
    constraints::{Constraint, ConstraintKind},
};

static CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9_a-zA-Z]+)(?:\(([0-9.]+)-([0-9.]+)\))?(?:\*([0-9.]+))?$")
        .expect("constraint grammar is a valid regex")
});

/// Ordered, weight-normalised list of constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Build a set and normalise the relative weights.
    ///
    /// Return
    /// ----------
    /// * [`ConstraintError::EmptySpec`] if `constraints` is empty.
    /// * [`ConstraintError::ZeroTotalWeight`] if every weight is zero.
    pub fn new(mut constraints: Vec<Constraint>) -> Result<Self, ConstraintError> {
        if constraints.is_empty() {
            return Err(ConstraintError::EmptySpec);
        }
        let total: f64 = constraints.iter().map(Constraint::weight).sum();
        if total <= 0.0 {
            return Err(ConstraintError::ZeroTotalWeight);
        }
        for c in &mut constraints {
            c.set_rel_weight(c.weight() / total);
        }
        Ok(ConstraintSet { constraints })
    }

    pub fn into_inner(self) -> Vec<Constraint> {
        self.constraints
    }
}

impl Deref for ConstraintSet {
    type Target = [Constraint];

    fn deref(&self) -> &Self::Target {
        &self.constraints
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

impl FromStr for ConstraintSet {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Parse a single constraint token, without weight normalisation.
pub fn parse_constraint(token: &str) -> Result<Constraint, ConstraintError> {
    let token = token.trim();
    let invalid = || ConstraintError::UnknownConstraint(token.to_string());

    let caps = CONSTRAINT_RE.captures(token).ok_or_else(invalid)?;
    let kind: ConstraintKind = caps[1].parse().map_err(|_| invalid())?;
    let mut constraint = Constraint::new(kind);

    if let (Some(lo), Some(hi)) = (caps.get(2), caps.get(3)) {
        let lo: f64 = lo.as_str().parse().map_err(|_| invalid())?;
        let hi: f64 = hi.as_str().parse().map_err(|_| invalid())?;
        constraint = constraint.with_domain(Domain::new(lo, hi))?;
    }

    if let Some(weight) = caps.get(4) {
        let weight: f64 = weight
            .as_str()
            .parse()
            .map_err(|_| ConstraintError::InvalidWeight(weight.as_str().to_string()))?;
        constraint = constraint.with_weight(weight)?;
    }

    Ok(constraint)
}

/// Parse a full specification.
///
/// Arguments
/// -----------------
/// * `spec`: Comma-separated constraint tokens, e.g. `"HIMF(7.5-11)*2,SMF_z0"`.
///
/// Return
/// ----------
/// * The constraints in specification order, with `rel_weight` normalised.
/// * The first validation error met otherwise.
pub fn parse(spec: &str) -> Result<ConstraintSet, ConstraintError> {
    if spec.trim().is_empty() {
        return Err(ConstraintError::EmptySpec);
    }
    let constraints = spec
        .split(',')
        .map(parse_constraint)
        .collect::<Result<Vec<_>, _>>()?;
    ConstraintSet::new(constraints)
}
