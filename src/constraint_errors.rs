use camino::Utf8PathBuf;
use thiserror::Error;

use crate::observations::reader::ParseColumnError;

#[derive(Error, Debug)]
pub enum ConstraintError {
    // ---------------------------------------------------------------------------------------------
    // Validation errors: raised while parsing a constraint specification, abort the run.
    // ---------------------------------------------------------------------------------------------
    #[error("Constraint does not specify a valid constraint: {0}")]
    UnknownConstraint(String),

    #[error("Constraint low boundary is below the lowest value possible ({requested} < {allowed})")]
    DomainLowOutOfRange { requested: f64, allowed: f64 },

    #[error("Constraint up boundary is above the highest value possible ({requested} > {allowed})")]
    DomainUpOutOfRange { requested: f64, allowed: f64 },

    #[error("Constraint domain is inverted: {lo} > {hi}")]
    InvertedDomain { lo: f64, hi: f64 },

    #[error("Invalid constraint weight: {0}")]
    InvalidWeight(String),

    #[error("The weights of the constraint set sum to zero")]
    ZeroTotalWeight,

    #[error("Empty constraint specification")]
    EmptySpec,

    // ---------------------------------------------------------------------------------------------
    // Evaluation errors: isolated to one constraint, converted into a penalty score.
    // ---------------------------------------------------------------------------------------------
    #[error("Unable to read observation file {path}")]
    ObservationIo {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed observation file {path}, line {line}")]
    ObservationParse {
        path: Utf8PathBuf,
        line: usize,
        #[source]
        source: ParseColumnError,
    },

    #[error("Column {column} not present in {path} (line {line} has {available} columns)")]
    MissingColumn {
        path: Utf8PathBuf,
        line: usize,
        column: usize,
        available: usize,
    },

    #[error("Redshift {0} is not present in the snapshot table")]
    MissingRedshift(f64),

    #[error("Field '{field}' missing from table '{table}' of the model catalog")]
    MissingField { table: String, field: String },

    #[error("Field '{field}' has {found} values, expected {expected}")]
    FieldLengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Model catalog error: {0}")]
    Catalog(String),

    #[error("Model curve is empty, nothing to interpolate")]
    EmptyModel,

    #[error("No observation point left inside domain {0}")]
    EmptySelection(String),

    #[error("Statistical test returned a non-finite score: {0}")]
    NonFiniteScore(f64),

    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    // ---------------------------------------------------------------------------------------------
    // Configuration errors
    // ---------------------------------------------------------------------------------------------
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConstraintError {
    /// `true` for errors produced while validating a constraint specification.
    ///
    /// Those must abort the whole run, whereas every other variant is local to the
    /// evaluation of a single constraint and ends up as a penalty score.
    pub fn is_validation(&self) -> bool {
        use ConstraintError::*;
        matches!(
            self,
            UnknownConstraint(_)
                | DomainLowOutOfRange { .. }
                | DomainUpOutOfRange { .. }
                | InvertedDomain { .. }
                | InvalidWeight(_)
                | ZeroTotalWeight
                | EmptySpec
        )
    }
}

impl PartialEq for ConstraintError {
    fn eq(&self, other: &Self) -> bool {
        use ConstraintError::*;
        match (self, other) {
            (UnknownConstraint(a), UnknownConstraint(b)) => a == b,
            (
                DomainLowOutOfRange {
                    requested: r1,
                    allowed: a1,
                },
                DomainLowOutOfRange {
                    requested: r2,
                    allowed: a2,
                },
            ) => r1 == r2 && a1 == a2,
            (
                DomainUpOutOfRange {
                    requested: r1,
                    allowed: a1,
                },
                DomainUpOutOfRange {
                    requested: r2,
                    allowed: a2,
                },
            ) => r1 == r2 && a1 == a2,
            (InvertedDomain { lo: l1, hi: h1 }, InvertedDomain { lo: l2, hi: h2 }) => {
                l1 == l2 && h1 == h2
            }
            (InvalidWeight(a), InvalidWeight(b)) => a == b,
            (MissingRedshift(a), MissingRedshift(b)) => a == b,
            (MissingField { table: t1, field: f1 }, MissingField { table: t2, field: f2 }) => {
                t1 == t2 && f1 == f2
            }
            (EmptySelection(a), EmptySelection(b)) => a == b,
            (Catalog(a), Catalog(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,

            // not comparable: same variant is enough
            (ObservationIo { .. }, ObservationIo { .. }) => true,
            (ObservationParse { .. }, ObservationParse { .. }) => true,
            (MissingColumn { .. }, MissingColumn { .. }) => true,
            (FieldLengthMismatch { .. }, FieldLengthMismatch { .. }) => true,
            (NonFiniteScore(_), NonFiniteScore(_)) => true,
            (Io(_), Io(_)) => true,
            (Csv(_), Csv(_)) => true,
            (Toml(_), Toml(_)) => true,

            (ZeroTotalWeight, ZeroTotalWeight) => true,
            (EmptySpec, EmptySpec) => true,
            (EmptyModel, EmptyModel) => true,

            _ => false,
        }
    }
}
