//! # Model catalog interface
//!
//! The semi-analytic model writes one galaxy catalog per output snapshot and per
//! subvolume. Reading those files is the job of an external collaborator; this
//! module only fixes the **interface** the constraints rely on.
//!
//! ## Overview
//! -----------------
//! * [`CatalogReader`] – Trait implemented by catalog back-ends.
//! * [`Catalog`] – In-memory result of a read: the cosmology (`h0`), the comoving
//!   volume covered, and raw per-galaxy numeric columns grouped by table.
//! * [`FieldRequest`] – The columns a caller needs, grouped by table.
//! * [`RedshiftTable`] – Redshift → snapshot lookup.
//! * [`Subvolumes`] – Which spatial partitions to read, either an explicit list or the
//!   merged `multiple_batches` pseudo-subvolume.
//! * [`MemoryCatalogReader`] – A reader serving pre-built catalogs from memory.
//!
//! ## Conventions
//! -----------------
//! * Per-galaxy columns are concatenated across the requested subvolumes.
//! * `volume` is the total comoving volume covered by the returned galaxies, in
//!   `(Mpc/h)^3`.
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use ordered_float::OrderedFloat;

use crate::{
    constants::{HubbleParam, Redshift, SnapshotId, Subvolume},
    constraint_errors::ConstraintError,
};

/// Name of the pseudo-subvolume holding several merged batches.
pub const MULTIPLE_BATCHES: &str = "multiple_batches";

/// Selection of subvolumes handed to a [`CatalogReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subvolumes {
    /// Read and concatenate these subvolumes.
    List(Vec<Subvolume>),
    /// Read the single merged pseudo-subvolume.
    MultipleBatches,
}

impl Subvolumes {
    /// Decide which subvolumes to request.
    ///
    /// When more than one subvolume is requested and `merge_batches` is set, the
    /// merged pseudo-subvolume is used instead of the explicit list.
    pub fn select(subvols: &[Subvolume], merge_batches: bool) -> Self {
        if subvols.len() > 1 && merge_batches {
            Subvolumes::MultipleBatches
        } else {
            Subvolumes::List(subvols.to_vec())
        }
    }

    /// Directory name of each selected subvolume.
    pub fn names(&self) -> Vec<String> {
        match self {
            Subvolumes::List(list) => list.iter().map(|s| s.to_string()).collect(),
            Subvolumes::MultipleBatches => vec![MULTIPLE_BATCHES.to_string()],
        }
    }
}

impl fmt::Display for Subvolumes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

/// Columns required from each table of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRequest {
    tables: BTreeMap<String, Vec<String>>,
}

impl FieldRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `fields` of `table` to the request.
    pub fn with(mut self, table: &str, fields: &[&str]) -> Self {
        let entry = self.tables.entry(table.to_string()).or_default();
        for field in fields {
            if !entry.iter().any(|f| f == field) {
                entry.push(field.to_string());
            }
        }
        self
    }

    /// Iterate over `(table, fields)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables.iter().map(|(t, f)| (t.as_str(), f.as_slice()))
    }
}

/// Raw result of reading one snapshot of a model run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    /// Dimensionless Hubble parameter of the simulation.
    pub h0: HubbleParam,
    /// Comoving volume covered by the galaxies, in `(Mpc/h)^3`.
    pub volume: f64,
    tables: HashMap<String, HashMap<String, Vec<f64>>>,
}

impl Catalog {
    pub fn new(h0: HubbleParam, volume: f64) -> Self {
        Catalog {
            h0,
            volume,
            tables: HashMap::new(),
        }
    }

    /// Attach a column to `table`.
    pub fn with_field(mut self, table: &str, field: &str, values: Vec<f64>) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), values);
        self
    }

    /// Borrow a column.
    ///
    /// Return
    /// ----------
    /// * The values, or [`ConstraintError::MissingField`] if the column was not read.
    pub fn field(&self, table: &str, field: &str) -> Result<&[f64], ConstraintError> {
        self.tables
            .get(table)
            .and_then(|t| t.get(field))
            .map(Vec::as_slice)
            .ok_or_else(|| ConstraintError::MissingField {
                table: table.to_string(),
                field: field.to_string(),
            })
    }

    /// Keep only the columns named in `request`.
    ///
    /// Fails with [`ConstraintError::MissingField`] if a requested column is absent.
    pub fn project(&self, request: &FieldRequest) -> Result<Catalog, ConstraintError> {
        let mut out = Catalog::new(self.h0, self.volume);
        for (table, fields) in request.iter() {
            for field in fields {
                let values = self.field(table, field)?.to_vec();
                out = out.with_field(table, field, values);
            }
        }
        Ok(out)
    }

    /// Append the galaxies of `other` to `self`, summing the covered volumes.
    ///
    /// Only columns present in `self` are extended; `h0` of `self` is kept.
    pub fn extend(&mut self, other: &Catalog) -> Result<(), ConstraintError> {
        for (table, columns) in &self.tables {
            for field in columns.keys() {
                other.field(table, field)?;
            }
        }
        self.volume += other.volume;
        for (table, columns) in self.tables.iter_mut() {
            for (field, values) in columns.iter_mut() {
                values.extend_from_slice(other.field(table, field)?);
            }
        }
        Ok(())
    }
}

/// Source of model catalogs.
///
/// Implementations read the galaxies of one snapshot of one model run, restricted to
/// the requested columns and concatenated across the selected subvolumes.
pub trait CatalogReader {
    /// Read one snapshot.
    ///
    /// Arguments
    /// -----------------
    /// * `modeldir`: Output directory of the model run.
    /// * `snapshot`: Snapshot to read.
    /// * `fields`: Required columns, grouped by table.
    /// * `subvolumes`: Spatial partitions to read.
    ///
    /// Return
    /// ----------
    /// * The projected [`Catalog`], or a [`ConstraintError`] on I/O or schema failure.
    fn read(
        &self,
        modeldir: &Utf8Path,
        snapshot: SnapshotId,
        fields: &FieldRequest,
        subvolumes: &Subvolumes,
    ) -> Result<Catalog, ConstraintError>;
}

/// Redshift → snapshot lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedshiftTable {
    table: BTreeMap<OrderedFloat<f64>, SnapshotId>,
}

impl RedshiftTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, z: Redshift, snapshot: SnapshotId) -> Option<SnapshotId> {
        self.table.insert(OrderedFloat(z), snapshot)
    }

    /// Snapshot written at redshift `z`.
    pub fn snapshot(&self, z: Redshift) -> Result<SnapshotId, ConstraintError> {
        self.table
            .get(&OrderedFloat(z))
            .copied()
            .ok_or(ConstraintError::MissingRedshift(z))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FromIterator<(Redshift, SnapshotId)> for RedshiftTable {
    fn from_iter<T: IntoIterator<Item = (Redshift, SnapshotId)>>(iter: T) -> Self {
        RedshiftTable {
            table: iter
                .into_iter()
                .map(|(z, snap)| (OrderedFloat(z), snap))
                .collect(),
        }
    }
}

/// [`CatalogReader`] serving catalogs registered in memory.
///
/// Catalogs are keyed by model directory, snapshot and subvolume name (the
/// subvolume index, or [`MULTIPLE_BATCHES`]).
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogReader {
    catalogs: HashMap<(Utf8PathBuf, SnapshotId, String), Catalog>,
}

impl MemoryCatalogReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the catalog of one subvolume.
    pub fn insert(
        &mut self,
        modeldir: impl Into<Utf8PathBuf>,
        snapshot: SnapshotId,
        subvolume: impl ToString,
        catalog: Catalog,
    ) {
        self.catalogs
            .insert((modeldir.into(), snapshot, subvolume.to_string()), catalog);
    }
}

impl CatalogReader for MemoryCatalogReader {
    fn read(
        &self,
        modeldir: &Utf8Path,
        snapshot: SnapshotId,
        fields: &FieldRequest,
        subvolumes: &Subvolumes,
    ) -> Result<Catalog, ConstraintError> {
        let mut merged: Option<Catalog> = None;

        for name in subvolumes.names() {
            let catalog = self
                .catalogs
                .get(&(modeldir.to_owned(), snapshot, name.clone()))
                .ok_or_else(|| {
                    ConstraintError::Catalog(format!(
                        "no catalog for {modeldir}, snapshot {snapshot}, subvolume {name}"
                    ))
                })?
                .project(fields)?;

            match merged.as_mut() {
                Some(acc) => acc.extend(&catalog)?,
                None => merged = Some(catalog),
            }
        }

        merged.ok_or_else(|| ConstraintError::Catalog("no subvolume requested".to_string()))
    }
}
