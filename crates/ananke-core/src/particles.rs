use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::column::Column;
use crate::error::Result;
use crate::property::{self, FORMATION_DISTANCE, MASS, PARENT_ID, PROPERTIES};
use crate::schema;

/// Mapping from property key to its column, as handed over by the caller.
pub type ParticleSet = BTreeMap<String, Column>;

/// Validated, immutable particle columns with defaults filled in.
///
/// Construction takes the caller's set by value, validates it, and inserts
/// `parentid = 0..n` and `dform = 0` (with `mass`'s dtype) when absent.
/// There is no way to replace a column afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleStore {
    columns: ParticleSet,
    len: usize,
}

impl ParticleStore {
    pub fn new(mut columns: ParticleSet) -> Result<Self> {
        schema::validate_particles(&columns)?;

        let mass = &columns[MASS];
        let len = mass.rows();
        let dform_default = mass.zeros_like();

        columns
            .entry(PARENT_ID.to_string())
            .or_insert_with(|| Column::arange(len));
        columns
            .entry(FORMATION_DISTANCE.to_string())
            .or_insert(dform_default);

        Ok(Self { columns, len })
    }

    /// Number of particles (length of `mass`).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn mass(&self) -> &Column {
        &self.columns[MASS]
    }

    /// Optional keys present in the store, in table order.
    pub fn optional_keys(&self) -> Vec<&'static str> {
        property::optional_properties()
            .map(|p| p.key)
            .filter(|k| self.columns.contains_key(*k))
            .collect()
    }

    /// Every property in archive order; absent optional keys become f64 zeros.
    pub fn output_columns(&self) -> impl Iterator<Item = (&'static str, Cow<'_, Column>)> {
        PROPERTIES.iter().map(move |p| {
            let col = match self.columns.get(p.key) {
                Some(col) => Cow::Borrowed(col),
                None => Cow::Owned(Column::f64(vec![0.0; self.len])),
            };
            (p.key, col)
        })
    }

    pub fn into_columns(self) -> ParticleSet {
        self.columns
    }
}
