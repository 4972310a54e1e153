//! Isochrone descriptor text and track-table checks.
//!
//! The descriptor's first line is
//! `<label> <total_columns> <required_columns> <mag_count> <mag names...>`
//! followed by a blank line. Track tables must all share one header holding
//! the required columns plus at least one magnitude column.

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::ISO_METALLICITY_PRECISION;
use crate::error::{InputError, Result};

pub const REQUIRED_COLUMNS: [&str; 6] = ["Age", "M_ini", "M_act", "Lum", "T_eff", "Grav"];

/// One metallicity bin: column name to values.
pub type IsochroneTable = BTreeMap<String, Vec<f64>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsochroneDescriptor {
    pub label: String,
    pub total_columns: usize,
    pub required_columns: usize,
    pub magnitude_names: Vec<String>,
}

impl IsochroneDescriptor {
    pub fn for_system(system: &str, magnitude_names: Vec<String>) -> Self {
        Self {
            label: format!("Custom_{system}"),
            total_columns: REQUIRED_COLUMNS.len() + magnitude_names.len(),
            required_columns: REQUIRED_COLUMNS.len(),
            magnitude_names,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let line = text.lines().next().unwrap_or_default();
        let bad = |detail: String| InputError::Format {
            input: line.to_string(),
            detail,
        };
        let mut fields = line.split_whitespace();
        let label = fields
            .next()
            .ok_or_else(|| bad("empty descriptor".to_string()))?
            .to_string();
        let mut count = |what: &str| -> Result<usize> {
            fields
                .next()
                .ok_or_else(|| bad(format!("missing {what}")))?
                .parse()
                .map_err(|e| bad(format!("{what}: {e}")))
        };
        let total_columns = count("total column count")?;
        let required_columns = count("required column count")?;
        let mag_count = count("magnitude count")?;
        let magnitude_names: Vec<String> = fields.map(str::to_string).collect();

        if magnitude_names.len() != mag_count {
            return Err(bad(format!(
                "declares {mag_count} magnitudes but names {}",
                magnitude_names.len()
            )));
        }
        if total_columns != required_columns + mag_count {
            return Err(bad(format!(
                "{total_columns} columns != {required_columns} required + {mag_count} magnitudes"
            )));
        }

        Ok(Self {
            label,
            total_columns,
            required_columns,
            magnitude_names,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{} {} {} {} {}\n\n",
            self.label,
            self.total_columns,
            self.required_columns,
            self.magnitude_names.len(),
            self.magnitude_names.join(" ")
        )
    }

    /// Required columns followed by the magnitude names.
    pub fn column_order(&self) -> Vec<String> {
        REQUIRED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.magnitude_names.iter().cloned())
            .collect()
    }
}

/// Canonical text form of a metallicity bin.
pub fn metallicity_key(feh: f64) -> String {
    format!("{feh:.prec$}", prec = ISO_METALLICITY_PRECISION)
}

/// `output_<feh>.dat`
pub fn track_file_name(feh: f64) -> String {
    format!("output_{}.dat", metallicity_key(feh))
}

/// The given metallicity bins must be exactly the required set.
pub fn check_metallicities(given: &[f64], required: &[f64]) -> Result<()> {
    let given: BTreeSet<String> = given.iter().map(|f| metallicity_key(*f)).collect();
    let required: BTreeSet<String> = required.iter().map(|f| metallicity_key(*f)).collect();
    if given == required {
        return Ok(());
    }
    Err(InputError::Schema {
        missing: required.difference(&given).cloned().collect(),
        extra: given.difference(&required).cloned().collect(),
    })
}

/// Validate headers across bins and return the descriptor for them.
///
/// Magnitude columns are every non-required column, sorted by name.
pub fn describe_tables<'a>(
    system: &str,
    tables: impl IntoIterator<Item = &'a IsochroneTable>,
) -> Result<IsochroneDescriptor> {
    let mut header: Option<BTreeSet<&str>> = None;
    for table in tables {
        let this: BTreeSet<&str> = table.keys().map(String::as_str).collect();
        if let Some(h) = &header {
            if *h != this {
                return Err(InputError::Configuration(
                    "isochrone tables have unequal headers".to_string(),
                ));
            }
        } else {
            header = Some(this);
        }
        check_table_lengths(table)?;
    }
    let header =
        header.ok_or_else(|| InputError::Configuration("no isochrone tables given".to_string()))?;

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header.contains(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InputError::Schema {
            missing,
            extra: Vec::new(),
        });
    }

    let magnitude_names: Vec<String> = header
        .iter()
        .filter(|c| !REQUIRED_COLUMNS.contains(*c))
        .map(|c| c.to_string())
        .collect();
    if magnitude_names.is_empty() {
        return Err(InputError::Configuration(
            "isochrone tables have no magnitude columns".to_string(),
        ));
    }
    Ok(IsochroneDescriptor::for_system(system, magnitude_names))
}

fn check_table_lengths(table: &IsochroneTable) -> Result<()> {
    let expected = table.get(REQUIRED_COLUMNS[0]).map(Vec::len).unwrap_or(0);
    let mismatched: Vec<(String, usize)> = table
        .iter()
        .filter(|(_, v)| v.len() != expected)
        .map(|(k, v)| (k.clone(), v.len()))
        .collect();
    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(InputError::LengthMismatch {
            reference: REQUIRED_COLUMNS[0].to_string(),
            expected,
            mismatched,
        })
    }
}
