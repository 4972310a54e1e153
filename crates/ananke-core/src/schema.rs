//! Key-set and length checks run eagerly when particle data is accepted.

use std::collections::{BTreeMap, BTreeSet};

use crate::column::Column;
use crate::error::{InputError, Result};
use crate::property;

/// Every required key must be given; nothing outside required ∪ optional may be.
pub fn validate_keys<'a>(
    given: impl IntoIterator<Item = &'a str>,
    required: &BTreeSet<&str>,
    optional: &BTreeSet<&str>,
) -> Result<()> {
    let given: BTreeSet<&str> = given.into_iter().collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|k| !given.contains(**k))
        .map(|k| k.to_string())
        .collect();
    let extra: Vec<String> = given
        .iter()
        .filter(|k| !required.contains(**k) && !optional.contains(**k))
        .map(|k| k.to_string())
        .collect();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(InputError::Schema { missing, extra })
    }
}

/// Every column's leading dimension must equal the reference column's.
pub fn validate_equal_lengths(columns: &BTreeMap<String, Column>, reference_key: &str) -> Result<()> {
    let expected = columns
        .get(reference_key)
        .map(Column::rows)
        .ok_or_else(|| InputError::Schema {
            missing: vec![reference_key.to_string()],
            extra: Vec::new(),
        })?;

    let mismatched: Vec<(String, usize)> = columns
        .iter()
        .filter(|(_, col)| col.rows() != expected)
        .map(|(key, col)| (key.clone(), col.rows()))
        .collect();

    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(InputError::LengthMismatch {
            reference: reference_key.to_string(),
            expected,
            mismatched,
        })
    }
}

/// Known properties must have the trailing dimension the table declares.
pub fn validate_widths(columns: &BTreeMap<String, Column>) -> Result<()> {
    for (key, col) in columns {
        if let Some(prop) = property::lookup(key)
            && col.width() != prop.width
        {
            return Err(InputError::Shape {
                key: key.clone(),
                expected: prop.width,
                found: col.width(),
            });
        }
    }
    Ok(())
}

/// Full particle check: key set, widths, then lengths against `mass`.
pub fn validate_particles(columns: &BTreeMap<String, Column>) -> Result<()> {
    validate_keys(
        columns.keys().map(String::as_str),
        &property::required_keys(),
        &property::optional_keys(),
    )?;
    validate_widths(columns)?;
    validate_equal_lengths(columns, property::MASS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&'static str]) -> BTreeSet<&'static str> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_exact_required_passes() {
        let required = set(&["a", "b"]);
        let optional = set(&["c"]);
        assert!(validate_keys(["a", "b"], &required, &optional).is_ok());
        assert!(validate_keys(["a", "b", "c"], &required, &optional).is_ok());
    }

    #[test]
    fn test_missing_and_extra_reported_together() {
        let required = set(&["a", "b"]);
        let optional = set(&["c"]);
        let err = validate_keys(["a", "z"], &required, &optional).unwrap_err();
        assert_eq!(
            err,
            InputError::Schema {
                missing: vec!["b".to_string()],
                extra: vec!["z".to_string()],
            }
        );
    }

    #[test]
    fn test_length_mismatch_lists_every_offender() {
        let mut cols = BTreeMap::new();
        cols.insert("mass".to_string(), Column::f64(vec![1.0; 4]));
        cols.insert("age".to_string(), Column::f64(vec![1.0; 3]));
        cols.insert("feh".to_string(), Column::f64(vec![1.0; 5]));
        cols.insert("pos3".to_string(), Column::from_rows(vec![[0.0; 3]; 4]));

        match validate_equal_lengths(&cols, "mass").unwrap_err() {
            InputError::LengthMismatch {
                reference,
                expected,
                mismatched,
            } => {
                assert_eq!(reference, "mass");
                assert_eq!(expected, 4);
                assert_eq!(
                    mismatched,
                    vec![("age".to_string(), 3), ("feh".to_string(), 5)]
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_vector_rows_compare_by_leading_dimension() {
        let mut cols = BTreeMap::new();
        cols.insert("mass".to_string(), Column::f64(vec![1.0; 2]));
        cols.insert("pos3".to_string(), Column::from_rows(vec![[0.0; 3]; 2]));
        assert!(validate_equal_lengths(&cols, "mass").is_ok());
    }

    #[test]
    fn test_width_checked_against_table() {
        let mut cols = BTreeMap::new();
        cols.insert("pos3".to_string(), Column::f64(vec![0.0; 3]));
        assert_eq!(
            validate_widths(&cols).unwrap_err(),
            InputError::Shape {
                key: "pos3".to_string(),
                expected: 3,
                found: 1,
            }
        );
    }
}
