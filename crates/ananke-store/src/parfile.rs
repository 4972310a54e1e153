//! Rendering the engine parameter file to disk.

use std::fs;
use std::path::{Path, PathBuf};

use ananke_core::parameters::{
    PARFILE, Parameters, Template, default_parameters, resolve_parameters, unused_keys,
};
use ananke_core::{DEFAULT_PARFILE, InputError, ParamValue};

use crate::error::{Result, StoreError};

/// `overrides.parfile` or the default name; relative paths land in `input_dir`.
pub fn parameter_file_path(input_dir: &Path, overrides: &Parameters) -> Result<PathBuf> {
    let name = match overrides.get(PARFILE) {
        None => PathBuf::from(DEFAULT_PARFILE),
        Some(ParamValue::Text(s)) if !s.is_empty() => PathBuf::from(s),
        Some(other) => {
            return Err(InputError::Configuration(format!(
                "'{PARFILE}' must be a non-empty path, got '{other}'"
            ))
            .into());
        }
    };
    Ok(if name.is_absolute() {
        name
    } else {
        input_dir.join(name)
    })
}

/// Resolve parameters and render them into the parameter file.
///
/// Overrides the template never references are reported and ignored.
pub fn write_parameter_file(
    input_dir: &Path,
    mandatory: &Parameters,
    overrides: &Parameters,
) -> Result<(PathBuf, Parameters)> {
    let path = parameter_file_path(input_dir, overrides)?;
    let mut overrides = overrides.clone();
    overrides.remove(PARFILE);

    let template = Template::parfile();
    let resolved = resolve_parameters(&default_parameters(), &overrides, mandatory)?;
    for key in unused_keys(&template, &overrides)? {
        tracing::warn!(key = %key, "parameter override not used by the template");
    }
    let text = template.substitute(&resolved)?;

    fs::write(&path, text).map_err(StoreError::io(&path))?;
    tracing::info!(path = %path.display(), "parameter file written");
    Ok((path, resolved))
}
