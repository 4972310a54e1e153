//! Kernel and particle archives.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ananke_core::constants::{DENSITY_KEY, KERNELS_KEY, MASS_KEY};
use ananke_core::schema::validate_keys;
use ananke_core::{Column, DensityEstimate, InputError, KernelSet, ParticleSet, ParticleStore};

use crate::codec::{ArchiveWriter, read_archive};
use crate::error::{Result, StoreError};

/// Contents of a kernel archive.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredKernels {
    pub density: Vec<f64>,
    pub h_cubic: Column,
    pub mass: Column,
}

/// Write `density`, `h_cubic` and `mass` to a kernel archive.
pub fn write_kernels(
    path: &Path,
    density: &DensityEstimate,
    kernels: &KernelSet,
    mass: &Column,
) -> Result<PathBuf> {
    let mut writer = ArchiveWriter::create(path)?;
    writer.write_column(DENSITY_KEY, &Column::f64(density.rho_pos().to_vec()))?;
    writer.write_column(KERNELS_KEY, &kernels.to_column())?;
    writer.write_column(MASS_KEY, mass)?;
    let path = writer.finish()?;
    tracing::info!(path = %path.display(), particles = density.len(), "kernels written");
    Ok(path)
}

pub fn read_kernels(path: &Path) -> Result<StoredKernels> {
    let mut entries = read_archive(path)?;
    let required: BTreeSet<&str> = [DENSITY_KEY, KERNELS_KEY, MASS_KEY].into_iter().collect();
    validate_keys(entries.keys().map(String::as_str), &required, &BTreeSet::new())?;

    let malformed = |detail: String| StoreError::Malformed {
        path: path.to_path_buf(),
        detail,
    };
    let density = entries.remove(DENSITY_KEY).unwrap_or_else(|| Column::f64(Vec::new()));
    if density.width() != 1 {
        return Err(malformed(format!(
            "'{DENSITY_KEY}' has width {}, expected 1",
            density.width()
        )));
    }
    let h_cubic = entries.remove(KERNELS_KEY).unwrap_or_else(|| Column::f64(Vec::new()));
    let mass = entries.remove(MASS_KEY).unwrap_or_else(|| Column::f64(Vec::new()));
    if mass.rows() != density.rows() {
        return Err(InputError::LengthMismatch {
            reference: DENSITY_KEY.to_string(),
            expected: density.rows(),
            mismatched: vec![(MASS_KEY.to_string(), mass.rows())],
        }
        .into());
    }

    Ok(StoredKernels {
        density: density.to_f64_vec(),
        h_cubic,
        mass,
    })
}

/// Write every property column, zero-filling absent optional keys.
pub fn write_particles(path: &Path, particles: &ParticleStore) -> Result<PathBuf> {
    let mut writer = ArchiveWriter::create(path)?;
    for (key, column) in particles.output_columns() {
        writer.write_column(key, &column)?;
    }
    let entries = writer.entries();
    let path = writer.finish()?;
    tracing::info!(path = %path.display(), particles = particles.len(), entries, "particles written");
    Ok(path)
}

pub fn read_particles(path: &Path) -> Result<ParticleSet> {
    read_archive(path)
}
