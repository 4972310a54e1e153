//! Input preparation for N-body to synthetic-survey runs.
//!
//! Validates particle property sets against the fixed schema, derives
//! phase-space smoothing kernels from density estimates (or recovers densities
//! from stored kernels), and renders the population-synthesis engine's
//! parameter file and isochrone descriptor.
//!
//! Zero I/O. Archives, directories and symlinks live in `ananke-store`.

pub mod column;
pub mod constants;
pub mod dummy;
pub mod error;
pub mod isochrone;
pub mod kernels;
pub mod naming;
pub mod parameters;
pub mod particles;
pub mod property;
pub mod schema;

pub use column::{Column, ColumnData, Dtype};
pub use constants::{
    DEFAULT_EXTENSION, DEFAULT_K_FACTOR, DEFAULT_KNORM, DEFAULT_NGB, DEFAULT_PARFILE,
    DEFAULT_SIMNAME, DENSITY_KEY, KERNELS_KEY,
};
pub use dummy::{dummy_densities, dummy_particles};
pub use error::{InputError, Result};
pub use isochrone::{IsochroneDescriptor, IsochroneTable, describe_tables};
pub use kernels::{
    DensityEstimate, KernelConvention, KernelNormalization, KernelSet, Reconstruction, Scale,
    reconstruct,
};
pub use naming::{KernelFileName, parse_particle_file_name, particle_file_name};
pub use parameters::{MagColorSelection, ParamValue, Parameters, Template};
pub use particles::{ParticleSet, ParticleStore};
pub use property::{PROPERTIES, Property, Requirement, all_possible_keys};
