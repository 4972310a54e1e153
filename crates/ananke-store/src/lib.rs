//! Filesystem side of input preparation: array archives, parameter files,
//! isochrone directories and run staging.

pub mod codec;
pub mod config;
pub mod dataset;
pub mod error;
pub mod input;
pub mod isochrone;
pub mod parfile;
pub mod staging;

pub use codec::{ArchiveWriter, read_archive, write_archive};
pub use config::{Layout, Settings};
pub use dataset::{StoredKernels, read_kernels, read_particles, write_kernels, write_particles};
pub use error::{Result, StoreError};
pub use input::{Input, InputOptions, PreparedRun, RunStage};
pub use isochrone::{Isochrone, PhotometricSystem};
pub use parfile::write_parameter_file;
pub use staging::{StagedRun, check_staged, stage};
