//! The `Input` a synthesis run is prepared from.
//!
//! Built either from caller arrays ([`Input::from_arrays`]) or from a
//! particle archive and kernel archive already on disk
//! ([`Input::from_files`]). Validation and kernel derivation happen at
//! construction; [`Input::prepare_input`] then writes the parameter file and
//! archives and stages the run, in that order.

use std::fs;
use std::path::{Path, PathBuf};

use ananke_core::parameters::mandatory_parameters;
use ananke_core::property::MASS;
use ananke_core::{
    DEFAULT_EXTENSION, DEFAULT_NGB, DEFAULT_SIMNAME, DensityEstimate, InputError, KERNELS_KEY,
    KernelConvention, KernelFileName, KernelNormalization, KernelSet, MagColorSelection,
    Parameters, ParticleSet, ParticleStore, Scale, parse_particle_file_name, particle_file_name,
    reconstruct,
};

use crate::config::{Layout, Settings};
use crate::dataset;
use crate::error::{Result, StoreError};
use crate::isochrone::PhotometricSystem;
use crate::parfile;
use crate::staging::{self, StagedRun};

/// How far preparation has progressed. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Constructed,
    KernelsWritten,
    ParticlesWritten,
    Staged,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputOptions {
    pub name: String,
    pub ngb: u32,
    pub normalization: KernelNormalization,
    /// Where archives and the parameter file are written.
    pub input_dir: PathBuf,
    pub extension: String,
    /// Overrides layered over the parameter defaults, below per-call overrides.
    pub parameters: Parameters,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_SIMNAME.to_string(),
            ngb: DEFAULT_NGB,
            normalization: KernelNormalization::default(),
            input_dir: PathBuf::from("."),
            extension: DEFAULT_EXTENSION.to_string(),
            parameters: Parameters::new(),
        }
    }
}

impl InputOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            ngb: settings.ngb,
            input_dir: settings.layout().input_dir,
            extension: settings.extension.clone(),
            parameters: settings.parameters.clone(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn normalization(mut self, normalization: KernelNormalization) -> Self {
        self.normalization = normalization;
        self
    }
}

/// What [`Input::prepare_input`] hands back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedRun {
    pub name: String,
    pub parameter_file: PathBuf,
    pub parameters: Parameters,
    pub staged: StagedRun,
}

#[derive(Debug)]
pub struct Input {
    particles: ParticleStore,
    density: DensityEstimate,
    normalization: KernelNormalization,
    kernels: KernelSet,
    name: String,
    ngb: u32,
    input_dir: PathBuf,
    kernel_path: PathBuf,
    particle_path: PathBuf,
    from_files: bool,
    parameters: Parameters,
    stage: RunStage,
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(InputError::Configuration(format!(
            "run name '{name}' must be a non-empty file name"
        ))
        .into());
    }
    Ok(())
}

fn check_density_length(density: &DensityEstimate, particles: &ParticleStore) -> Result<()> {
    if density.len() == particles.len() {
        return Ok(());
    }
    Err(InputError::LengthMismatch {
        reference: MASS.to_string(),
        expected: particles.len(),
        mismatched: vec![("rho_pos".to_string(), density.len())],
    }
    .into())
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            InputError::Format {
                input: path.display().to_string(),
                detail: "path has no file name".to_string(),
            }
            .into()
        })
}

impl Input {
    /// Validate caller arrays and derive kernels from the given densities.
    pub fn from_arrays(
        particles: ParticleSet,
        rho_pos: Vec<f64>,
        rho_vel: Option<Vec<f64>>,
        options: InputOptions,
    ) -> Result<Self> {
        check_name(&options.name)?;
        if options.ngb == 0 {
            return Err(InputError::Configuration("ngb must be positive".to_string()).into());
        }
        let particles = ParticleStore::new(particles)?;
        let density = DensityEstimate::new(rho_pos, rho_vel)?;
        check_density_length(&density, &particles)?;
        let kernels = KernelSet::derive(&density, &options.normalization.k_factor(options.ngb))?;

        let kname = KernelFileName::new(&options.name, density.hdim(), options.ngb, &options.extension);
        let kernel_path = options.input_dir.join(kname.to_string());
        let particle_path = options
            .input_dir
            .join(particle_file_name(&options.name, &options.extension));

        tracing::debug!(run = %options.name, particles = particles.len(), hdim = density.hdim(), "input built from arrays");
        Ok(Self {
            particles,
            density,
            normalization: options.normalization,
            kernels,
            name: options.name,
            ngb: options.ngb,
            input_dir: options.input_dir,
            kernel_path,
            particle_path,
            from_files: false,
            parameters: options.parameters,
            stage: RunStage::Constructed,
        })
    }

    /// Load a particle archive and its kernel archive, recovering densities
    /// and normalization from the stored kernels.
    ///
    /// Both files must sit in the same directory. The run name comes from the
    /// particle file; `hdim` and `ngb` come from the kernel file name.
    pub fn from_files(
        particle_path: &Path,
        kernel_path: &Path,
        convention: KernelConvention,
    ) -> Result<Self> {
        let input_dir = particle_path.parent().unwrap_or(Path::new("")).to_path_buf();
        let kernel_dir = kernel_path.parent().unwrap_or(Path::new(""));
        if input_dir != kernel_dir {
            return Err(InputError::Configuration(format!(
                "particle file and kernel file must share a directory: {} vs {}",
                input_dir.display(),
                kernel_dir.display()
            ))
            .into());
        }

        let (name, _) = parse_particle_file_name(&file_name_of(particle_path)?)?;
        let kname = KernelFileName::parse_for(&file_name_of(kernel_path)?, &name)?;

        let stored = dataset::read_kernels(kernel_path)?;
        let particles = ParticleStore::new(dataset::read_particles(particle_path)?)?;
        if stored.mass.rows() != particles.len() {
            return Err(InputError::LengthMismatch {
                reference: MASS.to_string(),
                expected: particles.len(),
                mismatched: vec![(format!("{} ({MASS})", kernel_path.display()), stored.mass.rows())],
            }
            .into());
        }

        let rec = reconstruct(&stored.density, &stored.h_cubic, kname.ngb, convention)?;
        if rec.density.hdim() != kname.hdim {
            return Err(InputError::Format {
                input: kname.to_string(),
                detail: format!(
                    "name says hdim {} but '{}' holds hdim {}",
                    kname.hdim,
                    KERNELS_KEY,
                    rec.density.hdim()
                ),
            }
            .into());
        }
        check_density_length(&rec.density, &particles)?;
        let kernels = KernelSet::derive(&rec.density, &rec.normalization.k_factor(kname.ngb))?;

        tracing::debug!(run = %name, particles = particles.len(), ?convention, "input loaded from files");
        Ok(Self {
            particles,
            density: rec.density,
            normalization: rec.normalization,
            kernels,
            name,
            ngb: kname.ngb,
            input_dir,
            kernel_path: kernel_path.to_path_buf(),
            particle_path: particle_path.to_path_buf(),
            from_files: true,
            parameters: Parameters::new(),
            stage: RunStage::Constructed,
        })
    }

    /// Replace the run-wide parameter overrides, e.g. with `Settings::parameters`.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ngb(&self) -> u32 {
        self.ngb
    }

    pub fn hdim(&self) -> u32 {
        self.density.hdim()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    pub fn density(&self) -> &DensityEstimate {
        &self.density
    }

    pub fn normalization(&self) -> &KernelNormalization {
        &self.normalization
    }

    pub fn k_factor(&self) -> Scale {
        self.normalization.k_factor(self.ngb)
    }

    pub fn kernels(&self) -> &KernelSet {
        &self.kernels
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn kernel_path(&self) -> &Path {
        &self.kernel_path
    }

    pub fn particle_path(&self) -> &Path {
        &self.particle_path
    }

    /// True when built by [`Input::from_files`]; archives are never rewritten.
    pub fn from_files_on_disk(&self) -> bool {
        self.from_files
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    fn advance(&mut self, to: RunStage) {
        self.stage = self.stage.max(to);
    }

    fn ensure_input_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.input_dir).map_err(StoreError::io(&self.input_dir))
    }

    pub fn write_kernels(&mut self) -> Result<PathBuf> {
        if self.from_files {
            tracing::info!(path = %self.kernel_path.display(), "kernel archive exists, write skipped");
        } else {
            self.ensure_input_dir()?;
            dataset::write_kernels(&self.kernel_path, &self.density, &self.kernels, self.particles.mass())?;
        }
        self.advance(RunStage::KernelsWritten);
        Ok(self.kernel_path.clone())
    }

    pub fn write_particles(&mut self) -> Result<PathBuf> {
        if self.from_files {
            tracing::info!(path = %self.particle_path.display(), "particle archive exists, write skipped");
        } else {
            self.ensure_input_dir()?;
            dataset::write_particles(&self.particle_path, &self.particles)?;
        }
        self.advance(RunStage::ParticlesWritten);
        Ok(self.particle_path.clone())
    }

    /// Render the parameter file for `system` with the chosen magnitude and
    /// color. `overrides` win over the run-wide parameters.
    pub fn write_parameter_file(
        &self,
        system: &impl PhotometricSystem,
        selection: &MagColorSelection,
        overrides: &Parameters,
    ) -> Result<(PathBuf, Parameters)> {
        system.check_selection(selection)?;
        let mandatory = mandatory_parameters(system.category(), system.name(), selection, self.ngb);
        let mut layered = self.parameters.clone();
        layered.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.ensure_input_dir()?;
        parfile::write_parameter_file(&self.input_dir, &mandatory, &layered)
    }

    /// Link both archives into the engine's directories. Requires both
    /// archives to have been written (or skipped) first.
    pub fn stage_run(&mut self, layout: &Layout) -> Result<StagedRun> {
        if self.stage < RunStage::ParticlesWritten {
            return Err(InputError::Configuration(format!(
                "run '{}' cannot be staged before its archives are written",
                self.name
            ))
            .into());
        }
        let staged = staging::stage(layout, &self.kernel_path, &self.particle_path, &self.name)?;
        self.advance(RunStage::Staged);
        Ok(staged)
    }

    /// Parameter file, kernel archive, particle archive, staging.
    ///
    /// Nothing is written when the run name is already staged with other
    /// files, or when fresh arrays would overwrite archives a staged run
    /// links to.
    pub fn prepare_input(
        &mut self,
        layout: &Layout,
        system: &impl PhotometricSystem,
        selection: &MagColorSelection,
        overrides: &Parameters,
    ) -> Result<PreparedRun> {
        let linked =
            staging::check_staged(layout, &self.kernel_path, &self.particle_path, &self.name)?;
        if linked && !self.from_files && self.stage < RunStage::ParticlesWritten {
            return Err(StoreError::Conflict {
                path: self.particle_path.clone(),
                detail: format!(
                    "run '{}' is staged from this archive; reload it with Input::from_files or pick another name",
                    self.name
                ),
            });
        }
        let (parameter_file, parameters) = self.write_parameter_file(system, selection, overrides)?;
        self.write_kernels()?;
        self.write_particles()?;
        let staged = self.stage_run(layout)?;
        tracing::info!(run = %self.name, parfile = %parameter_file.display(), "input prepared");
        Ok(PreparedRun {
            name: self.name.clone(),
            parameter_file,
            parameters,
            staged,
        })
    }
}
