//! Data directory layout and TOML settings.
//!
//! The data directory defaults to `$ANANKE_DATA_DIR`, else `~/.ananke`.
//! An optional `ananke.toml` inside it (or any file passed explicitly)
//! overrides directory names, the archive extension, the neighbor count and
//! default parameter overrides:
//!
//! ```toml
//! input_dir = "input"
//! extension = "arr"
//! ngb = 64
//!
//! [parameters]
//! seed = 17
//! output_file = "galaxy1"
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs};

use ananke_core::{DEFAULT_EXTENSION, DEFAULT_NGB, Parameters};
use serde::Deserialize;

use crate::error::{Result, StoreError};

pub const DATA_DIR_ENV: &str = "ANANKE_DATA_DIR";
pub const SETTINGS_FILE: &str = "ananke.toml";

fn default_base_dir() -> PathBuf {
    base_dir_from(
        env::var_os(DATA_DIR_ENV),
        env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")),
    )
}

/// `$ANANKE_DATA_DIR` when set and non-empty, else `<home>/.ananke`.
fn base_dir_from(data_dir: Option<OsString>, home: Option<OsString>) -> PathBuf {
    if let Some(dir) = data_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    home.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ananke")
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the data directory; `None` means the environment default.
    pub base_dir: Option<PathBuf>,
    pub input_dir: PathBuf,
    pub nbody_dir: PathBuf,
    pub filenames_dir: PathBuf,
    pub extension: String,
    pub ngb: u32,
    /// Parameter overrides applied to every run before per-call overrides;
    /// carried into runs by `InputOptions::from_settings`.
    pub parameters: Parameters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_dir: None,
            input_dir: PathBuf::from("input"),
            nbody_dir: PathBuf::from("nbody"),
            filenames_dir: PathBuf::from("filenames"),
            extension: DEFAULT_EXTENSION.to_string(),
            ngb: DEFAULT_NGB,
            parameters: Parameters::new(),
        }
    }
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        if settings.ngb == 0 {
            return Err(StoreError::Config("ngb must be positive".to_string()));
        }
        if settings.extension.is_empty() || settings.extension.contains(['.', '/']) {
            return Err(StoreError::Config(format!(
                "extension '{}' must be a bare suffix",
                settings.extension
            )));
        }
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(StoreError::io(path))?;
        let mut settings = Self::from_toml(&text)?;
        // a relative base_dir is taken relative to the settings file
        if let Some(base) = &settings.base_dir
            && base.is_relative()
            && let Some(parent) = path.parent()
        {
            settings.base_dir = Some(parent.join(base));
        }
        Ok(settings)
    }

    /// Load `path` if given, else `ananke.toml` in the default data directory
    /// when it exists, else built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::resolve_in(default_base_dir()),
        }
    }

    fn resolve_in(base: PathBuf) -> Result<Self> {
        let candidate = base.join(SETTINGS_FILE);
        let mut settings = if candidate.is_file() {
            Self::load(&candidate)?
        } else {
            Self::default()
        };
        settings.base_dir.get_or_insert(base);
        Ok(settings)
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(default_base_dir)
    }

    pub fn layout(&self) -> Layout {
        let base = self.base_dir();
        Layout {
            input_dir: base.join(&self.input_dir),
            nbody_dir: base.join(&self.nbody_dir),
            filenames_dir: base.join(&self.filenames_dir),
        }
    }
}

/// Directories a run reads from and stages into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    /// Where archives and parameter files are written.
    pub input_dir: PathBuf,
    /// Parent of the per-run link directories.
    pub nbody_dir: PathBuf,
    /// Where run manifests are written.
    pub filenames_dir: PathBuf,
}

impl Layout {
    /// Default subdirectory names under `base`.
    pub fn under(base: &Path) -> Self {
        Settings {
            base_dir: Some(base.to_path_buf()),
            ..Settings::default()
        }
        .layout()
    }

    /// Create every directory that does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.input_dir, &self.nbody_dir, &self.filenames_dir] {
            fs::create_dir_all(dir).map_err(StoreError::io(dir))?;
        }
        Ok(())
    }
}
