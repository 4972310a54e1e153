//! Photometric isochrone directories.
//!
//! A system lives at `<root>/<category>/<name>/` and holds
//! `IsoFileDescriptor.txt` plus one `output_<feh>.dat` track per metallicity.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use ananke_core::constants::ISO_FILE_DESCRIPTOR;
use ananke_core::isochrone::{
    IsochroneDescriptor, IsochroneTable, check_metallicities, describe_tables, track_file_name,
};
use ananke_core::MagColorSelection;

use crate::error::{Result, StoreError};

/// Category directory for systems written from caller-supplied tables.
pub const CUSTOM_CATEGORY: &str = "custom";

/// What a run needs to know about the photometric system it targets.
pub trait PhotometricSystem {
    fn category(&self) -> &str;
    fn name(&self) -> &str;
    fn mag_names(&self) -> &[String];

    /// Every name in `selection` must be a magnitude of this system.
    fn check_selection(&self, selection: &MagColorSelection) -> Result<()> {
        selection.check(self.mag_names())?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Isochrone {
    path: PathBuf,
    category: String,
    name: String,
    descriptor: IsochroneDescriptor,
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

impl Isochrone {
    /// Open an existing system directory and read its descriptor.
    pub fn open(path: &Path) -> Result<Self> {
        let malformed = |detail: String| StoreError::Malformed {
            path: path.to_path_buf(),
            detail,
        };
        let name = dir_name(path).ok_or_else(|| malformed("no system name".to_string()))?;
        let category = path
            .parent()
            .and_then(dir_name)
            .ok_or_else(|| malformed("no category directory".to_string()))?;

        let descriptor_path = path.join(ISO_FILE_DESCRIPTOR);
        let text = fs::read_to_string(&descriptor_path).map_err(StoreError::io(&descriptor_path))?;
        let descriptor = IsochroneDescriptor::parse(&text).map_err(|e| StoreError::Malformed {
            path: descriptor_path.clone(),
            detail: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            category,
            name,
            descriptor,
        })
    }

    /// Validate `tables` and write them as `<root>/custom/<name>/`.
    ///
    /// The metallicity bins must be exactly `required_metallicities`, every
    /// table must share one header holding the required columns and at least
    /// one magnitude. Nothing is written when validation fails.
    pub fn write(
        root: &Path,
        name: &str,
        tables: &[(f64, IsochroneTable)],
        required_metallicities: &[f64],
    ) -> Result<Self> {
        let given: Vec<f64> = tables.iter().map(|(feh, _)| *feh).collect();
        check_metallicities(&given, required_metallicities)?;
        let descriptor = describe_tables(name, tables.iter().map(|(_, t)| t))?;

        let path = root.join(CUSTOM_CATEGORY).join(name);
        fs::create_dir_all(&path).map_err(StoreError::io(&path))?;

        let descriptor_path = path.join(ISO_FILE_DESCRIPTOR);
        fs::write(&descriptor_path, descriptor.render()).map_err(StoreError::io(&descriptor_path))?;

        let order = descriptor.column_order();
        for (feh, table) in tables {
            let track = path.join(track_file_name(*feh));
            fs::write(&track, render_track(&order, table)).map_err(StoreError::io(&track))?;
        }
        tracing::info!(path = %path.display(), tracks = tables.len(), "isochrone written");

        Ok(Self {
            path,
            category: CUSTOM_CATEGORY.to_string(),
            name: name.to_string(),
            descriptor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn descriptor(&self) -> &IsochroneDescriptor {
        &self.descriptor
    }

    /// `<system>_<mag>`, lower-cased, for every magnitude.
    pub fn export_names(&self) -> Vec<String> {
        let system = self.name.to_lowercase();
        self.descriptor
            .magnitude_names
            .iter()
            .map(|m| format!("{system}_{}", m.to_lowercase()))
            .collect()
    }

    /// Track files present in the directory, sorted by name.
    pub fn track_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.path).map_err(StoreError::io(&self.path))?;
        let mut tracks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(StoreError::io(&self.path))?;
            let file = entry.file_name();
            let file = file.to_string_lossy();
            if file.starts_with("output_") && file.ends_with(".dat") {
                tracks.push(entry.path());
            }
        }
        tracks.sort();
        Ok(tracks)
    }
}

impl PhotometricSystem for Isochrone {
    fn category(&self) -> &str {
        &self.category
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mag_names(&self) -> &[String] {
        &self.descriptor.magnitude_names
    }
}

/// `#`-prefixed header line, then one whitespace-separated row per entry.
fn render_track(order: &[String], table: &IsochroneTable) -> String {
    let columns: Vec<&[f64]> = order
        .iter()
        .map(|c| table.get(c).map(Vec::as_slice).unwrap_or(&[]))
        .collect();
    let rows = columns.first().map(|c| c.len()).unwrap_or(0);

    let mut out = format!("# {}\n", order.join(" "));
    for i in 0..rows {
        let row: Vec<String> = columns
            .iter()
            .map(|c| c.get(i).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        let _ = writeln!(out, "{}", row.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ananke_core::InputError;
    use ananke_core::isochrone::REQUIRED_COLUMNS;

    const METALLICITIES: [f64; 2] = [0.0001, 0.0152];

    fn table(mags: &[&str], rows: usize) -> IsochroneTable {
        REQUIRED_COLUMNS
            .iter()
            .chain(mags)
            .enumerate()
            .map(|(j, c)| (c.to_string(), (0..rows).map(|i| (i * 10 + j) as f64).collect()))
            .collect()
    }

    fn tables(mags: &[&str]) -> Vec<(f64, IsochroneTable)> {
        METALLICITIES.iter().map(|f| (*f, table(mags, 3))).collect()
    }

    #[test]
    fn test_write_then_open() {
        let root = tempfile::tempdir().unwrap();
        let written =
            Isochrone::write(root.path(), "MySys", &tables(&["V", "B"]), &METALLICITIES).unwrap();
        let opened = Isochrone::open(written.path()).unwrap();

        assert_eq!(opened.category(), CUSTOM_CATEGORY);
        assert_eq!(opened.name(), "MySys");
        assert_eq!(opened.mag_names(), ["B".to_string(), "V".to_string()]);
        assert_eq!(opened.export_names(), vec!["mysys_b", "mysys_v"]);
        assert_eq!(opened.track_files().unwrap().len(), 2);
    }

    #[test]
    fn test_track_file_layout() {
        let root = tempfile::tempdir().unwrap();
        let iso =
            Isochrone::write(root.path(), "S", &tables(&["V", "B"]), &METALLICITIES).unwrap();
        let text = fs::read_to_string(iso.path().join("output_0.015200.dat")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("# Age M_ini M_act Lum T_eff Grav B V"));
        // B was inserted after V, so it carries column index 7
        assert_eq!(lines.next(), Some("0 1 2 3 4 5 7 6"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_wrong_metallicities_write_nothing() {
        let root = tempfile::tempdir().unwrap();
        let err = Isochrone::write(root.path(), "S", &tables(&["V"]), &[0.0001, 0.03]).unwrap_err();
        assert!(matches!(err, StoreError::Input(InputError::Schema { .. })));
        assert!(!root.path().join(CUSTOM_CATEGORY).exists());
    }

    #[test]
    fn test_no_magnitudes_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = Isochrone::write(root.path(), "S", &tables(&[]), &METALLICITIES).unwrap_err();
        assert!(matches!(err, StoreError::Input(InputError::Configuration(_))));
    }

    #[test]
    fn test_check_selection() {
        let root = tempfile::tempdir().unwrap();
        let iso =
            Isochrone::write(root.path(), "S", &tables(&["V", "B", "I"]), &METALLICITIES).unwrap();
        assert!(iso.check_selection(&MagColorSelection::new("V", "B", "V")).is_ok());
        assert!(matches!(
            iso.check_selection(&MagColorSelection::new("G", "B", "V")),
            Err(StoreError::Input(InputError::UnknownMagnitude { .. }))
        ));
    }

    #[test]
    fn test_open_without_descriptor() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("padova").join("GAIA");
        fs::create_dir_all(&dir).unwrap();
        assert!(matches!(Isochrone::open(&dir), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_open_bad_descriptor() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("padova").join("GAIA");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(ISO_FILE_DESCRIPTOR), "GAIA 9 6 2 G\n\n").unwrap();
        assert!(matches!(Isochrone::open(&dir), Err(StoreError::Malformed { .. })));
    }
}
