//! Staging a run where the synthesis engine looks for it.
//!
//! `<nbody_dir>/<name>/` receives symlinks to the kernel and particle
//! archives and `<filenames_dir>/<name>.txt` names the run and its particle
//! file. Staging the same run twice is a no-op; staging different files
//! under an existing name is a conflict, and so is a run directory holding
//! any entry other than the two links.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::error::{Result, StoreError};

/// Paths created (or found already in place) by [`stage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedRun {
    pub dir: PathBuf,
    pub links: Vec<PathBuf>,
    pub manifest: PathBuf,
}

pub fn manifest_path(layout: &Layout, name: &str) -> PathBuf {
    layout.filenames_dir.join(format!("{name}.txt"))
}

/// Run name, then the particle file name, one per line.
pub fn manifest_contents(name: &str, particle_path: &Path) -> String {
    let pname = particle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{name}\n{pname}\n")
}

/// Check what is already staged under `name` without touching anything.
///
/// Returns `Ok(true)` when the run directory already links to at least one
/// of these archives, `Ok(false)` when nothing of the run is staged yet, and
/// `StoreError::Conflict` when the directory or manifest holds anything
/// staging these archives would not produce.
pub fn check_staged(
    layout: &Layout,
    kernel_path: &Path,
    particle_path: &Path,
    name: &str,
) -> Result<bool> {
    let mut expected = Vec::with_capacity(2);
    for source in [kernel_path, particle_path] {
        let file_name = source.file_name().ok_or_else(|| StoreError::Malformed {
            path: source.to_path_buf(),
            detail: "not a file".to_string(),
        })?;
        expected.push((file_name.to_os_string(), resolved(source)));
    }

    let manifest = manifest_path(layout, name);
    match fs::read_to_string(&manifest) {
        Ok(existing) if existing != manifest_contents(name, particle_path) => {
            return Err(StoreError::Conflict {
                path: manifest,
                detail: "manifest exists with different contents".to_string(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(StoreError::io(&manifest)(e)),
    }

    let dir = layout.nbody_dir.join(name);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StoreError::io(&dir)(e)),
    };
    let mut linked = false;
    for entry in entries {
        let path = entry.map_err(StoreError::io(&dir))?.path();
        let Some((_, target)) = expected
            .iter()
            .find(|(file_name, _)| path.file_name() == Some(file_name.as_os_str()))
        else {
            return Err(StoreError::Conflict {
                path,
                detail: format!("run '{name}' is staged with a different file"),
            });
        };
        let existing = fs::read_link(&path).ok();
        if target.is_none() || existing != *target {
            return Err(StoreError::Conflict {
                path,
                detail: format!("run '{name}' links this name to another archive"),
            });
        }
        linked = true;
    }
    Ok(linked)
}

/// Canonical form of `path`, also when only its parent exists yet.
fn resolved(path: &Path) -> Option<PathBuf> {
    if let Ok(target) = fs::canonicalize(path) {
        return Some(target);
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
}

pub fn stage(
    layout: &Layout,
    kernel_path: &Path,
    particle_path: &Path,
    name: &str,
) -> Result<StagedRun> {
    check_staged(layout, kernel_path, particle_path, name)?;
    let dir = layout.nbody_dir.join(name);
    fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;

    let mut links = Vec::with_capacity(2);
    for source in [kernel_path, particle_path] {
        links.push(link_into(source, &dir)?);
    }

    fs::create_dir_all(&layout.filenames_dir).map_err(StoreError::io(&layout.filenames_dir))?;
    let manifest = manifest_path(layout, name);
    write_once(&manifest, &manifest_contents(name, particle_path))?;

    tracing::info!(run = name, dir = %dir.display(), "run staged");
    Ok(StagedRun {
        dir,
        links,
        manifest,
    })
}

fn link_into(source: &Path, dir: &Path) -> Result<PathBuf> {
    let target = fs::canonicalize(source).map_err(StoreError::io(source))?;
    let file_name = target.file_name().ok_or_else(|| StoreError::Malformed {
        path: target.clone(),
        detail: "not a file".to_string(),
    })?;
    let link = dir.join(file_name);

    match fs::symlink_metadata(&link) {
        Ok(meta) => {
            let existing = if meta.file_type().is_symlink() {
                fs::read_link(&link).ok()
            } else {
                None
            };
            if existing.as_deref() == Some(target.as_path()) {
                tracing::debug!(link = %link.display(), "link already in place");
                return Ok(link);
            }
            Err(StoreError::Conflict {
                path: link,
                detail: format!("exists and does not point to {}", target.display()),
            })
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            symlink(&target, &link).map_err(StoreError::io(&link))?;
            tracing::debug!(link = %link.display(), target = %target.display(), "link created");
            Ok(link)
        }
        Err(e) => Err(StoreError::io(&link)(e)),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn write_once(path: &Path, contents: &str) -> Result<()> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == contents => {
            tracing::debug!(path = %path.display(), "manifest unchanged");
            Ok(())
        }
        Ok(_) => Err(StoreError::Conflict {
            path: path.to_path_buf(),
            detail: "manifest exists with different contents".to_string(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::write(path, contents).map_err(StoreError::io(path))?;
            tracing::debug!(path = %path.display(), "manifest written");
            Ok(())
        }
        Err(e) => Err(StoreError::io(path)(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _root: tempfile::TempDir,
        layout: Layout,
        kernels: PathBuf,
        particles: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let layout = Layout::under(root.path());
        layout.ensure().unwrap();
        let kernels = layout.input_dir.join("sim_d6n64_den.arr");
        let particles = layout.input_dir.join("sim.arr");
        fs::write(&kernels, b"k").unwrap();
        fs::write(&particles, b"p").unwrap();
        Fixture {
            _root: root,
            layout,
            kernels,
            particles,
        }
    }

    #[test]
    fn test_stage_creates_links_and_manifest() {
        let f = fixture();
        let staged = stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap();

        assert_eq!(staged.dir, f.layout.nbody_dir.join("sim"));
        assert_eq!(staged.links.len(), 2);
        for (link, source) in staged.links.iter().zip([&f.kernels, &f.particles]) {
            assert!(fs::symlink_metadata(link).unwrap().file_type().is_symlink());
            assert_eq!(fs::read(link).unwrap(), fs::read(source).unwrap());
        }
        assert_eq!(staged.manifest, f.layout.filenames_dir.join("sim.txt"));
        assert_eq!(fs::read_to_string(&staged.manifest).unwrap(), "sim\nsim.arr\n");
    }

    #[test]
    fn test_restaging_is_noop() {
        let f = fixture();
        let first = stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap();
        let second = stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_foreign_file_in_run_dir_conflicts() {
        let f = fixture();
        let dir = f.layout.nbody_dir.join("sim");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("sim.arr"), b"someone else's").unwrap();
        let err = stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_differing_manifest_conflicts() {
        let f = fixture();
        fs::write(f.layout.filenames_dir.join("sim.txt"), "sim\nother.arr\n").unwrap();
        let err = stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap_err();
        match err {
            StoreError::Conflict { path, .. } => assert_eq!(path, manifest_path(&f.layout, "sim")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_kernel_file_under_staged_name_conflicts() {
        let f = fixture();
        stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap();
        let position_only = f.layout.input_dir.join("sim_d3n64_den.arr");
        fs::write(&position_only, b"k3").unwrap();

        let err = stage(&f.layout, &position_only, &f.particles, "sim").unwrap_err();
        match err {
            StoreError::Conflict { path, .. } => {
                assert_eq!(path, f.layout.nbody_dir.join("sim").join("sim_d6n64_den.arr"))
            }
            other => panic!("unexpected {other:?}"),
        }
        let mut names: Vec<_> = fs::read_dir(f.layout.nbody_dir.join("sim"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, ["sim.arr", "sim_d6n64_den.arr"]);
    }

    #[test]
    fn test_check_staged_reports_existing_links() {
        let f = fixture();
        assert!(!check_staged(&f.layout, &f.kernels, &f.particles, "sim").unwrap());
        stage(&f.layout, &f.kernels, &f.particles, "sim").unwrap();
        assert!(check_staged(&f.layout, &f.kernels, &f.particles, "sim").unwrap());
    }

    #[test]
    fn test_check_staged_accepts_archives_not_yet_written() {
        let f = fixture();
        let kernels = f.layout.input_dir.join("new_d6n64_den.arr");
        let particles = f.layout.input_dir.join("new.arr");
        assert!(!check_staged(&f.layout, &kernels, &particles, "new").unwrap());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let f = fixture();
        let absent = f.layout.input_dir.join("absent.arr");
        let err = stage(&f.layout, &absent, &f.particles, "sim").unwrap_err();
        match err {
            StoreError::Io { path, .. } => assert_eq!(path, absent),
            other => panic!("unexpected {other:?}"),
        }
    }
}
