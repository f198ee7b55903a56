//! The activation pointer: one directory symlink targeting `<root>\v<version>`.

use std::path::{Path, PathBuf};

use log::debug;
use nvmw_backend::{Architecture, NodeVersion, NvmError};
use nvmw_platform::{ElevationError, Elevator};

use crate::arch::detect_executable;
use crate::layout::GENERIC_EXECUTABLE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerState {
    Missing,
    Link(PathBuf),
    /// A real file or directory occupies the pointer path.
    Physical,
}

#[must_use]
pub fn inspect(path: &Path) -> PointerState {
    match std::fs::symlink_metadata(path) {
        Err(_) => PointerState::Missing,
        Ok(meta) if meta.file_type().is_symlink() => match std::fs::read_link(path) {
            Ok(target) => PointerState::Link(target),
            Err(_) => PointerState::Physical,
        },
        Ok(_) => PointerState::Physical,
    }
}

/// Version the pointer targets, taken from the `v<version>` directory name.
#[must_use]
pub fn active_version(path: &Path) -> Option<NodeVersion> {
    let PointerState::Link(target) = inspect(path) else {
        return None;
    };
    target.file_name()?.to_str()?.parse().ok()
}

/// Architecture of the executable currently reachable through the pointer.
#[must_use]
pub fn active_arch(path: &Path) -> Option<Architecture> {
    detect_executable(&path.join(GENERIC_EXECUTABLE))
}

/// # Errors
/// Returns [`NvmError::PointerNotSymlink`] when a physical entry sits at `path`.
pub fn ensure_not_physical(path: &Path) -> Result<(), NvmError> {
    if inspect(path) == PointerState::Physical {
        return Err(NvmError::PointerNotSymlink {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Whether the pointer targets `version_dir`.
///
/// Both sides are canonicalized, so a link into another root that happens to
/// hold a same-named `v<version>` directory does not match. A dangling link
/// only matches its literal target.
#[must_use]
pub fn targets(path: &Path, version_dir: &Path) -> bool {
    let PointerState::Link(target) = inspect(path) else {
        return false;
    };
    match (std::fs::canonicalize(path), std::fs::canonicalize(version_dir)) {
        (Ok(resolved), Ok(expected)) => resolved == expected,
        _ => target == version_dir,
    }
}

/// Remove the symlink with `rmdir`; the target directory is untouched.
///
/// # Errors
/// Returns the elevation failure unchanged.
pub async fn remove(path: &Path, elevator: &dyn Elevator) -> Result<(), ElevationError> {
    debug!("Removing activation pointer {}", path.display());
    elevator
        .run_elevated(&["rmdir".to_string(), path.display().to_string()])
        .await
}

/// Create the pointer with `mklink /D`.
///
/// # Errors
/// Returns the elevation failure unchanged.
pub async fn create(
    path: &Path,
    target: &Path,
    elevator: &dyn Elevator,
) -> Result<(), ElevationError> {
    debug!("Linking {} -> {}", path.display(), target.display());
    elevator
        .run_elevated(&[
            "mklink".to_string(),
            "/D".to_string(),
            path.display().to_string(),
            target.display().to_string(),
        ])
        .await
}

/// Map an elevation failure onto the error taxonomy.
#[must_use]
pub fn elevation_failure(error: &ElevationError) -> NvmError {
    if error.is_access_denied() {
        NvmError::AccessDenied {
            details: format!(
                "Access denied while changing the activation pointer ({error}). Run the terminal as an administrator or enable Developer Mode."
            ),
        }
    } else {
        NvmError::ElevationFailed {
            details: error.to_string(),
        }
    }
}
