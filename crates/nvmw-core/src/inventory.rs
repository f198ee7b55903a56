use std::path::Path;

use log::debug;
use nvmw_backend::{ArchRequest, Architecture, NodeVersion, NvmError, PartialVersion};

use crate::layout::Layout;

/// Versions installed under `root`, newest first.
///
/// # Errors
/// Returns an error if an existing root cannot be read. A missing root is
/// simply empty.
pub fn list_installed(root: &Path) -> Result<Vec<NodeVersion>, NvmError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(NvmError::io_with_path("read installation root", root, &error)),
    };

    let mut versions: Vec<NodeVersion> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            let version = name.strip_prefix('v')?.parse().ok();
            if version.is_none() {
                debug!("Ignoring non-version directory {name}");
            }
            version
        })
        .collect();
    versions.sort_unstable_by(|a, b| b.cmp(a));
    Ok(versions)
}

/// Newest installed version, if any.
///
/// # Errors
/// Propagates [`list_installed`] failures.
pub fn newest_installed(root: &Path) -> Result<Option<NodeVersion>, NvmError> {
    Ok(list_installed(root)?.into_iter().next())
}

/// Highest installed version on a partial line such as `18` or `18.2`.
///
/// # Errors
/// Propagates [`list_installed`] failures.
pub fn newest_installed_matching(
    root: &Path,
    line: PartialVersion,
) -> Result<Option<NodeVersion>, NvmError> {
    Ok(list_installed(root)?
        .into_iter()
        .find(|version| line.matches(version)))
}

/// Whether `version` is installed for the requested architecture.
///
/// Legacy layouts are ambiguous, so any version that holds both a
/// dedicated executable and `node.exe` counts as installed for a single
/// architecture.
#[must_use]
pub fn is_installed(root: &Path, version: &NodeVersion, request: ArchRequest) -> bool {
    let layout = Layout::detect(&root.join(version.dir_name()));
    let has_32 = layout.has_specific(Architecture::X86);
    let has_64 = layout.has_specific(Architecture::X64);

    match request {
        ArchRequest::All => ((has_32 || has_64) && layout.has_generic()) || (has_32 && has_64),
        ArchRequest::Single(arch) => {
            if layout.has_specific(arch) {
                return true;
            }
            if layout.has_any_specific() {
                return layout.has_generic();
            }
            layout.has_generic() && layout.generic_arch() == Some(arch)
        }
    }
}

/// Architectures of `version` present under `root`, without legacy guessing.
#[must_use]
pub fn installed_architectures(root: &Path, version: &NodeVersion) -> Vec<Architecture> {
    Layout::detect(&root.join(version.dir_name())).architectures()
}
