use std::path::{Path, PathBuf};

use log::debug;
use nvmw_backend::{Architecture, NvmError};

use crate::arch::detect_executable;

pub const GENERIC_EXECUTABLE: &str = "node.exe";

/// How the executables of one installed version are arranged on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    /// The version directory does not exist.
    Missing,
    /// The directory exists but holds no Node.js executable.
    Empty,
    /// Only `node.exe`; a single-architecture install.
    GenericOnly,
    /// `node32.exe` / `node64.exe` / `nodearm64.exe`, usually next to `node.exe`.
    Tagged,
    /// `32\node.exe`, `64\node.exe`, `arm64\node.exe`.
    ArchDirectories,
}

/// Snapshot of a `v<version>` directory.
#[derive(Debug, Clone)]
pub struct Layout {
    pub kind: LayoutKind,
    dir: PathBuf,
    generic: bool,
    slots: Vec<Architecture>,
}

impl Layout {
    #[must_use]
    pub fn detect(version_dir: &Path) -> Self {
        if !version_dir.is_dir() {
            return Self {
                kind: LayoutKind::Missing,
                dir: version_dir.to_path_buf(),
                generic: false,
                slots: Vec::new(),
            };
        }

        let generic = version_dir.join(GENERIC_EXECUTABLE).is_file();
        let tagged: Vec<Architecture> = Architecture::ALL
            .into_iter()
            .filter(|arch| version_dir.join(arch.tagged_executable()).is_file())
            .collect();
        let subdirs: Vec<Architecture> = Architecture::ALL
            .into_iter()
            .filter(|arch| {
                version_dir
                    .join(arch.token())
                    .join(GENERIC_EXECUTABLE)
                    .is_file()
            })
            .collect();

        let (kind, slots) = if !tagged.is_empty() {
            (LayoutKind::Tagged, tagged)
        } else if !subdirs.is_empty() {
            (LayoutKind::ArchDirectories, subdirs)
        } else if generic {
            (LayoutKind::GenericOnly, Vec::new())
        } else {
            (LayoutKind::Empty, Vec::new())
        };

        Self {
            kind,
            dir: version_dir.to_path_buf(),
            generic,
            slots,
        }
    }

    #[must_use]
    pub fn has_generic(&self) -> bool {
        self.generic
    }

    /// Whether an executable dedicated to `arch` exists (tagged name or subdirectory).
    #[must_use]
    pub fn has_specific(&self, arch: Architecture) -> bool {
        self.slots.contains(&arch)
    }

    #[must_use]
    pub fn has_any_specific(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Architecture of the executable currently in the generic `node.exe` slot.
    #[must_use]
    pub fn generic_arch(&self) -> Option<Architecture> {
        if self.generic {
            detect_executable(&self.dir.join(GENERIC_EXECUTABLE))
        } else {
            None
        }
    }

    /// Every architecture this directory can run, without guessing.
    #[must_use]
    pub fn architectures(&self) -> Vec<Architecture> {
        let generic = self.generic_arch();
        Architecture::ALL
            .into_iter()
            .filter(|arch| self.slots.contains(arch) || generic == Some(*arch))
            .collect()
    }

    fn slot_path(&self, arch: Architecture) -> PathBuf {
        match self.kind {
            LayoutKind::ArchDirectories => self.dir.join(arch.token()).join(GENERIC_EXECUTABLE),
            _ => self.dir.join(arch.tagged_executable()),
        }
    }

    fn free_slot_for_displaced(&self, wanted: Architecture) -> Option<Architecture> {
        if let Some(arch) = self.generic_arch() {
            return Some(arch);
        }
        Architecture::ALL
            .into_iter()
            .find(|arch| *arch != wanted && !self.slot_path(*arch).exists())
    }

    /// Move the `arch` executable into the generic `node.exe` slot.
    ///
    /// The displaced executable is renamed to its own architecture-specific
    /// name. Nothing is copied. A no-op when no dedicated executable exists
    /// for `arch`.
    ///
    /// # Errors
    /// Returns an error when a rename fails or the displaced executable has
    /// nowhere to go.
    pub fn swap_into_generic(&self, arch: Architecture) -> Result<(), NvmError> {
        if !self.has_specific(arch) {
            return Ok(());
        }
        let generic = self.dir.join(GENERIC_EXECUTABLE);
        let incoming = self.slot_path(arch);

        if self.generic {
            let displaced = self.free_slot_for_displaced(arch).ok_or_else(|| {
                NvmError::io_with_path(
                    "free a slot for the active executable",
                    &generic,
                    &std::io::Error::from(std::io::ErrorKind::AlreadyExists),
                )
            })?;
            let parked = self.slot_path(displaced);
            if parked.exists() {
                return Err(NvmError::io_with_path(
                    "park the active executable",
                    &parked,
                    &std::io::Error::from(std::io::ErrorKind::AlreadyExists),
                ));
            }
            if let Some(parent) = parked.parent() {
                std::fs::create_dir_all(parent).map_err(|error| {
                    NvmError::io_with_path("create executable directory", parent, &error)
                })?;
            }
            debug!("Renaming {} -> {}", generic.display(), parked.display());
            std::fs::rename(&generic, &parked).map_err(|error| {
                NvmError::io_with_path("park the active executable", &generic, &error)
            })?;
        }

        debug!("Renaming {} -> {}", incoming.display(), generic.display());
        std::fs::rename(&incoming, &generic)
            .map_err(|error| NvmError::io_with_path("activate executable", &incoming, &error))
    }
}

#[cfg(test)]
mod tests {
    use nvmw_backend::Architecture;

    use super::{Layout, LayoutKind};
    use crate::arch::{detect_executable, fake_executable};

    fn write_exe(path: &std::path::Path, arch: Architecture) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("parent directory should be created");
        }
        std::fs::write(path, fake_executable(arch)).expect("executable should be written");
    }

    #[test]
    fn recognizes_each_layout() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        assert_eq!(Layout::detect(&temp.path().join("v1.0.0")).kind, LayoutKind::Missing);

        let empty = temp.path().join("v2.0.0");
        std::fs::create_dir_all(&empty).expect("dir should be created");
        assert_eq!(Layout::detect(&empty).kind, LayoutKind::Empty);

        let generic = temp.path().join("v3.0.0");
        write_exe(&generic.join("node.exe"), Architecture::X64);
        assert_eq!(Layout::detect(&generic).kind, LayoutKind::GenericOnly);

        let tagged = temp.path().join("v4.0.0");
        write_exe(&tagged.join("node.exe"), Architecture::X64);
        write_exe(&tagged.join("node32.exe"), Architecture::X86);
        let layout = Layout::detect(&tagged);
        assert_eq!(layout.kind, LayoutKind::Tagged);
        assert_eq!(layout.architectures(), vec![Architecture::X86, Architecture::X64]);

        let subdirs = temp.path().join("v5.0.0");
        write_exe(&subdirs.join("32").join("node.exe"), Architecture::X86);
        write_exe(&subdirs.join("64").join("node.exe"), Architecture::X64);
        assert_eq!(Layout::detect(&subdirs).kind, LayoutKind::ArchDirectories);
    }

    #[test]
    fn swap_renames_both_executables() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dir = temp.path().join("v18.2.0");
        write_exe(&dir.join("node.exe"), Architecture::X64);
        write_exe(&dir.join("node32.exe"), Architecture::X86);

        Layout::detect(&dir)
            .swap_into_generic(Architecture::X86)
            .expect("swap should succeed");

        assert_eq!(detect_executable(&dir.join("node.exe")), Some(Architecture::X86));
        assert_eq!(detect_executable(&dir.join("node64.exe")), Some(Architecture::X64));
        assert!(!dir.join("node32.exe").exists());

        Layout::detect(&dir)
            .swap_into_generic(Architecture::X64)
            .expect("swap back should succeed");
        assert_eq!(detect_executable(&dir.join("node.exe")), Some(Architecture::X64));
        assert!(dir.join("node32.exe").exists());
        assert!(!dir.join("node64.exe").exists());
    }

    #[test]
    fn swap_promotes_lone_tagged_executable() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dir = temp.path().join("v14.0.0");
        write_exe(&dir.join("node64.exe"), Architecture::X64);

        Layout::detect(&dir)
            .swap_into_generic(Architecture::X64)
            .expect("swap should succeed");

        assert_eq!(detect_executable(&dir.join("node.exe")), Some(Architecture::X64));
        assert!(!dir.join("node64.exe").exists());
    }

    #[test]
    fn swap_is_noop_when_generic_already_matches() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dir = temp.path().join("v20.0.0");
        write_exe(&dir.join("node.exe"), Architecture::X64);

        Layout::detect(&dir)
            .swap_into_generic(Architecture::X64)
            .expect("swap should succeed");

        assert_eq!(detect_executable(&dir.join("node.exe")), Some(Architecture::X64));
    }

    #[test]
    fn swap_works_with_architecture_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dir = temp.path().join("v0.12.0");
        write_exe(&dir.join("node.exe"), Architecture::X86);
        write_exe(&dir.join("64").join("node.exe"), Architecture::X64);

        Layout::detect(&dir)
            .swap_into_generic(Architecture::X64)
            .expect("swap should succeed");

        assert_eq!(detect_executable(&dir.join("node.exe")), Some(Architecture::X64));
        assert_eq!(
            detect_executable(&dir.join("32").join("node.exe")),
            Some(Architecture::X86)
        );
    }
}
