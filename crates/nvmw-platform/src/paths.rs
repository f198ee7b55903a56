use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

const HOME_ENV: &str = "NVM_HOME";
const SETTINGS_FILE: &str = "settings.txt";
const ELEVATE_HELPER: &str = "elevate.cmd";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppPathsError {
    #[error("Could not determine the location of the nvm executable")]
    ExecutableUnavailable,
    #[error("Could not determine data directory")]
    DataDirUnavailable,
}

/// Well-known locations of the tool itself (not of installed Node.js versions).
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// `NVM_HOME`, or the directory holding the executable when unset.
    pub home: PathBuf,
    pub exe_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Build application paths from the process environment.
    ///
    /// # Errors
    /// Returns an error when the executable location or the per-user data
    /// directory cannot be determined.
    pub fn new() -> Result<Self, AppPathsError> {
        Self::resolve(
            std::env::var_os(HOME_ENV),
            std::env::current_exe().ok(),
            dirs::data_local_dir(),
        )
    }

    fn resolve(
        nvm_home: Option<OsString>,
        current_exe: Option<PathBuf>,
        data_local: Option<PathBuf>,
    ) -> Result<Self, AppPathsError> {
        let exe_dir = current_exe
            .as_deref()
            .and_then(std::path::Path::parent)
            .map(std::path::Path::to_path_buf)
            .ok_or(AppPathsError::ExecutableUnavailable)?;
        let home = nvm_home
            .filter(|value| !value.is_empty())
            .map_or_else(|| exe_dir.clone(), PathBuf::from);
        let data_dir = data_local
            .ok_or(AppPathsError::DataDirUnavailable)?
            .join("nvmw");

        Ok(Self {
            home,
            exe_dir,
            data_dir,
        })
    }

    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.home.join(SETTINGS_FILE)
    }

    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("debug.log")
    }

    /// UAC helper script shipped next to the executable.
    #[must_use]
    pub fn elevate_helper(&self) -> PathBuf {
        self.exe_dir.join(ELEVATE_HELPER)
    }

    /// Ensure the data directory exists on disk.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}
