use std::path::PathBuf;
use std::sync::Arc;

use log::debug;
use nvmw_core::{Config, DEFAULT_SYMLINK, HttpTransfer, Session};
use nvmw_platform::{AppPaths, CmdElevator, HostProcessor};

use crate::error::AppError;
use crate::settings::Settings;

pub const SYMLINK_ENV: &str = "NVM_SYMLINK";

/// Process environment and persisted settings, loaded once per invocation.
pub struct Context {
    pub paths: AppPaths,
    pub settings_path: PathBuf,
    pub settings: Settings,
    pub symlink: PathBuf,
    pub host: HostProcessor,
}

impl Context {
    /// # Errors
    /// Fails when the settings file exists but cannot be read.
    pub fn load(paths: AppPaths) -> Result<Self, AppError> {
        let settings_path = paths.settings_file();
        let settings = Settings::load(&settings_path)?;
        let symlink = std::env::var_os(SYMLINK_ENV)
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_SYMLINK), PathBuf::from);
        let host = HostProcessor::detect();
        debug!(
            "Settings {}, symlink {}, host {}",
            settings_path.display(),
            symlink.display(),
            host.reported
        );

        Ok(Self {
            paths,
            settings_path,
            settings,
            symlink,
            host,
        })
    }

    #[must_use]
    pub fn config(&self) -> Config {
        self.settings
            .to_config(&self.paths.home, self.symlink.clone(), self.host.clone())
    }

    /// Build a session over the real network and elevation helper.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be configured (for example an
    /// invalid proxy address).
    pub fn session(&self, insecure: bool) -> Result<Session, AppError> {
        let mut config = self.config();
        if insecure {
            config.verify_ssl = false;
        }
        let transfer =
            HttpTransfer::new(&config).map_err(|error| AppError::operation("configure network", error))?;
        let elevator = CmdElevator::new(Some(self.paths.elevate_helper()));
        Ok(Session::new(config, Arc::new(transfer), Arc::new(elevator)))
    }

    /// # Errors
    /// Fails when the settings file cannot be written.
    pub fn save_settings(&self) -> Result<(), AppError> {
        self.settings.save(&self.settings_path)
    }
}
