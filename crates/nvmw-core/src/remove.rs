use log::info;
use nvmw_backend::{Architecture, NvmError};

use crate::install::Installer;
use crate::inventory::is_installed;
use crate::pointer::{self, elevation_failure};
use crate::resolve::Resolved;
use crate::status::Outcome;

impl Installer<'_> {
    /// Delete an installed version, unlinking the pointer first when it
    /// targets that version.
    ///
    /// # Errors
    /// Returns [`NvmError::VersionNotInstalled`] when no architecture of the
    /// version is present, or the failure to unlink or delete it.
    pub async fn uninstall(&self, token: &str) -> Result<Outcome, NvmError> {
        let config = self.session.config();
        let Resolved { version, .. } = self.session.resolve(token, "", true).await?;

        let present = Architecture::ALL
            .into_iter()
            .any(|arch| is_installed(&config.root, &version, arch.into()));
        if !present {
            return Err(NvmError::VersionNotInstalled {
                version: version.to_string(),
            });
        }
        self.ensure_not_cancelled()?;

        self.reporter
            .progress(format!("Uninstalling node v{version}..."))
            .await;
        let version_dir = config.version_dir(&version);
        if pointer::targets(&config.symlink, &version_dir) {
            pointer::remove(&config.symlink, self.session.elevator())
                .await
                .map_err(|error| elevation_failure(&error))?;
        }
        std::fs::remove_dir_all(&version_dir)
            .map_err(|error| NvmError::io_with_path("remove version directory", &version_dir, &error))?;

        info!("Removed {}", version_dir.display());
        Ok(Outcome::Uninstalled { version })
    }

    /// Uninstall, then install the same version again.
    ///
    /// The request is resolved once against installed versions, so both
    /// steps act on the same release.
    ///
    /// # Errors
    /// Any uninstall or install failure.
    pub async fn reinstall(&self, token: &str, arch_token: &str) -> Result<Outcome, NvmError> {
        let Resolved { version, .. } = self.session.resolve(token, arch_token, true).await?;
        let exact = version.to_string();
        self.uninstall(&exact).await?;
        self.install(&exact, arch_token).await
    }
}
