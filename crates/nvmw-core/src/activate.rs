use std::path::Path;

use log::{debug, info};
use nvmw_backend::{ArchRequest, Architecture, NodeVersion, NvmError};

use crate::install::Installer;
use crate::inventory::{installed_architectures, is_installed, newest_installed};
use crate::layout::Layout;
use crate::pointer::{self, PointerState, elevation_failure};
use crate::resolve::Resolved;
use crate::state::{InstallState, Transitions};
use crate::status::Outcome;

/// `mklink` attempts before an "already exists" answer is treated as final.
pub const MAX_LINK_ATTEMPTS: usize = 2;

impl Installer<'_> {
    /// Point the activation symlink at an installed version.
    ///
    /// # Errors
    /// Fails when the version is not installed for the requested
    /// architecture, the pointer path holds a real directory, or the link
    /// cannot be changed.
    pub async fn use_version(&self, token: &str, arch_token: &str) -> Result<Outcome, NvmError> {
        let mut transitions = Transitions::default();
        let result = self.run_use(&mut transitions, token, arch_token).await;
        transitions.finish(&result);
        result
    }

    async fn run_use(
        &self,
        transitions: &mut Transitions,
        token: &str,
        arch_token: &str,
    ) -> Result<Outcome, NvmError> {
        transitions.advance(InstallState::Resolving)?;
        let config = self.session.config();
        let Resolved { version, arch } = self.session.resolve(token, arch_token, true).await?;
        let ArchRequest::Single(arch) = arch else {
            return Err(NvmError::InvalidArchitecture {
                token: "all".to_string(),
            });
        };

        if !config.version_dir(&version).is_dir() {
            return Err(NvmError::VersionNotInstalled {
                version: version.to_string(),
            });
        }
        if !is_installed(&config.root, &version, arch.into()) {
            let alternative = installed_architectures(&config.root, &version)
                .into_iter()
                .find(|other| *other != arch);
            return Err(NvmError::NotInstalled {
                version: version.to_string(),
                arch,
                alternative,
            });
        }

        let version_dir = config.version_dir(&version);
        if pointer::targets(&config.symlink, &version_dir)
            && pointer::active_arch(&config.symlink) == Some(arch)
        {
            info!("v{version} ({arch}) is already active");
            return Ok(Outcome::AlreadyActive { version, arch });
        }

        transitions.advance(InstallState::Activating)?;
        self.activate(&version, arch).await?;
        Ok(Outcome::Activated { version, arch })
    }

    /// Relink the pointer to `version` and move `arch` into `node.exe`.
    async fn activate(&self, version: &NodeVersion, arch: Architecture) -> Result<(), NvmError> {
        let config = self.session.config();
        let link = &config.symlink;
        let target = config.version_dir(version);

        pointer::ensure_not_physical(link)?;
        if pointer::inspect(link) != PointerState::Missing {
            pointer::remove(link, self.session.elevator())
                .await
                .map_err(|error| elevation_failure(&error))?;
        }
        self.link(link, &target).await?;

        Layout::detect(&target).swap_into_generic(arch)?;
        info!("Now using node v{version} ({})", arch.label());
        Ok(())
    }

    async fn link(&self, link: &Path, target: &Path) -> Result<(), NvmError> {
        let elevator = self.session.elevator();
        let mut attempt = 1;
        loop {
            let Err(error) = pointer::create(link, target, elevator).await else {
                return Ok(());
            };
            if !error.is_already_exists() || attempt >= MAX_LINK_ATTEMPTS {
                return Err(elevation_failure(&error));
            }
            attempt += 1;
            debug!("Pointer still exists, removing it before retrying ({error})");
            pointer::ensure_not_physical(link)?;
            pointer::remove(link, elevator)
                .await
                .map_err(|error| elevation_failure(&error))?;
        }
    }

    /// Activate the newest installed version with the default architecture.
    ///
    /// # Errors
    /// Returns [`NvmError::NoneInstalled`] when nothing is installed, or any
    /// activation failure.
    pub async fn enable(&self) -> Result<Outcome, NvmError> {
        let newest = newest_installed(&self.session.config().root)?.ok_or(NvmError::NoneInstalled)?;
        self.use_version(&newest.to_string(), "").await
    }

    /// Remove the activation pointer; installed versions stay untouched.
    ///
    /// # Errors
    /// Fails when the pointer is a physical directory or cannot be removed.
    pub async fn disable(&self) -> Result<Outcome, NvmError> {
        let link = &self.session.config().symlink;
        pointer::ensure_not_physical(link)?;
        if pointer::inspect(link) == PointerState::Missing {
            debug!("No activation pointer at {}", link.display());
            return Ok(Outcome::Disabled);
        }
        pointer::remove(link, self.session.elevator())
            .await
            .map_err(|error| elevation_failure(&error))?;
        Ok(Outcome::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use nvmw_backend::{Architecture, NodeVersion, NvmError};
    use tokio_util::sync::CancellationToken;

    use crate::arch::{detect_executable, fake_executable};
    use crate::install::Installer;
    use crate::pointer::{PointerState, active_arch, active_version, inspect};
    use crate::session::Session;
    use crate::status::{Outcome, Reporter};
    use crate::testing::{LinkElevator, MockTransfer, session_full, symlink_dir, test_config};

    fn fixture(elevator: LinkElevator) -> (tempfile::TempDir, Session, std::sync::Arc<LinkElevator>) {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let config = test_config(temp.path());
        let root = config.root.clone();

        let v20 = root.join("v20.9.0");
        std::fs::create_dir_all(&v20).expect("version dir should be created");
        std::fs::write(v20.join("node.exe"), fake_executable(Architecture::X64))
            .expect("exe should be written");
        std::fs::write(v20.join("node32.exe"), fake_executable(Architecture::X86))
            .expect("exe should be written");

        let v18 = root.join("v18.2.0");
        std::fs::create_dir_all(&v18).expect("version dir should be created");
        std::fs::write(v18.join("node64.exe"), fake_executable(Architecture::X64))
            .expect("exe should be written");

        let (session, _, elevator) = session_full(config, MockTransfer::new(), elevator);
        (temp, session, elevator)
    }

    fn installer(session: &Session) -> Installer<'_> {
        let (reporter, _rx) = Reporter::channel(64);
        Installer::new(session, reporter, CancellationToken::new())
    }

    #[tokio::test]
    async fn use_switches_pointer_and_architecture() {
        let (_temp, session, _) = fixture(LinkElevator::new());
        let installer = installer(&session);
        let link = session.config().symlink.clone();

        let outcome = installer.use_version("20.9.0", "32").await.expect("use should succeed");
        assert_eq!(
            outcome,
            Outcome::Activated {
                version: NodeVersion::new(20, 9, 0),
                arch: Architecture::X86,
            }
        );
        assert_eq!(active_version(&link), Some(NodeVersion::new(20, 9, 0)));
        assert_eq!(active_arch(&link), Some(Architecture::X86));
        let version_dir = session.config().root.join("v20.9.0");
        assert_eq!(detect_executable(&version_dir.join("node64.exe")), Some(Architecture::X64));
        assert!(!version_dir.join("node32.exe").exists());

        let again = installer.use_version("20.9.0", "32").await.expect("use should succeed");
        assert!(matches!(again, Outcome::AlreadyActive { .. }));

        installer.use_version("18", "64").await.expect("partial use should succeed");
        assert_eq!(active_version(&link), Some(NodeVersion::new(18, 2, 0)));
        assert_eq!(active_arch(&link), Some(Architecture::X64));
    }

    #[tokio::test]
    async fn missing_architecture_suggests_alternative() {
        let (_temp, session, _) = fixture(LinkElevator::new());
        let installer = installer(&session);

        let error = installer
            .use_version("18.2.0", "32")
            .await
            .expect_err("32-bit is not installed");
        assert_eq!(
            error,
            NvmError::NotInstalled {
                version: "18.2.0".to_string(),
                arch: Architecture::X86,
                alternative: Some(Architecture::X64),
            }
        );
        assert!(matches!(
            installer.use_version("16.0.0", "64").await,
            Err(NvmError::VersionNotInstalled { .. })
        ));
    }

    #[tokio::test]
    async fn physical_pointer_is_a_hard_stop() {
        let (_temp, session, elevator) = fixture(LinkElevator::new());
        std::fs::create_dir_all(&session.config().symlink).expect("dir should be created");

        assert!(matches!(
            installer(&session).use_version("20.9.0", "64").await,
            Err(NvmError::PointerNotSymlink { .. })
        ));
        assert!(elevator.calls().is_empty());
    }

    #[tokio::test]
    async fn access_denied_is_reported() {
        let (_temp, session, _) = fixture(LinkElevator::denying());

        let error = installer(&session)
            .use_version("20.9.0", "64")
            .await
            .expect_err("linking should be denied");
        assert!(matches!(error, NvmError::AccessDenied { .. }));
        assert!(error.to_string().contains("https://bit.ly/nvm4w-help"));
    }

    #[tokio::test]
    async fn stale_link_is_replaced() {
        let (_temp, session, elevator) = fixture(LinkElevator::new());
        let link = session.config().symlink.clone();
        symlink_dir(&session.config().root.join("v18.2.0"), &link).expect("pointer should be linked");

        installer(&session).use_version("20.9.0", "64").await.expect("use should succeed");

        assert_eq!(active_version(&link), Some(NodeVersion::new(20, 9, 0)));
        let verbs: Vec<String> = elevator.calls().into_iter().map(|call| call[0].clone()).collect();
        assert_eq!(verbs, vec!["rmdir".to_string(), "mklink".to_string()]);
    }

    #[tokio::test]
    async fn on_and_off_round_trip() {
        let (_temp, session, _) = fixture(LinkElevator::new());
        let installer = installer(&session);
        let link = session.config().symlink.clone();

        let outcome = installer.enable().await.expect("enable should succeed");
        assert!(matches!(outcome, Outcome::Activated { ref version, .. } if *version == NodeVersion::new(20, 9, 0)));

        assert_eq!(installer.disable().await.expect("disable should succeed"), Outcome::Disabled);
        assert_eq!(inspect(&link), PointerState::Missing);
        assert_eq!(installer.disable().await.expect("disable is idempotent"), Outcome::Disabled);
        assert!(session.config().root.join("v20.9.0").is_dir());
    }
}
