//! Downloading a release into the installation root.
//!
//! Every install stages its files in a hidden directory under the root, so
//! the final move into `<root>\v<version>` is a same-volume rename. A failure
//! or interrupt before that move only has to drop the staging directory.

use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use nvmw_backend::{ArchRequest, Architecture, NodeVersion, NvmError};
use tokio_util::sync::CancellationToken;

use crate::arch::is_available;
use crate::archive::{extract_zip, flatten, merge_into};
use crate::checksum::{parse_expected_checksum, sha256_file};
use crate::inventory::{installed_architectures, is_installed};
use crate::resolve::Resolved;
use crate::retry::{MOVE_RETRY_DELAYS, with_backoff};
use crate::session::Session;
use crate::state::{InstallState, Transitions};
use crate::status::{Outcome, Reporter};

const STAGING_PREFIX: &str = ".nvm-install-";
const NPM_STAGING_PREFIX: &str = ".nvm-npm-";
const NPM_EXECUTABLES: [&str; 4] = ["npm", "npm.cmd", "npx", "npx.cmd"];

/// The file fetched for one architecture of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeArtifact {
    /// Path under the node mirror, which is also the name listed in
    /// `v<version>/SHASUMS256.txt` once the `v<version>/` prefix is dropped.
    listed_name: String,
    path: String,
    file_name: String,
    /// Top-level folder of the zip distribution.
    folder: Option<String>,
}

impl NodeArtifact {
    /// Full zip distributions exist from 16.9.0 on; they are only used for the
    /// first architecture of a version so `node.exe` is never overwritten.
    fn select(version: &NodeVersion, arch: Architecture, appending: bool) -> Self {
        let zipped = (version.major, version.minor, version.patch) >= (16, 9, 0);
        if zipped && !appending {
            let folder = format!("node-v{version}-win-{}", arch.dist_name());
            let file_name = format!("{folder}.zip");
            return Self {
                listed_name: file_name.clone(),
                path: format!("v{version}/{file_name}"),
                file_name,
                folder: Some(folder),
            };
        }

        let prefix = if version.major > 0 {
            format!("win-{}/", arch.dist_name())
        } else {
            match arch {
                Architecture::X86 => String::new(),
                Architecture::X64 => "x64/".to_string(),
                Architecture::Arm64 => "arm64/".to_string(),
            }
        };
        let listed_name = format!("{prefix}node.exe");
        Self {
            path: format!("v{version}/{listed_name}"),
            listed_name,
            file_name: arch.tagged_executable().to_string(),
            folder: None,
        }
    }
}

/// Runs install, activation and removal for one session, reporting through
/// the status channel.
pub struct Installer<'a> {
    pub(crate) session: &'a Session,
    pub(crate) reporter: Reporter,
    pub(crate) cancel: CancellationToken,
    retry_delays: Vec<Duration>,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(session: &'a Session, reporter: Reporter, cancel: CancellationToken) -> Self {
        Self {
            session,
            reporter,
            cancel,
            retry_delays: MOVE_RETRY_DELAYS.to_vec(),
        }
    }

    /// Override the backoff used when moving the npm tree into place.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub(crate) fn ensure_not_cancelled(&self) -> Result<(), NvmError> {
        if self.cancel.is_cancelled() {
            Err(NvmError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Install the release `token` resolves to.
    ///
    /// # Errors
    /// Resolution, transfer and filesystem failures end the install; the
    /// staging directory is discarded and a partially merged version
    /// directory created by this run is removed.
    pub async fn install(&self, token: &str, arch_token: &str) -> Result<Outcome, NvmError> {
        let mut transitions = Transitions::default();
        let result = self.run_install(&mut transitions, token, arch_token).await;
        transitions.finish(&result);
        result
    }

    async fn run_install(
        &self,
        transitions: &mut Transitions,
        token: &str,
        arch_token: &str,
    ) -> Result<Outcome, NvmError> {
        transitions.advance(InstallState::Resolving)?;
        let config = self.session.config();
        let Resolved { version, arch } = self.session.resolve(token, arch_token, false).await?;

        if is_installed(&config.root, &version, arch) {
            info!("Node.js v{version} ({arch}) is already installed");
            return Ok(Outcome::AlreadyInstalled { version, arch });
        }

        self.check_released(&version).await?;
        if let ArchRequest::Single(single) = arch
            && !is_available(&version, single)
        {
            return Err(NvmError::ArchUnavailable {
                version: version.to_string(),
                arch: single,
            });
        }
        if !self.session.catalog().await?.contains(&version) {
            return Err(NvmError::VersionNotAvailable {
                version: version.to_string(),
                index_url: config.mirrors.index_url(),
            });
        }

        let plan = self.plan(&version, arch).await;
        if plan.is_empty() {
            return Ok(Outcome::AlreadyInstalled { version, arch });
        }

        std::fs::create_dir_all(&config.root)
            .map_err(|error| NvmError::io_with_path("create installation root", &config.root, &error))?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&config.root)
            .map_err(|error| NvmError::io_with_path("create staging directory", &config.root, &error))?;
        let staged = staging.path().join(version.dir_name());
        std::fs::create_dir_all(&staged)
            .map_err(|error| NvmError::io_with_path("create staging directory", &staged, &error))?;
        debug!("Staging v{version} in {}", staged.display());

        let manifest = self.checksum_manifest(&version).await?;
        let mut appending = !installed_architectures(&config.root, &version).is_empty();
        let mut installed = Vec::new();

        for target in plan {
            self.ensure_not_cancelled()?;
            transitions.advance(InstallState::Downloading)?;

            let artifact = NodeArtifact::select(&version, target, appending);
            let url = config.mirrors.node_url(&artifact.path);
            if !self.session.transfer().head(&url).await? {
                if arch == ArchRequest::All {
                    self.reporter
                        .warning(format!(
                            "Node.js v{version} {} isn't available right now, skipping.",
                            target.label()
                        ))
                        .await;
                    continue;
                }
                return Err(NvmError::ArchUnavailable {
                    version: version.to_string(),
                    arch: target,
                });
            }

            self.reporter
                .progress(format!("Downloading node.js version {version} ({})...", target.label()))
                .await;
            let dest = match artifact.folder {
                Some(_) => staging.path().join(&artifact.file_name),
                None => staged.join(&artifact.file_name),
            };
            let bytes = self
                .session
                .transfer()
                .download(&url, &dest, &self.cancel)
                .await?;
            debug!("Downloaded {bytes} bytes from {url}");
            self.verify_checksum(manifest.as_deref(), &artifact, &dest).await?;

            if let Some(folder) = &artifact.folder {
                self.ensure_not_cancelled()?;
                transitions.advance(InstallState::Extracting)?;
                self.reporter.progress("Extracting node and npm...").await;
                extract_zip(&dest, &staged)?;
                std::fs::remove_file(&dest)
                    .map_err(|error| NvmError::io_with_path("remove archive", &dest, &error))?;
                flatten(&staged, folder)?;
            }
            self.reporter.progress("Complete").await;
            installed.push(target);
            appending = true;
        }

        if installed.is_empty() {
            return Err(NvmError::VersionNotAvailable {
                version: version.to_string(),
                index_url: config.mirrors.index_url(),
            });
        }

        self.ensure_not_cancelled()?;
        self.install_npm(transitions, &version, &staged).await?;
        self.ensure_not_cancelled()?;
        self.commit(&staged, &version)?;

        info!("Installed Node.js v{version} ({installed:?})");
        Ok(Outcome::Installed {
            version,
            architectures: installed,
        })
    }

    async fn check_released(&self, version: &NodeVersion) -> Result<(), NvmError> {
        match self.session.latest_released().await {
            Ok(latest) if *version > latest => Err(NvmError::Unreleased {
                version: version.to_string(),
            }),
            Ok(_) => Ok(()),
            Err(NvmError::Cancelled) => Err(NvmError::Cancelled),
            Err(error) => {
                self.reporter
                    .warning(format!("Could not determine the latest release: {error}"))
                    .await;
                Ok(())
            }
        }
    }

    /// Architectures still to download, in install order.
    async fn plan(&self, version: &NodeVersion, request: ArchRequest) -> Vec<Architecture> {
        if request != ArchRequest::All {
            return request.architectures();
        }

        let present = installed_architectures(&self.session.config().root, version);
        let mut plan = Vec::new();
        for arch in Architecture::ALL {
            if present.contains(&arch) {
                debug!("v{version} already has a {} executable", arch.label());
            } else if is_available(version, arch) {
                plan.push(arch);
            } else {
                self.reporter
                    .warning(format!(
                        "Node.js v{version} is not available as a {} build, skipping.",
                        arch.label()
                    ))
                    .await;
            }
        }
        plan
    }

    async fn checksum_manifest(&self, version: &NodeVersion) -> Result<Option<String>, NvmError> {
        let url = self
            .session
            .config()
            .mirrors
            .node_url(&format!("v{version}/SHASUMS256.txt"));
        match self.session.transfer().get_text(&url).await {
            Ok(text) => Ok(Some(text)),
            Err(NvmError::Cancelled) => Err(NvmError::Cancelled),
            Err(error) => {
                self.reporter
                    .warning(format!(
                        "Could not download {url} ({error}); downloads will not be verified."
                    ))
                    .await;
                Ok(None)
            }
        }
    }

    async fn verify_checksum(
        &self,
        manifest: Option<&str>,
        artifact: &NodeArtifact,
        path: &Path,
    ) -> Result<(), NvmError> {
        let Some(manifest) = manifest else {
            return Ok(());
        };
        let Some(expected) = parse_expected_checksum(manifest, &artifact.listed_name) else {
            self.reporter
                .warning(format!("No checksum listed for {}, skipping verification.", artifact.listed_name))
                .await;
            return Ok(());
        };

        let actual = sha256_file(path)?;
        if actual.eq_ignore_ascii_case(&expected) {
            info!("Checksum verified for {}", artifact.listed_name);
            Ok(())
        } else {
            Err(NvmError::ChecksumMismatch {
                artifact: artifact.listed_name.clone(),
                expected,
                actual,
            })
        }
    }

    async fn install_npm(
        &self,
        transitions: &mut Transitions,
        version: &NodeVersion,
        staged: &Path,
    ) -> Result<(), NvmError> {
        let config = self.session.config();
        let bundled = Path::new("node_modules").join("npm");
        if staged.join(&bundled).is_dir() || config.version_dir(version).join(&bundled).is_dir() {
            debug!("npm is already present for v{version}");
            return Ok(());
        }

        let Some(npm) = self.session.catalog().await?.npm_version(version).map(str::to_string) else {
            self.reporter
                .warning(format!("No npm version is listed for node v{version}; npm was not installed."))
                .await;
            return Ok(());
        };
        let failed = |details: String| NvmError::PackageManager {
            npm_version: npm.clone(),
            details,
        };

        transitions.advance(InstallState::InstallingPackageManager)?;
        self.reporter.progress(format!("Downloading npm v{npm}...")).await;

        let temp = tempfile::Builder::new()
            .prefix(NPM_STAGING_PREFIX)
            .tempdir_in(&config.root)
            .map_err(|error| failed(error.to_string()))?;
        let archive = temp.path().join(format!("npm-v{npm}.zip"));
        let url = config.mirrors.npm_url(&format!("v{npm}.zip"));
        match self.session.transfer().download(&url, &archive, &self.cancel).await {
            Ok(_) => {}
            Err(NvmError::Cancelled) => return Err(NvmError::Cancelled),
            Err(error) => return Err(failed(error.to_string())),
        }

        self.reporter.progress(format!("Installing npm v{npm}...")).await;
        let extracted = temp.path().join("nvm-npm");
        extract_zip(&archive, &extracted).map_err(|error| failed(error.to_string()))?;

        let source = ["cli", "npm"]
            .iter()
            .map(|prefix| extracted.join(format!("{prefix}-{npm}")))
            .find(|dir| dir.join("bin").is_dir())
            .ok_or_else(|| {
                failed(format!(
                    "could not find {}",
                    extracted.join(format!("cli-{npm}")).join("bin").display()
                ))
            })?;
        let bin = source.join("bin");

        for name in NPM_EXECUTABLES {
            let from = bin.join(name);
            if !from.is_file() {
                debug!("npm distribution has no {name}");
                continue;
            }
            std::fs::rename(&from, staged.join(name)).map_err(|error| failed(error.to_string()))?;
        }

        let modules = staged.join("node_modules");
        std::fs::create_dir_all(&modules).map_err(|error| failed(error.to_string()))?;
        let dest = modules.join("npm");
        with_backoff(&self.retry_delays, || std::fs::rename(&source, &dest))
            .await
            .map_err(|error| {
                failed(format!(
                    "unable to move {} to node_modules: {error}",
                    source.display()
                ))
            })?;

        info!("Installed npm v{npm} for node v{version}");
        Ok(())
    }

    /// Move the staged version into the root. A version directory created by
    /// this move is deleted again when the move fails halfway.
    fn commit(&self, staged: &Path, version: &NodeVersion) -> Result<(), NvmError> {
        let target = self.session.config().version_dir(version);
        let created = !target.exists();
        debug!("Moving {} to {}", staged.display(), target.display());

        let Err(error) = merge_into(staged, &target) else {
            return Ok(());
        };
        if !created {
            return Err(error);
        }
        warn!("Install of v{version} failed while moving into place, rolling back");
        match std::fs::remove_dir_all(&target) {
            Ok(()) => Err(error),
            Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => Err(error),
            Err(cleanup) => Err(NvmError::RollbackFailed {
                path: target.display().to_string(),
                details: cleanup.to_string(),
                cause: Box::new(error),
            }),
        }
    }
}
