//! Turning loose version requests into a concrete (version, architecture) pair.

use log::debug;
use nvmw_backend::{ArchRequest, Architecture, NodeVersion, NvmError, PartialVersion};
use semver::Prerelease;

use crate::arch::validate;
use crate::config::Config;
use crate::inventory::{newest_installed, newest_installed_matching};
use crate::pointer::active_version;
use crate::session::Session;

const ARCH_TOKENS: [&str; 4] = ["32", "64", "arm64", "all"];

/// Outcome of resolving a version request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub version: NodeVersion,
    pub arch: ArchRequest,
}

/// Validate the architecture argument. An empty token means the configured
/// default, then the host.
///
/// # Errors
/// Returns [`NvmError::InvalidArchitecture`] for anything but `32`, `64`,
/// `arm64` or `all`.
pub fn parse_arch_token(token: &str, config: &Config) -> Result<ArchRequest, NvmError> {
    let token = token.trim().to_ascii_lowercase();
    if token.is_empty() {
        let fallback = config.default_arch.map_or("", Architecture::token);
        return Ok(ArchRequest::Single(validate(fallback, &config.host)));
    }
    if !ARCH_TOKENS.contains(&token.as_str()) {
        return Err(NvmError::InvalidArchitecture { token });
    }
    if token == "all" {
        return Ok(ArchRequest::All);
    }
    Ok(ArchRequest::Single(validate(&token, &config.host)))
}

/// Extract the version from a `SHASUMS256.txt` listing, using the first
/// `node-v<version>-...` file name.
#[must_use]
pub fn version_from_pointer(text: &str) -> Option<NodeVersion> {
    let start = text.find("node-v")? + "node-v".len();
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}

/// Reduce `major.minor.patch<junk>` to a clean version. A valid
/// pre-release suffix survives; anything else after the numbers is dropped.
///
/// # Errors
/// Returns [`NvmError::InvalidVersion`] when a component has no digits.
pub fn clean_version(token: &str) -> Result<NodeVersion, NvmError> {
    let invalid = || NvmError::InvalidVersion {
        token: token.to_string(),
    };
    let text = token.trim().trim_start_matches('v');
    let without_build = text.split_once('+').map_or(text, |(core, _)| core);
    let (core, pre) = match without_build.split_once('-') {
        Some((core, pre)) => (core, Prerelease::new(pre).ok()),
        None => (without_build, None),
    };

    let mut numbers = core.split('.').map(|part| {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok()
    });
    let (Some(Some(major)), Some(Some(minor)), Some(Some(patch))) =
        (numbers.next(), numbers.next(), numbers.next())
    else {
        return Err(invalid());
    };

    let mut version = NodeVersion::new(major, minor, patch);
    if let Some(pre) = pre {
        version.pre = pre;
    }
    Ok(version)
}

fn core_components(text: &str) -> usize {
    text.split(['-', '+']).next().unwrap_or(text).split('.').count()
}

impl Session {
    /// Resolve `token` and `arch_token` into an installable or activatable pair.
    ///
    /// With `local_only`, partial versions expand against installed versions
    /// without touching the network.
    ///
    /// # Errors
    /// Input errors for malformed tokens, resolution errors when nothing
    /// matches, and transfer errors when a remote lookup fails.
    pub async fn resolve(
        &self,
        token: &str,
        arch_token: &str,
        local_only: bool,
    ) -> Result<Resolved, NvmError> {
        let config = self.config();
        let mut arch = parse_arch_token(arch_token, config)?;

        let token = token.trim();
        if token.is_empty() {
            return Err(NvmError::MissingVersion);
        }
        let lower = token.to_ascii_lowercase();

        let version = match lower.as_str() {
            "latest" | "current" | "node" => {
                let catalog = self.catalog().await?;
                catalog
                    .newest_current()
                    .cloned()
                    .ok_or(NvmError::UnknownAlias { token: lower.clone() })?
            }
            "lts" => {
                let catalog = self.catalog().await?;
                catalog
                    .newest_lts()
                    .cloned()
                    .ok_or(NvmError::UnknownAlias { token: lower.clone() })?
            }
            "newest" => newest_installed(&config.root)?.ok_or(NvmError::NoneInstalled)?,
            "32" | "64" | "arm64" => {
                arch = ArchRequest::Single(validate(&lower, &config.host));
                active_version(&config.symlink).ok_or(NvmError::NoActiveVersion)?
            }
            _ => self.resolve_number(&lower, local_only).await?,
        };

        debug!("Resolved \"{token}\" to v{version} ({arch})");
        Ok(Resolved { version, arch })
    }

    async fn resolve_number(&self, token: &str, local_only: bool) -> Result<NodeVersion, NvmError> {
        let starts_numeric = token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == 'v');

        let text = if starts_numeric {
            token.to_string()
        } else {
            self.named_release(token).await?.to_string()
        };
        let text = text.trim_start_matches(|c: char| !c.is_ascii_digit());
        if text.is_empty() {
            return Err(NvmError::InvalidVersion {
                token: token.to_string(),
            });
        }

        if core_components(text) < 3 {
            let line: PartialVersion = text.parse().map_err(|_| NvmError::InvalidVersion {
                token: token.to_string(),
            })?;
            return self.expand_partial(line, local_only).await;
        }
        clean_version(text)
    }

    /// Latest release of a named line such as `hydrogen`.
    async fn named_release(&self, name: &str) -> Result<NodeVersion, NvmError> {
        let url = self
            .config()
            .mirrors
            .node_url(&format!("latest-{name}/SHASUMS256.txt"));
        let unknown = || NvmError::UnknownAlias {
            token: name.to_string(),
        };
        let text = match self.transfer().get_text(&url).await {
            Ok(text) => text,
            Err(NvmError::Cancelled) => return Err(NvmError::Cancelled),
            Err(error) => {
                debug!("Named release lookup failed: {error}");
                return Err(unknown());
            }
        };
        version_from_pointer(&text).ok_or_else(unknown)
    }

    async fn expand_partial(&self, line: PartialVersion, local_only: bool) -> Result<NodeVersion, NvmError> {
        if local_only
            && let Some(version) = newest_installed_matching(&self.config().root, line)?
        {
            return Ok(version);
        }

        let unknown = || NvmError::UnknownReleaseLine {
            version: line.to_string(),
        };
        if line.minor.is_some() {
            return self.catalog().await?.latest_patch(line).ok_or_else(unknown);
        }

        let url = self
            .config()
            .mirrors
            .node_url(&format!("latest-v{}.x/SHASUMS256.txt", line.major));
        match self.transfer().get_text(&url).await {
            Ok(text) => version_from_pointer(&text).ok_or_else(unknown),
            Err(NvmError::Cancelled) => Err(NvmError::Cancelled),
            Err(NvmError::HttpStatus { status: 404, .. }) => Err(unknown()),
            Err(error) => Err(error),
        }
    }

    /// Newest published release according to `latest/SHASUMS256.txt`.
    ///
    /// # Errors
    /// Returns the transfer error, or [`NvmError::CatalogUnavailable`] when
    /// the listing names no version.
    pub async fn latest_released(&self) -> Result<NodeVersion, NvmError> {
        let url = self.config().mirrors.node_url("latest/SHASUMS256.txt");
        let text = self.transfer().get_text(&url).await?;
        version_from_pointer(&text).ok_or(NvmError::CatalogUnavailable {
            url,
            details: "no node version listed".to_string(),
        })
    }
}
