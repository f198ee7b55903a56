use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use semver::{BuildMetadata, Prerelease};

/// A fully qualified Node.js release number.
///
/// Equality and ordering cover the pre-release and build parts too, so
/// `18.0.0-rc.1 < 18.0.0`. Build metadata only breaks ties last: two
/// versions that differ in build alone are unequal under the derived `Eq`,
/// and `Ord` must agree with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Prerelease,
    pub build: BuildMetadata,
}

impl NodeVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    /// Directory name of this version under the installation root.
    #[must_use]
    pub fn dir_name(&self) -> String {
        format!("v{self}")
    }
}

impl Ord for NodeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| self.pre.cmp(&other.pre))
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for NodeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
    Prerelease,
    Build,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
            Self::Prerelease => write!(f, "pre-release"),
            Self::Build => write!(f, "build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
}

fn numeric_component(
    value: Option<&str>,
    component: VersionComponent,
    input: &str,
) -> Result<u64, VersionParseError> {
    let value = value.ok_or_else(|| VersionParseError::InvalidFormat {
        input: input.to_string(),
    })?;
    value
        .parse()
        .map_err(|_| VersionParseError::InvalidComponent {
            component,
            value: value.to_string(),
        })
}

impl FromStr for NodeVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        let (rest, build) = match s.split_once('+') {
            Some((rest, build)) => (
                rest,
                BuildMetadata::new(build).map_err(|_| VersionParseError::InvalidComponent {
                    component: VersionComponent::Build,
                    value: build.to_string(),
                })?,
            ),
            None => (s, BuildMetadata::EMPTY),
        };
        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => (
                core,
                Prerelease::new(pre).map_err(|_| VersionParseError::InvalidComponent {
                    component: VersionComponent::Prerelease,
                    value: pre.to_string(),
                })?,
            ),
            None => (rest, Prerelease::EMPTY),
        };

        let mut parts = core.split('.');
        let major = numeric_component(parts.next(), VersionComponent::Major, s)?;
        let minor = numeric_component(parts.next(), VersionComponent::Minor, s)?;
        let patch = numeric_component(parts.next(), VersionComponent::Patch, s)?;
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: s.to_string(),
            });
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }
}

/// A request for "the newest release of a line", such as `18` or `18.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
}

impl PartialVersion {
    #[must_use]
    pub fn matches(&self, version: &NodeVersion) -> bool {
        version.major == self.major && self.minor.is_none_or(|minor| version.minor == minor)
    }
}

impl FromStr for PartialVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);

        let mut parts = s.split('.');
        let major = numeric_component(parts.next(), VersionComponent::Major, s)?;
        let minor = parts
            .next()
            .map(|minor| numeric_component(Some(minor), VersionComponent::Minor, s))
            .transpose()?;
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: s.to_string(),
            });
        }

        Ok(Self { major, minor })
    }
}

impl fmt::Display for PartialVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{minor}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

/// CPU architecture of a single Node.js build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    X86,
    X64,
    Arm64,
}

impl Architecture {
    pub const ALL: [Architecture; 3] = [Self::X86, Self::X64, Self::Arm64];

    /// Parse one of the exact CLI tokens `32`, `64` or `arm64`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "32" => Some(Self::X86),
            "64" => Some(Self::X64),
            "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }

    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::X86 => "32",
            Self::X64 => "64",
            Self::Arm64 => "arm64",
        }
    }

    /// Name used by the Node.js distribution (`win-x64`, `node-v20.0.0-win-arm64.zip`).
    #[must_use]
    pub fn dist_name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }

    /// File name of the inactive, architecture-tagged executable.
    #[must_use]
    pub fn tagged_executable(self) -> &'static str {
        match self {
            Self::X86 => "node32.exe",
            Self::X64 => "node64.exe",
            Self::Arm64 => "nodearm64.exe",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::X86 => "32-bit",
            Self::X64 => "64-bit",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Architecture as requested on the command line, where `all` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchRequest {
    Single(Architecture),
    All,
}

impl ArchRequest {
    #[must_use]
    pub fn single(self) -> Option<Architecture> {
        match self {
            Self::Single(arch) => Some(arch),
            Self::All => None,
        }
    }

    #[must_use]
    pub fn architectures(self) -> Vec<Architecture> {
        match self {
            Self::Single(arch) => vec![arch],
            Self::All => Architecture::ALL.to_vec(),
        }
    }
}

impl From<Architecture> for ArchRequest {
    fn from(arch: Architecture) -> Self {
        Self::Single(arch)
    }
}

impl fmt::Display for ArchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(arch) => write!(f, "{arch}"),
            Self::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseChannel {
    Lts,
    Current,
    Stable,
    Unstable,
}

/// One release listed in the remote `index.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub version: NodeVersion,
    pub date: Option<NaiveDate>,
    pub npm: Option<String>,
    pub is_lts: bool,
    pub lts_codename: Option<String>,
    pub security: bool,
}

impl CatalogEntry {
    /// Bucket for this release; LTS wins over every other rule.
    #[must_use]
    pub fn channel(&self) -> ReleaseChannel {
        if self.is_lts {
            ReleaseChannel::Lts
        } else if self.version.major >= 1 {
            ReleaseChannel::Current
        } else if self.version.minor % 2 == 0 {
            ReleaseChannel::Stable
        } else {
            ReleaseChannel::Unstable
        }
    }
}
