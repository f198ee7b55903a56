use thiserror::Error;

use crate::types::{Architecture, VersionParseError};

pub const HELP_URL: &str = "https://bit.ly/nvm4w-help";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NvmError {
    #[error("\"{token}\" is not a valid CPU architecture. Must be 32, 64, or arm64.")]
    InvalidArchitecture { token: String },

    #[error("A version argument is required but missing.")]
    MissingVersion,

    #[error(
        "\"{token}\" is not a valid version.\nPlease use a valid semantic version number, \"lts\", or \"latest\"."
    )]
    InvalidVersion { token: String },

    #[error(transparent)]
    ParseError(#[from] VersionParseError),

    #[error(
        "\"{token}\" is not a valid version or known alias.\n\nAvailable aliases: latest, node (latest), lts\nNamed releases (boron, dubnium, etc) are also supported."
    )]
    UnknownAlias { token: String },

    #[error(
        "\"{version}\" is not a valid version number (or partial version number).\n\nIf you are trying to install a version that was just announced within the last few minutes, it may not be available for download yet (try again in 15 minutes)."
    )]
    UnknownReleaseLine { version: String },

    #[error(
        "Version {version} is not available.\n\nThe complete list of available versions can be found at {index_url}"
    )]
    VersionNotAvailable { version: String, index_url: String },

    #[error("No versions of node.js found. Try installing the latest by typing nvm install latest.")]
    NoneInstalled,

    #[error("No node.js version is active. Type \"nvm use <version>\" to activate one.")]
    NoActiveVersion,

    #[error("Node.js v{version} is not yet released or is not available for download yet.")]
    Unreleased { version: String },

    #[error("Node.js v{version} is not available as a {} build.", .arch.label())]
    ArchUnavailable {
        version: String,
        arch: Architecture,
    },

    #[error("{}", not_installed_message(.version, .arch, .alternative))]
    NotInstalled {
        version: String,
        arch: Architecture,
        alternative: Option<Architecture>,
    },

    #[error("node v{version} is not installed. Type \"nvm list\" to see what is installed.")]
    VersionNotInstalled { version: String },

    #[error("Network error during {operation} ({stage}): {details}")]
    NetworkError {
        operation: &'static str,
        stage: NetworkStage,
        details: String,
    },

    #[error(
        "Could not retrieve the release catalog from {url}: {details}\nThis usually indicates a problem with the Node.js web server. Please try again in a few minutes."
    )]
    CatalogUnavailable { url: String, details: String },

    #[error("Request to {url} failed with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Too many redirects while requesting {url}")]
    TooManyRedirects { url: String },

    #[error("Checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to extract {archive}: {details}")]
    Archive { archive: String, details: String },

    #[error("Could not install npm v{npm_version}: {details}")]
    PackageManager { npm_version: String, details: String },

    #[error("IO error during {context} ({kind}): {message}")]
    IoError {
        context: &'static str,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("{details}\nSee {}", HELP_URL)]
    AccessDenied { details: String },

    #[error("Elevated command failed: {details}")]
    ElevationFailed { details: String },

    #[error("{cause}\nRollback of {path} also failed: {details}. Please remove it manually.")]
    RollbackFailed {
        path: String,
        details: String,
        cause: Box<NvmError>,
    },

    #[error(
        "NVM_SYMLINK is set to a physical file/directory at {path}\nPlease remove the location and try again, or select a different location for NVM_SYMLINK."
    )]
    PointerNotSymlink { path: String },

    #[error("Internal error: an operation cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Operation cancelled by user")]
    Cancelled,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response parse")]
    ResponseParse,
}

/// Coarse classification callers use to pick hints and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Resolution,
    Transfer,
    Filesystem,
    Consistency,
    Cancelled,
}

fn not_installed_message(
    version: &str,
    arch: &Architecture,
    alternative: &Option<Architecture>,
) -> String {
    let hint = match alternative {
        Some(other) => format!(
            "Did you mean node v{version} ({})?\nIf so, type \"nvm use {version} {}\" to use it.",
            other.label(),
            other.token()
        ),
        None => "Version not installed. Run \"nvm ls\" to see available versions.".to_string(),
    };
    format!("node v{version} ({}) is not installed.\n{hint}", arch.label())
}

impl NvmError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArchitecture { .. }
            | Self::MissingVersion
            | Self::InvalidVersion { .. }
            | Self::ParseError(_) => ErrorCategory::Input,
            Self::UnknownAlias { .. }
            | Self::UnknownReleaseLine { .. }
            | Self::VersionNotAvailable { .. }
            | Self::NoneInstalled
            | Self::NoActiveVersion
            | Self::Unreleased { .. }
            | Self::ArchUnavailable { .. }
            | Self::NotInstalled { .. }
            | Self::VersionNotInstalled { .. } => ErrorCategory::Resolution,
            Self::NetworkError { .. }
            | Self::CatalogUnavailable { .. }
            | Self::HttpStatus { .. }
            | Self::TooManyRedirects { .. }
            | Self::ChecksumMismatch { .. }
            | Self::PackageManager { .. } => ErrorCategory::Transfer,
            Self::Archive { .. }
            | Self::IoError { .. }
            | Self::AccessDenied { .. }
            | Self::ElevationFailed { .. } => ErrorCategory::Filesystem,
            Self::RollbackFailed { cause, .. } => cause.category(),
            Self::PointerNotSymlink { .. } | Self::InvalidTransition { .. } => {
                ErrorCategory::Consistency
            }
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether usage text should follow the error message.
    #[must_use]
    pub fn show_help(&self) -> bool {
        self.category() == ErrorCategory::Input || matches!(self, Self::UnknownAlias { .. })
    }

    pub fn network_request(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn network_request_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_request(operation, error.to_string())
    }

    pub fn network_parse(operation: &'static str, details: impl Into<String>) -> Self {
        Self::NetworkError {
            operation,
            stage: NetworkStage::ResponseParse,
            details: details.into(),
        }
    }

    pub fn network_parse_from<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::network_parse(operation, error.to_string())
    }

    #[must_use]
    pub fn io(context: &'static str, error: &std::io::Error) -> Self {
        Self::IoError {
            context,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    #[must_use]
    pub fn io_with_path(context: &'static str, path: &std::path::Path, error: &std::io::Error) -> Self {
        Self::IoError {
            context,
            kind: error.kind(),
            message: format!("{}: {error}", path.display()),
        }
    }

    pub fn archive(archive: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Archive {
            archive: archive.into(),
            details: details.into(),
        }
    }
}

impl From<std::io::Error> for NvmError {
    fn from(err: std::io::Error) -> Self {
        NvmError::io("filesystem operation", &err)
    }
}
