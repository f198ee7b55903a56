mod error;
mod types;

pub use error::{ErrorCategory, HELP_URL, NetworkStage, NvmError};
pub use types::{
    ArchRequest, Architecture, CatalogEntry, NodeVersion, PartialVersion, ReleaseChannel,
    VersionComponent, VersionParseError,
};
