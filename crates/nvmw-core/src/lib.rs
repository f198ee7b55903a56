//! Engine of the `nvm` command.
//!
//! This crate holds everything between the command line and the disk:
//! - Release catalog fetching and version resolution.
//! - Inventory of installed versions and their executable layouts.
//! - Staged installs with checksum verification, npm setup and rollback.
//! - The activation symlink and architecture swapping.
//!
//! Operations run on a [`Session`] and report through a [`Reporter`].

mod activate;
pub mod arch;
mod archive;
mod catalog;
mod checksum;
mod config;
mod install;
pub mod inventory;
mod layout;
pub mod pointer;
mod remove;
mod resolve;
mod retry;
mod session;
mod state;
mod status;
#[cfg(test)]
mod testing;
mod transfer;

/// Pointer link retry bound.
pub use activate::MAX_LINK_ATTEMPTS;
/// Parsed `index.json` and its fetch helper.
pub use catalog::{Catalog, fetch_catalog};
/// Settings resolved once per invocation.
pub use config::{
    Config, DEFAULT_NODE_MIRROR, DEFAULT_NPM_MIRROR, DEFAULT_SYMLINK, Mirrors, normalize_mirror,
    normalize_proxy,
};
/// Install, use and uninstall operations.
pub use install::Installer;
/// On-disk arrangement of a version directory.
pub use layout::{GENERIC_EXECUTABLE, Layout, LayoutKind};
/// Version request resolution.
pub use resolve::{Resolved, clean_version, parse_arch_token, version_from_pointer};
pub use session::Session;
pub use state::{InstallState, Transitions};
/// Status channel shared with the front end.
pub use status::{Outcome, Reporter, Status};
/// HTTP access with bounded redirects.
pub use transfer::{HttpTransfer, MAX_REDIRECTS, Transfer};
