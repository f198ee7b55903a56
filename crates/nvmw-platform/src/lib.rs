mod elevation;
mod host;
mod paths;

pub use elevation::{CmdElevator, ElevationError, Elevator};
pub use host::{HostArch, HostProcessor};
pub use paths::{AppPaths, AppPathsError};
