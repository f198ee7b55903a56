//! `nvm use <version> [arch]`

use clap::Args;

use super::{report, strip_dashes};
use crate::context::Context;
use crate::error::AppError;
use crate::runner::drive;

#[derive(Args)]
pub struct UseArgs {
    /// Installed version to activate: `20.9.0`, `20`, `latest`, `lts` or `newest`.
    #[arg(allow_hyphen_values = true)]
    pub version: Option<String>,

    /// Architecture: 32, 64 or arm64.
    pub arch: Option<String>,
}

/// # Errors
/// Fails when the version is not installed for the architecture or the
/// activation symlink cannot be changed.
pub async fn execute(context: &Context, args: &UseArgs) -> Result<(), AppError> {
    let token = strip_dashes(args.version.as_deref());
    let arch = args.arch.as_deref().unwrap_or_default();
    let session = context.session(false)?;
    let outcome = drive("use", &session, |installer| async move {
        installer.use_version(&token, arch).await
    })
    .await?;
    report(&outcome);
    Ok(())
}
