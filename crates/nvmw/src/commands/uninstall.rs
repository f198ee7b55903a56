use clap::Args;

use super::{report, strip_dashes};
use crate::context::Context;
use crate::error::AppError;
use crate::runner::drive;

#[derive(Args)]
pub struct UninstallArgs {
    /// Installed version to remove.
    #[arg(allow_hyphen_values = true)]
    pub version: Option<String>,
}

/// # Errors
/// Fails when the version is not installed or cannot be removed.
pub async fn execute(context: &Context, args: &UninstallArgs) -> Result<(), AppError> {
    let token = strip_dashes(args.version.as_deref());
    let session = context.session(false)?;
    let outcome = drive("uninstall", &session, |installer| async move {
        installer.uninstall(&token).await
    })
    .await?;
    report(&outcome);
    Ok(())
}
