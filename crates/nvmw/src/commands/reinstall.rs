use clap::Args;

use super::{report, strip_dashes, warn_insecure};
use crate::context::Context;
use crate::error::AppError;
use crate::runner::drive;

#[derive(Args)]
pub struct ReinstallArgs {
    /// Installed version to download again.
    #[arg(allow_hyphen_values = true)]
    pub version: Option<String>,

    /// Architecture: 32, 64, arm64 or all.
    pub arch: Option<String>,

    /// Download without verifying TLS certificates.
    #[arg(long)]
    pub insecure: bool,
}

/// Uninstall, then install the same version again.
///
/// # Errors
/// Any failure of either step.
pub async fn execute(context: &Context, args: &ReinstallArgs) -> Result<(), AppError> {
    let token = strip_dashes(args.version.as_deref());
    let arch = args.arch.as_deref().unwrap_or_default();
    warn_insecure(args.insecure);

    let session = context.session(args.insecure)?;
    let outcome = drive("reinstall", &session, |installer| async move {
        installer.reinstall(&token, arch).await
    })
    .await?;
    report(&outcome);
    Ok(())
}
