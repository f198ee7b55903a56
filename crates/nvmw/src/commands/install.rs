//! `nvm install <version> [arch]`

use clap::Args;

use super::{report, strip_dashes, warn_insecure};
use crate::context::Context;
use crate::error::AppError;
use crate::runner::drive;

#[derive(Args)]
pub struct InstallArgs {
    /// Version to install: `20.9.0`, `20`, `latest`, `lts` or a release name.
    #[arg(allow_hyphen_values = true)]
    pub version: Option<String>,

    /// Architecture: 32, 64, arm64 or all. Defaults to the configured one.
    pub arch: Option<String>,

    /// Download without verifying TLS certificates.
    #[arg(long)]
    pub insecure: bool,
}

/// # Errors
/// Any failure reported by the install operation.
pub async fn execute(context: &Context, args: &InstallArgs) -> Result<(), AppError> {
    let token = strip_dashes(args.version.as_deref());
    let arch = args.arch.as_deref().unwrap_or_default();
    warn_insecure(args.insecure);

    let session = context.session(args.insecure)?;
    let outcome = drive("install", &session, |installer| async move {
        installer.install(&token, arch).await
    })
    .await?;
    report(&outcome);
    Ok(())
}
