//! `nvm on` and `nvm off`

use super::report;
use crate::context::Context;
use crate::error::AppError;
use crate::runner::drive;

/// Activate the newest installed version.
///
/// # Errors
/// Fails when nothing is installed or the symlink cannot be created.
pub async fn on(context: &Context) -> Result<(), AppError> {
    let session = context.session(false)?;
    let outcome = drive("on", &session, |installer| async move { installer.enable().await }).await?;
    println!("nvm enabled");
    report(&outcome);
    Ok(())
}

/// Remove the activation symlink.
///
/// # Errors
/// Fails when the pointer is a real directory or cannot be removed.
pub async fn off(context: &Context) -> Result<(), AppError> {
    let session = context.session(false)?;
    let outcome = drive("off", &session, |installer| async move { installer.disable().await }).await?;
    report(&outcome);
    Ok(())
}
