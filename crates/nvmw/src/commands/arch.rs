//! `nvm arch [32|64]`

use clap::Args;
use nvmw_backend::Architecture;
use nvmw_core::arch::host_architecture;
use nvmw_platform::{HostArch, HostProcessor};

use crate::context::Context;
use crate::error::AppError;
use crate::settings::{self, Settings};

#[derive(Args)]
pub struct ArchArgs {
    /// New default architecture: 32 or 64.
    pub bits: Option<String>,
}

/// Show or persist the default architecture.
///
/// # Errors
/// Refuses a change the host cannot run, and fails when the settings file
/// cannot be written.
pub fn execute(context: &mut Context, args: &ArchArgs) -> Result<(), AppError> {
    let Some(bits) = args.bits.as_deref() else {
        let system = host_architecture(&context.host);
        let configured = configured(&context.settings, &context.host);
        println!("System Default: {}.", system.label());
        println!("Currently Configured: {}.", configured.label());
        return Ok(());
    };

    let arch = accept(bits, &context.host)?;
    context.settings.set(settings::ARCH, arch.token());
    context.save_settings()?;
    println!("Set to {}.", arch.label());
    Ok(())
}

fn configured(settings: &Settings, host: &HostProcessor) -> Architecture {
    settings
        .default_arch()
        .unwrap_or_else(|| host_architecture(host))
}

/// Validate a requested default against what the host can run.
fn accept(bits: &str, host: &HostProcessor) -> Result<Architecture, AppError> {
    match host.arch {
        HostArch::Arm64 => {
            return Err(AppError::Refused(
                "This computer runs an ARM processor; arm64 builds are always used.".to_string(),
            ));
        }
        HostArch::X86 => {
            return Err(AppError::Refused(
                "This computer only supports 32-bit processing.".to_string(),
            ));
        }
        HostArch::X64 => {}
    }

    match Architecture::from_token(bits) {
        Some(arch @ (Architecture::X86 | Architecture::X64)) => Ok(arch),
        _ => Err(AppError::Refused(format!(
            "\"{}\" is not a valid architecture. Use 32 or 64.",
            bits.trim()
        ))),
    }
}
