//! `nvm root`, `nvm proxy`, `nvm node_mirror` and `nvm npm_mirror`: show or
//! persist one settings value each.

use std::path::PathBuf;

use clap::Args;
use nvmw_core::{DEFAULT_NODE_MIRROR, DEFAULT_NPM_MIRROR, normalize_mirror, normalize_proxy};

use crate::context::Context;
use crate::error::AppError;
use crate::settings;

#[derive(Args)]
pub struct RootArgs {
    /// Directory that holds installed versions.
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValueArgs {
    /// New value, or `none` to clear it.
    pub value: Option<String>,
}

/// # Errors
/// Fails when the root cannot be created or the settings file cannot be
/// written.
pub fn root(context: &mut Context, args: &RootArgs) -> Result<(), AppError> {
    let Some(path) = &args.path else {
        let root = context.settings.root(&context.paths.home);
        println!("\nCurrent Root: {}", root.display());
        return Ok(());
    };

    let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
    std::fs::create_dir_all(&path)
        .map_err(|error| AppError::Refused(format!("Could not create {}: {error}", path.display())))?;
    context
        .settings
        .set(settings::ROOT, path.display().to_string());
    context.save_settings()?;
    println!("\nRoot has been set to {}", path.display());
    Ok(())
}

/// # Errors
/// Fails when the settings file cannot be written.
pub fn proxy(context: &mut Context, args: &ValueArgs) -> Result<(), AppError> {
    let current = context.settings.get(settings::PROXY).and_then(normalize_proxy);
    update(context, args, settings::PROXY, "proxy", current.as_deref(), normalize_proxy)
}

/// # Errors
/// Fails when the settings file cannot be written.
pub fn node_mirror(context: &mut Context, args: &ValueArgs) -> Result<(), AppError> {
    let current = context
        .settings
        .get(settings::NODE_MIRROR)
        .and_then(normalize_mirror)
        .unwrap_or_else(|| DEFAULT_NODE_MIRROR.to_string());
    update(
        context,
        args,
        settings::NODE_MIRROR,
        "node mirror",
        Some(current.as_str()),
        normalize_mirror,
    )
}

/// # Errors
/// Fails when the settings file cannot be written.
pub fn npm_mirror(context: &mut Context, args: &ValueArgs) -> Result<(), AppError> {
    let current = context
        .settings
        .get(settings::NPM_MIRROR)
        .and_then(normalize_mirror)
        .unwrap_or_else(|| DEFAULT_NPM_MIRROR.to_string());
    update(
        context,
        args,
        settings::NPM_MIRROR,
        "npm mirror",
        Some(current.as_str()),
        normalize_mirror,
    )
}

fn update(
    context: &mut Context,
    args: &ValueArgs,
    key: &str,
    label: &str,
    current: Option<&str>,
    normalize: fn(&str) -> Option<String>,
) -> Result<(), AppError> {
    let Some(value) = args.value.as_deref() else {
        println!("Current {label}: {}", current.unwrap_or("none"));
        return Ok(());
    };

    let stored = normalize(value);
    context.settings.set(key, stored.clone().unwrap_or_default());
    context.save_settings()?;
    match stored {
        Some(stored) => println!("{label} set to {stored}"),
        None => println!("{label} cleared"),
    }
    Ok(())
}
