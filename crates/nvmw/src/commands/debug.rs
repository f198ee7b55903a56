//! `nvm debug`: print what the tool sees of its environment.

use std::path::Path;

use log::debug;
use nvmw_core::pointer::{self, PointerState};
use nvmw_core::{Layout, LayoutKind, inventory};

use crate::context::{Context, SYMLINK_ENV};
use crate::error::AppError;

/// # Errors
/// Fails only when the HTTP client cannot be configured; every individual
/// check reports its problem inline.
pub async fn execute(context: &Context) -> Result<(), AppError> {
    let session = context.session(false)?;
    let config = session.config();

    println!("\nRunning NVM for Windows with {} host processor", context.host.reported);
    println!("NVM_HOME: {}", env_or_unset("NVM_HOME"));
    println!("{SYMLINK_ENV}: {}", env_or_unset(SYMLINK_ENV));
    println!("Settings: {}", context.settings_path.display());

    println!("\nRoot: {}", describe_dir(&config.root));
    println!("Symlink: {}", describe_pointer(&config.symlink, &pointer::inspect(&config.symlink)));

    match which::which("node") {
        Ok(path) => println!("node on PATH: {}", path.display()),
        Err(error) => println!("node on PATH: not found ({error})"),
    }

    let index_url = config.mirrors.index_url();
    match session.transfer().head(&index_url).await {
        Ok(true) => println!("Release index: reachable ({index_url})"),
        Ok(false) => println!("Release index: not found ({index_url})"),
        Err(error) => println!("Release index: unreachable ({error})"),
    }

    match inventory::list_installed(&config.root) {
        Ok(installed) => {
            let broken: Vec<String> = installed
                .iter()
                .filter(|version| {
                    Layout::detect(&config.version_dir(version)).kind == LayoutKind::Empty
                })
                .map(ToString::to_string)
                .collect();
            println!("\nInstalled versions: {}", installed.len());
            if !broken.is_empty() {
                println!(
                    "No node executable found in: {}. Reinstall or uninstall these versions.",
                    broken.join(", ")
                );
            }
        }
        Err(error) => println!("\nInstalled versions: unreadable ({error})"),
    }

    debug!("Diagnostics complete");
    Ok(())
}

fn env_or_unset(name: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "(not set)".to_string())
}

fn describe_dir(path: &Path) -> String {
    if path.is_dir() {
        format!("{} (exists)", path.display())
    } else {
        format!("{} (missing)", path.display())
    }
}

fn describe_pointer(path: &Path, state: &PointerState) -> String {
    match state {
        PointerState::Missing => format!("{} (not created; run \"nvm use\")", path.display()),
        PointerState::Link(target) => format!("{} -> {}", path.display(), target.display()),
        PointerState::Physical => format!(
            "{} is a physical directory, not a symlink. Remove it so nvm can manage it.",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use nvmw_core::pointer::PointerState;

    use super::{describe_dir, describe_pointer};

    #[test]
    fn pointer_states_are_described() {
        let link = Path::new("nodejs");
        assert!(describe_pointer(link, &PointerState::Missing).contains("not created"));
        assert_eq!(
            describe_pointer(link, &PointerState::Link(PathBuf::from("v20.9.0"))),
            "nodejs -> v20.9.0"
        );
        assert!(describe_pointer(link, &PointerState::Physical).contains("not a symlink"));
    }

    #[test]
    fn root_presence() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        assert!(describe_dir(temp.path()).ends_with("(exists)"));
        assert!(describe_dir(&temp.path().join("nvm")).ends_with("(missing)"));
    }
}
