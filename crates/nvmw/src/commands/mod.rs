//! Subcommand implementations for `nvm`.
//!
//! - [`install`], [`reinstall`], [`uninstall`]: manage installed versions
//! - [`use_version`], [`switch`]: the activation symlink
//! - [`list`], [`current`]: inspect what is installed and active
//! - [`arch`], [`config`]: persisted settings
//! - [`debug`]: environment diagnostics

pub mod arch;
pub mod config;
pub mod current;
pub mod debug;
pub mod install;
pub mod list;
pub mod reinstall;
pub mod switch;
pub mod uninstall;
pub mod use_version;

use nvmw_core::Outcome;

const DASH_NOTICE: &str = "\"--\" prefixes are unnecessary in NVM for Windows!";
const INSECURE_WARNING: &str =
    "WARNING: TLS certificates will not be verified for this download. Use with caution.";

/// Reduce `--lts` style tokens to `lts`, telling the user once.
fn strip_dashes(token: Option<&str>) -> String {
    let token = token.unwrap_or_default().trim();
    match token.strip_prefix("--") {
        Some(rest) => {
            println!("{DASH_NOTICE}");
            rest.to_string()
        }
        None => token.to_string(),
    }
}

fn warn_insecure(insecure: bool) {
    if insecure {
        eprintln!("{INSECURE_WARNING}");
    }
}

/// Final line printed for a successful operation.
fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Installed { version, .. } => format!(
            "Installation complete. If you want to use this version, type\n\nnvm use {version}"
        ),
        Outcome::AlreadyInstalled { version, .. } => {
            format!("Version {version} is already installed.")
        }
        Outcome::Activated { version, arch } | Outcome::AlreadyActive { version, arch } => {
            format!("Now using node v{version} ({})", arch.label())
        }
        Outcome::Uninstalled { version } => format!("Node.js v{version} has been uninstalled."),
        Outcome::Disabled => "nvm disabled".to_string(),
    }
}

fn report(outcome: &Outcome) {
    println!("{}", describe(outcome));
}

#[cfg(test)]
mod tests {
    use nvmw_backend::{ArchRequest, Architecture, NodeVersion};
    use nvmw_core::Outcome;

    use super::{describe, strip_dashes};

    #[test]
    fn dashes_are_stripped() {
        assert_eq!(strip_dashes(Some("--lts")), "lts");
        assert_eq!(strip_dashes(Some(" 20.9.0 ")), "20.9.0");
        assert_eq!(strip_dashes(None), "");
    }

    #[test]
    fn outcome_messages() {
        let version = NodeVersion::new(20, 9, 0);
        assert_eq!(
            describe(&Outcome::Activated {
                version: version.clone(),
                arch: Architecture::X64,
            }),
            "Now using node v20.9.0 (64-bit)"
        );
        assert_eq!(
            describe(&Outcome::AlreadyInstalled {
                version: version.clone(),
                arch: ArchRequest::All,
            }),
            "Version 20.9.0 is already installed."
        );
        assert!(
            describe(&Outcome::Installed {
                version,
                architectures: vec![Architecture::X64],
            })
            .ends_with("nvm use 20.9.0")
        );
    }
}
