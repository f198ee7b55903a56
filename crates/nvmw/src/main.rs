//! # nvm
//!
//! Installs several Node.js versions side by side and switches between them
//! by repointing one directory symlink (`NVM_SYMLINK`) that sits on `PATH`.
//!
//! ```bash
//! nvm install lts
//! nvm use 20.9.0 64
//! nvm list available
//! ```
//!
//! Exit codes: 0 on success, 1 on failure, 130 when interrupted.

mod commands;
mod context;
mod error;
mod logging;
mod runner;
mod settings;

use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use commands::{arch, config, current, debug, install, list, reinstall, switch, uninstall, use_version};
use nvmw_platform::AppPaths;

use context::Context;
use error::AppError;

/// Node.js version manager for Windows.
#[derive(Parser)]
#[command(
    name = "nvm",
    version,
    about = "Manage multiple Node.js installations on Windows",
    after_help = "\
ENVIRONMENT VARIABLES:
    NVM_HOME        Directory holding settings.txt and, by default, installed versions
    NVM_SYMLINK     Activation symlink (default: C:\\Program Files\\nodejs)
    NVM_DEBUG       Set to 1 for verbose logging"
)]
struct Cli {
    /// Log debug details to the terminal and log file.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install a Node.js version.
    ///
    /// The version may be exact (`20.9.0`), partial (`20`, `20.9`), `latest`,
    /// `lts` or an LTS release name. The architecture defaults to the
    /// configured one; `all` installs every build that exists.
    Install(install::InstallArgs),

    /// Switch to an installed version.
    Use(use_version::UseArgs),

    /// Remove an installed version.
    Uninstall(uninstall::UninstallArgs),

    /// Remove and install a version again.
    Reinstall(reinstall::ReinstallArgs),

    /// List installed versions, or the versions available for download.
    #[command(visible_alias = "ls")]
    List(list::ListArgs),

    /// Enable version management (activate the newest installed version).
    On,

    /// Disable version management (remove the symlink).
    Off,

    /// Show the active version.
    Current,

    /// Show or set the default architecture.
    Arch(arch::ArchArgs),

    /// Show or set the directory holding installed versions.
    Root(config::RootArgs),

    /// Show or set the download proxy (`none` clears it).
    Proxy(config::ValueArgs),

    /// Show or set the Node.js download mirror (`none` restores the default).
    #[command(name = "node_mirror")]
    NodeMirror(config::ValueArgs),

    /// Show or set the npm download mirror (`none` restores the default).
    #[command(name = "npm_mirror")]
    NpmMirror(config::ValueArgs),

    /// Diagnose the local setup.
    Debug,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            if error.show_help() {
                eprintln!();
                let _ = Cli::command().print_help();
            }
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let paths = AppPaths::new()?;
    let verbose = cli.verbose || logging::debug_from_env(std::env::var("NVM_DEBUG").ok().as_deref());
    logging::init_logging(&paths, verbose);
    log::debug!("nvm {} starting", env!("CARGO_PKG_VERSION"));

    let mut context = Context::load(paths)?;
    match cli.command {
        Commands::Install(args) => install::execute(&context, &args).await,
        Commands::Use(args) => use_version::execute(&context, &args).await,
        Commands::Uninstall(args) => uninstall::execute(&context, &args).await,
        Commands::Reinstall(args) => reinstall::execute(&context, &args).await,
        Commands::List(args) => list::execute(&context, &args).await,
        Commands::On => switch::on(&context).await,
        Commands::Off => switch::off(&context).await,
        Commands::Current => {
            current::execute(&context);
            Ok(())
        }
        Commands::Arch(args) => arch::execute(&mut context, &args),
        Commands::Root(args) => config::root(&mut context, &args),
        Commands::Proxy(args) => config::proxy(&mut context, &args),
        Commands::NodeMirror(args) => config::node_mirror(&mut context, &args),
        Commands::NpmMirror(args) => config::npm_mirror(&mut context, &args),
        Commands::Debug => debug::execute(&context).await,
    }
}
