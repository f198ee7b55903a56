//! `nvm list [installed|available]`

use clap::{Args, ValueEnum};
use nvmw_backend::{Architecture, NodeVersion};
use nvmw_core::{Catalog, inventory, pointer};

use crate::context::Context;
use crate::error::AppError;

const AVAILABLE_ROWS: usize = 20;
const COLUMN_WIDTH: usize = 14;
const RELEASES_URL: &str = "https://nodejs.org/en/download/releases";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFilter {
    #[default]
    Installed,
    Available,
}

#[derive(Args)]
pub struct ListArgs {
    /// What to list.
    #[arg(value_enum)]
    pub filter: Option<ListFilter>,
}

/// # Errors
/// Fails when the installation root cannot be read or the release catalog
/// cannot be fetched.
pub async fn execute(context: &Context, args: &ListArgs) -> Result<(), AppError> {
    match args.filter.unwrap_or_default() {
        ListFilter::Installed => list_installed(context),
        ListFilter::Available => list_available(context).await,
    }
}

fn list_installed(context: &Context) -> Result<(), AppError> {
    let config = context.config();
    let installed = inventory::list_installed(&config.root)
        .map_err(|error| AppError::operation("list", error))?;
    let active = pointer::active_version(&config.symlink)
        .map(|version| (version, pointer::active_arch(&config.symlink)));
    print!("{}", render_installed(&installed, active.as_ref()));
    Ok(())
}

async fn list_available(context: &Context) -> Result<(), AppError> {
    let session = context.session(false)?;
    let catalog = session
        .catalog()
        .await
        .map_err(|error| AppError::operation("list available", error))?;
    print!("{}", render_available(catalog, AVAILABLE_ROWS));
    println!("\nThis is a partial list. For a complete list, visit {RELEASES_URL}");
    Ok(())
}

fn render_installed(
    installed: &[NodeVersion],
    active: Option<&(NodeVersion, Option<Architecture>)>,
) -> String {
    if installed.is_empty() {
        return "\nNo installations recognized.\n".to_string();
    }

    let mut out = String::from("\n");
    for version in installed {
        match active {
            Some((current, arch)) if current == version => {
                let label = arch.map_or("unknown", Architecture::label);
                out.push_str(&format!("  * {version} (Currently using {label} executable)\n"));
            }
            _ => out.push_str(&format!("    {version}\n")),
        }
    }
    out
}

/// Newest releases of each channel side by side, `rows` deep.
fn render_available(catalog: &Catalog, rows: usize) -> String {
    let columns = [
        ("CURRENT", &catalog.current),
        ("LTS", &catalog.lts),
        ("OLD STABLE", &catalog.stable),
        ("OLD UNSTABLE", &catalog.unstable),
    ];

    let mut out = String::from("\n");
    let header: Vec<String> = columns
        .iter()
        .map(|(title, _)| format!("{title:^COLUMN_WIDTH$}"))
        .collect();
    out.push_str(&format!("|{}|\n", header.join("|")));
    let rule = vec!["-".repeat(COLUMN_WIDTH); columns.len()];
    out.push_str(&format!("|{}|\n", rule.join("|")));

    for row in 0..rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|(_, versions)| {
                let cell = versions.get(row).map(ToString::to_string).unwrap_or_default();
                format!("{cell:^COLUMN_WIDTH$}")
            })
            .collect();
        out.push_str(&format!("|{}|\n", cells.join("|")));
    }
    out
}
