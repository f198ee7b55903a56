use nvmw_core::pointer::{self, PointerState};

use crate::context::Context;

const NO_VERSION: &str = "No current version. Run 'nvm use x.x.x' to set a version.";

/// Print the version the activation symlink points at.
pub fn execute(context: &Context) {
    let symlink = &context.symlink;
    match pointer::active_version(symlink) {
        Some(version) => println!("v{version}"),
        None if pointer::inspect(symlink) == PointerState::Physical => println!(
            "{} is not a symlink managed by nvm. Run 'nvm debug' for details.",
            symlink.display()
        ),
        None => println!("{NO_VERSION}"),
    }
}
