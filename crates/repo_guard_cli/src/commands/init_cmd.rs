//! The `init` command: write the built-in plan to a file for editing.

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::info;

use crate::config::{default_plan_path, PlanFile};
use crate::errors::Error;

#[cfg(test)]
#[path = "init_cmd_tests.rs"]
mod tests;

/// Arguments of `repo-guard init`.
#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Where to write the plan. Defaults to ./repo-guard.toml
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Writes the built-in plan and returns the path written to.
///
/// # Errors
///
/// Returns `Error::InvalidArguments` if the file exists and `force` is not set, or
/// `Error::Config` if it cannot be written.
pub fn execute(args: &InitArgs) -> Result<PathBuf, Error> {
    let path = args.path.clone().unwrap_or_else(default_plan_path);
    write_default_plan(&path, args.force)?;
    Ok(path)
}

fn write_default_plan(path: &Path, force: bool) -> Result<(), Error> {
    if path.exists() && !force {
        return Err(Error::InvalidArguments(format!(
            "{:?} already exists, pass --force to overwrite it",
            path
        )));
    }

    PlanFile::default().save(path)?;
    info!("Wrote the built-in plan to {:?}", path);
    Ok(())
}
