//! `sqdeploy pass-files`: list password files in a directory.

use std::path::{Path, PathBuf};

use clap::Args;
use sqdeploy_common::constants::PASS_EXTENSION;

/// Arguments for the `pass-files` command.
#[derive(Args, Debug)]
pub struct PassFilesArgs {
    /// Directory to search.
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

/// Regular files ending in `.pass` directly under `dir`, sorted.
fn find_pass_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == PASS_EXTENSION) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Executes the `pass-files` command.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn execute(args: PassFilesArgs) -> anyhow::Result<()> {
    let files = find_pass_files(&args.dir)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", args.dir.display()))?;
    if files.is_empty() {
        eprintln!("No .{PASS_EXTENSION} files in {}.", args.dir.display());
        return Ok(());
    }
    for file in &files {
        println!("{}", file.display());
    }
    Ok(())
}
