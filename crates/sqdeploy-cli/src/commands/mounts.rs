//! `sqdeploy mounts`: show the persisted mount declaration.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::types::MountBinding;
use sqdeploy_compose::store::{MountStore, OverrideFileStore};

/// Arguments for the `mounts` command.
#[derive(Args, Debug)]
pub struct MountsArgs {
    /// Directory holding `docker-compose.yml`.
    #[arg(long, env = "SQDEPLOY_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MountRow<'a> {
    host_path: &'a str,
    container_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'a str>,
    baseline: bool,
}

fn rows<'a>(bindings: &'a [MountBinding], layout: &ServiceLayout) -> Vec<MountRow<'a>> {
    let baseline = layout.baseline_target();
    bindings
        .iter()
        .map(|b| MountRow {
            host_path: &b.host_path,
            container_path: &b.container_path,
            mode: b.mode.as_deref(),
            baseline: b.container_path == baseline,
        })
        .collect()
}

/// Executes the `mounts` command.
///
/// # Errors
///
/// Returns an error if the override file exists but cannot be read.
pub fn execute(args: MountsArgs) -> anyhow::Result<()> {
    let layout = ServiceLayout {
        project_dir: args.project_dir,
        ..ServiceLayout::default()
    };
    let store = OverrideFileStore::from_layout(&layout);
    let declaration = store
        .load()
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .unwrap_or_default();
    let rows = rows(declaration.bindings(), &layout);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("No mounts declared in {}.", store.location());
        return Ok(());
    }
    println!("{:<50} {:<50}", "HOST", "CONTAINER");
    for row in &rows {
        let marker = if row.baseline { " (baseline)" } else { "" };
        println!("{:<50} {:<50}{marker}", row.host_path, row.container_path);
    }
    Ok(())
}
