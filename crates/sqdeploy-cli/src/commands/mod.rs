//! CLI command definitions and dispatch.

pub mod deploy;
pub mod input;
pub mod mounts;
pub mod pass_files;
pub mod plan;

use clap::{Parser, Subcommand};

/// sqdeploy: deploy assignments and password files into SQTPM.
#[derive(Parser, Debug)]
#[command(name = "sqdeploy", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Log debug output (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Reconcile mounts, start the container, and link password files.
    Deploy(deploy::DeployArgs),
    /// Show the mount changes a deploy would make, without applying them.
    Plan(plan::PlanArgs),
    /// Show the persisted mount declaration.
    Mounts(mounts::MountsArgs),
    /// List `.pass` files in a directory.
    PassFiles(pass_files::PassFilesArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Deploy(args) => deploy::execute(args),
        Command::Plan(args) => plan::execute(args),
        Command::Mounts(args) => mounts::execute(args),
        Command::PassFiles(args) => pass_files::execute(args),
    }
}
