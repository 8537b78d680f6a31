//! `sqdeploy plan`: show what a deploy would change, without applying it.

use clap::Args;
use sqdeploy_compose::plan;
use sqdeploy_compose::store::OverrideFileStore;
use sqdeploy_compose::writer;
use sqdeploy_runtime::pipeline;

use super::input::InputArgs;
use crate::output::{self, BOLD, DIM, RESET};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Deployment input.
    #[command(flatten)]
    pub input: InputArgs,
}

/// Executes the `plan` command.
///
/// Runs normalization, validation and mount planning against the
/// persisted override file. Nothing is written and the container is not
/// touched.
///
/// # Errors
///
/// Returns an error if the input is unusable or the override file cannot
/// be read.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let layout = args.input.layout();
    let config = args.input.normalized()?;
    let plan = plan::build_plan(config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let store = OverrideFileStore::from_layout(&layout);

    eprintln!("Deployment plan for {BOLD}{}{RESET}", plan.options.container);
    eprintln!("{DIM}override file: {}{RESET}", store.path().display());
    eprintln!();

    output::print_warnings(&plan.warnings);

    if plan.options.cleanup {
        eprintln!("  - remove {}", store.path().display());
        eprintln!("  - compose down");
        return Ok(());
    }

    let mounts = writer::preview(&store, &plan.pairs, plan.config_file.as_ref(), &layout)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    output::print_warnings(&mounts.warnings);

    eprintln!("  Mounts:");
    for change in &mounts.changes {
        eprintln!("    {}", output::describe_change(change));
    }
    eprintln!(
        "  {} mount(s) declared, {} new.",
        mounts.declaration.len(),
        mounts.added().count()
    );

    let links = plan.links();
    if !links.is_empty() {
        eprintln!();
        eprintln!("  Links:");
        for link in &links {
            eprintln!(
                "    {} -> {}",
                layout.link_path(&link.assignment, &link.password_file),
                sqdeploy_common::config::ServiceLayout::link_target(&link.password_file)
            );
        }
    }

    eprintln!();
    eprintln!("  Stages:");
    for stage in pipeline::stages_for(&plan.options) {
        eprintln!("    {stage}");
    }
    Ok(())
}
