//! `sqdeploy deploy`: reconcile mounts and run the deploy pipeline.

use std::time::{Duration, Instant};

use clap::Args;
use sqdeploy_common::constants::{READY_MAX_ATTEMPTS, READY_POLL_INTERVAL_SECS, SERVICE_URL};
use sqdeploy_common::error::DeployError;
use sqdeploy_compose::plan::{self, DeploymentPlan};
use sqdeploy_compose::store::OverrideFileStore;
use sqdeploy_runtime::backend::docker::DockerCli;
use sqdeploy_runtime::driver::{DeployReport, Driver};
use sqdeploy_runtime::readiness::ReadinessPolicy;

use super::input::InputArgs;
use crate::output::{self, BOLD, CYAN, DIM, GREEN, RESET, YELLOW};

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Deployment input.
    #[command(flatten)]
    pub input: InputArgs,

    /// Status polls before giving up on the container.
    #[arg(long, default_value_t = READY_MAX_ATTEMPTS)]
    pub ready_attempts: u32,

    /// Seconds between status polls.
    #[arg(long, default_value_t = READY_POLL_INTERVAL_SECS)]
    pub ready_interval: u64,
}

/// Executes the `deploy` command.
///
/// # Errors
///
/// Returns an error on any fatal stage failure; the process then exits
/// non-zero.
pub fn execute(args: DeployArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    output::print_header();

    let config = args.input.normalized()?;
    let plan = plan::build_plan(config).map_err(|e| match e {
        DeployError::NothingToDeploy => anyhow::anyhow!(
            "{e}\n\
             Pass pairs like `assignment:users.pass` or a file with --config-yaml"
        ),
        other => anyhow::anyhow!("{other}"),
    })?;
    output::print_warnings(&plan.warnings);
    tracing::debug!(options = ?plan.options, pairs = plan.pairs.len(), "resolved deploy plan");

    let layout = args.input.layout();
    let store = OverrideFileStore::from_layout(&layout);
    let runtime = DockerCli::detect(&layout.project_dir).map_err(|e| anyhow::anyhow!("{e}"))?;
    let driver = Driver::new(Box::new(runtime), layout)
        .with_readiness(ReadinessPolicy {
            interval: Duration::from_secs(args.ready_interval),
            max_attempts: args.ready_attempts,
        })
        .on_stage(|stage| eprintln!("  {CYAN}→{RESET} {stage}..."));

    if plan.options.cleanup {
        eprintln!("  Cleaning up {BOLD}{}{RESET}...", store.path().display());
        let report = driver.cleanup(&store).map_err(|e| anyhow::anyhow!("{e}"))?;
        eprintln!("  {GREEN}{}{RESET}", output::describe_commit(&report.commit));
        eprintln!("  {GREEN}Project stopped.{RESET}");
        return Ok(());
    }

    print_intent(&plan);
    let report = driver
        .deploy(&plan, &store)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    print_report(&report, &plan, started);
    Ok(())
}

fn print_intent(plan: &DeploymentPlan) {
    let assignments: usize = plan.pairs.iter().map(|p| p.assignments.len()).sum();
    eprintln!(
        "  Deploying {BOLD}{assignments}{RESET} assignment(s) into {BOLD}{}{RESET}",
        plan.options.container
    );
    if let Some(cfg) = &plan.config_file {
        eprintln!("  {DIM}config override: {cfg}{RESET}");
    }
    eprintln!();
}

fn print_report(report: &DeployReport, plan: &DeploymentPlan, started: Instant) {
    let new_warnings = &report.warnings[plan.warnings.len()..];
    eprintln!();
    eprintln!("  {DIM}{}{RESET}", output::describe_commit(&report.commit));
    for change in &report.mounts.changes {
        eprintln!("    {}", output::describe_change(change));
    }
    for link in &report.links {
        eprintln!("    {GREEN}●{RESET} linked {link}");
    }
    if !new_warnings.is_empty() {
        eprintln!();
        output::print_warnings(new_warnings);
    }

    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Deployed{RESET} in {:.1}s ({} stage(s), {} link(s))",
        started.elapsed().as_secs_f64(),
        report.stages.len(),
        report.links.len()
    );
    match &report.final_status {
        Some(status) => eprintln!("  {CYAN}Container:{RESET} {} {DIM}[{status}]{RESET}", plan.options.container),
        None => eprintln!("  {YELLOW}Container {} not listed{RESET}", plan.options.container),
    }
    if !plan.options.build_only {
        eprintln!("  {CYAN}Access at:{RESET} {BOLD}{SERVICE_URL}{RESET}");
    }
}
