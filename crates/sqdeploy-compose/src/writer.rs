//! Reconciliation writer: the only code that mutates persisted mount state.

use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::error::Result;
use sqdeploy_common::types::{ConfigOverrideRef, DeploymentPair, MountDeclaration};

use crate::planner::{self, MountPlan};
use crate::store::MountStore;

/// What happened to the persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The declaration was written in full.
    Saved {
        /// Where it was written.
        location: String,
        /// Number of bindings written.
        bindings: usize,
    },
    /// The persisted state was deleted.
    Removed {
        /// Where it lived.
        location: String,
        /// Whether anything existed before.
        existed: bool,
    },
}

/// Persists `declaration`, or removes the persisted state when it holds
/// nothing but the baseline mount.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn commit(
    store: &dyn MountStore,
    declaration: &MountDeclaration,
    layout: &ServiceLayout,
) -> Result<CommitOutcome> {
    if declaration.only_targets(&layout.baseline_target()) {
        return clear(store);
    }
    store.save(declaration)?;
    Ok(CommitOutcome::Saved {
        location: store.location(),
        bindings: declaration.len(),
    })
}

/// Removes the persisted state entirely, baseline included.
///
/// # Errors
///
/// Returns an error if existing state cannot be removed.
pub fn clear(store: &dyn MountStore) -> Result<CommitOutcome> {
    let existed = store.remove()?;
    Ok(CommitOutcome::Removed {
        location: store.location(),
        existed,
    })
}

/// Loads the persisted declaration and plans against it without writing.
///
/// # Errors
///
/// Returns an error if persisted state cannot be read or a source path
/// cannot be resolved.
pub fn preview(
    store: &dyn MountStore,
    pairs: &[DeploymentPair],
    config_file: Option<&ConfigOverrideRef>,
    layout: &ServiceLayout,
) -> Result<MountPlan> {
    let previous = store.load()?;
    planner::plan_mounts(previous, pairs, config_file, layout)
}

/// Loads, plans, and commits in one step.
///
/// # Errors
///
/// Returns an error if any of the three steps fails. A failed write leaves
/// the previous state in place.
pub fn reconcile(
    store: &dyn MountStore,
    pairs: &[DeploymentPair],
    config_file: Option<&ConfigOverrideRef>,
    layout: &ServiceLayout,
) -> Result<(MountPlan, CommitOutcome)> {
    let plan = preview(store, pairs, config_file, layout)?;
    let outcome = commit(store, &plan.declaration, layout)?;
    tracing::info!(
        mounts = plan.declaration.len(),
        added = plan.added().count(),
        location = %store.location(),
        "mount declaration reconciled"
    );
    Ok((plan, outcome))
}
