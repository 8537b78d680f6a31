//! Mount planning: merges requested mounts into the persisted declaration.
//!
//! Assignment and password-file mounts are added once and never replaced;
//! a request whose container path is already declared is a no-op. The
//! config override is the only entry that gets swapped between runs.
//!
//! Two sources sharing a basename collide on the same container path, so
//! only the first-declared source is ever mounted. The later one is
//! reported as a [`WarningKind::AlreadyMounted`] warning.

use std::path::{Path, PathBuf};

use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::{
    ConfigOverrideRef, DeploymentPair, MountBinding, MountDeclaration, Warning, WarningKind,
};

/// What the planner did with one requested mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountChange {
    /// A new binding was appended.
    Added(MountBinding),
    /// The same binding was already declared.
    Unchanged(MountBinding),
    /// The container path was already taken by another host path.
    Skipped {
        /// Binding that was requested.
        requested: MountBinding,
        /// Binding that keeps the container path.
        existing: MountBinding,
    },
    /// The config override binding was swapped.
    Replaced {
        /// Binding that was removed.
        previous: MountBinding,
        /// Binding that took its place.
        current: MountBinding,
    },
}

/// Result of planning: the merged declaration plus a change log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    /// Declaration to persist.
    pub declaration: MountDeclaration,
    /// One entry per requested mount.
    pub changes: Vec<MountChange>,
    /// Recoverable problems found while planning.
    pub warnings: Vec<Warning>,
    baseline_target: String,
}

impl MountPlan {
    /// Returns whether the declaration holds nothing but the baseline mount.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declaration.only_targets(&self.baseline_target)
    }

    /// Returns the bindings added by this plan.
    pub fn added(&self) -> impl Iterator<Item = &MountBinding> {
        self.changes.iter().filter_map(|c| match c {
            MountChange::Added(b) => Some(b),
            _ => None,
        })
    }

    /// Returns whether the declaration differs from the one planned against.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes
            .iter()
            .any(|c| matches!(c, MountChange::Added(_) | MountChange::Replaced { .. }))
    }
}

/// Absolute host path with trailing separators and `.` segments dropped,
/// so `course/A/` and `course/A` bind the same source.
fn absolute(path: &Path) -> Result<String> {
    std::path::absolute(path)
        .map(|p| p.components().collect::<PathBuf>().to_string_lossy().into_owned())
        .map_err(|e| DeployError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn add_once(
    decl: &mut MountDeclaration,
    binding: MountBinding,
    changes: &mut Vec<MountChange>,
    warnings: &mut Vec<Warning>,
) {
    match decl.find(&binding.container_path) {
        None => {
            tracing::info!(mount = %binding, "adding mount");
            let _ = decl.insert(binding.clone());
            changes.push(MountChange::Added(binding));
        }
        Some(existing) if existing.host_path == binding.host_path => {
            tracing::info!(container_path = %binding.container_path, "already mounted");
            changes.push(MountChange::Unchanged(existing.clone()));
        }
        Some(existing) => {
            let existing = existing.clone();
            let warning = Warning::new(
                WarningKind::AlreadyMounted,
                format!(
                    "{} is already mounted from {}, not mounting {}",
                    binding.container_path, existing.host_path, binding.host_path
                ),
            );
            tracing::warn!("{}", warning.message);
            warnings.push(warning);
            changes.push(MountChange::Skipped {
                requested: binding,
                existing,
            });
        }
    }
}

/// Plans the mount declaration for validated pairs and config override.
///
/// `previous` is the persisted declaration, or `None` when nothing is
/// persisted yet. The baseline data mount is always present in the result.
/// A `None` config override leaves any persisted override untouched.
///
/// # Errors
///
/// Returns an error if a source path cannot be made absolute.
pub fn plan_mounts(
    previous: Option<MountDeclaration>,
    pairs: &[DeploymentPair],
    config_file: Option<&ConfigOverrideRef>,
    layout: &ServiceLayout,
) -> Result<MountPlan> {
    let baseline = layout.baseline_binding();
    let mut declaration = previous.unwrap_or_default();
    if !declaration.targets(&baseline.container_path) {
        let mut with_baseline = vec![baseline.clone()];
        with_baseline.extend(declaration.bindings().iter().cloned());
        declaration = MountDeclaration::new(with_baseline);
    }

    let mut changes = Vec::new();
    let mut warnings = Vec::new();

    for assignment in pairs.iter().flat_map(|p| &p.assignments) {
        let Some(name) = assignment.basename() else {
            continue;
        };
        let binding = MountBinding::new(
            absolute(assignment.source_path())?,
            layout.container_path(&name),
        );
        add_once(&mut declaration, binding, &mut changes, &mut warnings);
    }

    for file in pairs.iter().flat_map(|p| &p.password_files) {
        let Some(name) = file.basename() else {
            continue;
        };
        let binding = MountBinding::new(absolute(file.source_path())?, layout.container_path(&name));
        add_once(&mut declaration, binding, &mut changes, &mut warnings);
    }

    if let Some(cfg) = config_file {
        let binding = MountBinding::new(absolute(cfg.source_path())?, layout.config_target());
        if declaration.find(&binding.container_path) == Some(&binding) {
            tracing::info!(mount = %binding, "config override unchanged");
            changes.push(MountChange::Unchanged(binding));
        } else if let Some(previous) = declaration.replace(binding.clone()) {
            tracing::info!(from = %previous, to = %binding, "replacing config override");
            changes.push(MountChange::Replaced {
                previous,
                current: binding,
            });
        } else {
            tracing::info!(mount = %binding, "adding config override");
            changes.push(MountChange::Added(binding));
        }
    }

    Ok(MountPlan {
        declaration,
        changes,
        warnings,
        baseline_target: baseline.container_path,
    })
}
