//! Runtime driver that executes a deployment plan.

use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::{Warning, WarningKind};
use sqdeploy_compose::plan::{DeploymentPlan, LinkSpec};
use sqdeploy_compose::planner::MountPlan;
use sqdeploy_compose::store::MountStore;
use sqdeploy_compose::writer::{self, CommitOutcome};

use crate::backend::{ContainerRuntime, argv};
use crate::identity::HostIdentity;
use crate::pipeline::{self, Stage, StageOutcome, StageRecord};
use crate::readiness::{self, ReadinessPolicy};

/// Everything a successful deploy did.
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Mount plan that was committed.
    pub mounts: MountPlan,
    /// What happened to the persisted mount state.
    pub commit: CommitOutcome,
    /// Stages that ran, in order.
    pub stages: Vec<StageRecord>,
    /// In-container paths of the links created.
    pub links: Vec<String>,
    /// Every recoverable problem of the run, validation included.
    pub warnings: Vec<Warning>,
    /// Container status line after the last stage.
    pub final_status: Option<String>,
}

/// What a cleanup did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// What happened to the persisted mount state.
    pub commit: CommitOutcome,
}

type StageHook = Box<dyn Fn(Stage) + Send + Sync>;

/// Drives the deploy pipeline against a container runtime.
///
/// Holds the runtime backend and the service layout every in-container
/// path is derived from.
pub struct Driver {
    runtime: Box<dyn ContainerRuntime>,
    layout: ServiceLayout,
    readiness: ReadinessPolicy,
    identity: HostIdentity,
    on_stage: Option<StageHook>,
}

/// Container paths bind-mounted in the running container.
///
/// After a start every declared mount is live. Without one, the container
/// still runs with the previous declaration, so mounts added this run are
/// not there yet and a copy is the only way to get the file in.
fn live_mounts(report: &DeployReport) -> Vec<&str> {
    let started = report.stages.iter().any(|r| r.stage == Stage::Start);
    let added: Vec<&str> = report
        .mounts
        .added()
        .map(|b| b.container_path.as_str())
        .collect();
    report
        .mounts
        .declaration
        .bindings()
        .iter()
        .map(|b| b.container_path.as_str())
        .filter(|target| started || !added.contains(target))
        .collect()
}

impl Driver {
    /// Creates a driver for `runtime` with default readiness policy and the
    /// current host identity.
    #[must_use]
    pub fn new(runtime: Box<dyn ContainerRuntime>, layout: ServiceLayout) -> Self {
        Self {
            runtime,
            layout,
            readiness: ReadinessPolicy::default(),
            identity: HostIdentity::current(),
            on_stage: None,
        }
    }

    /// Replaces the readiness policy.
    #[must_use]
    pub const fn with_readiness(mut self, policy: ReadinessPolicy) -> Self {
        self.readiness = policy;
        self
    }

    /// Replaces the identity that will own the server root.
    #[must_use]
    pub const fn with_identity(mut self, identity: HostIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Registers a callback invoked as each stage begins.
    #[must_use]
    pub fn on_stage(mut self, hook: impl Fn(Stage) + Send + Sync + 'static) -> Self {
        self.on_stage = Some(Box::new(hook));
        self
    }

    /// Returns the service layout.
    #[must_use]
    pub const fn layout(&self) -> &ServiceLayout {
        &self.layout
    }

    /// Returns whether the runtime is reachable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.runtime.is_available()
    }

    /// Commits the mount declaration for `plan`, then runs every enabled
    /// stage in order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal failure: mount-state persistence, start,
    /// readiness timeout, copy, link creation, or permission fixup. Effects
    /// of earlier stages are left in place.
    pub fn deploy(&self, plan: &DeploymentPlan, store: &dyn MountStore) -> Result<DeployReport> {
        let container = plan.options.container.as_str();
        tracing::info!(container, pairs = plan.pairs.len(), "deploying");

        let (mounts, commit) =
            writer::reconcile(store, &plan.pairs, plan.config_file.as_ref(), &self.layout)?;

        let mut warnings = plan.warnings.clone();
        warnings.extend(mounts.warnings.iter().cloned());

        let mut report = DeployReport {
            mounts,
            commit,
            stages: Vec::new(),
            links: Vec::new(),
            warnings,
            final_status: None,
        };

        for stage in pipeline::stages_for(&plan.options) {
            if let Some(hook) = &self.on_stage {
                hook(stage);
            }
            tracing::info!(%stage, "stage started");
            let outcome = self.run_stage(stage, plan, &mut report)?;
            report.stages.push(StageRecord { stage, outcome });
        }

        report.final_status = self.runtime.status(container).ok().flatten();
        tracing::info!(
            container,
            links = report.links.len(),
            warnings = report.warnings.len(),
            "deploy finished"
        );
        Ok(report)
    }

    /// Removes the persisted mount declaration and brings the project down.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be removed or the project
    /// cannot be stopped.
    pub fn cleanup(&self, store: &dyn MountStore) -> Result<CleanupReport> {
        let commit = writer::clear(store)?;
        tracing::info!(location = %store.location(), "mount state cleared");
        self.runtime.down()?;
        Ok(CleanupReport { commit })
    }

    fn run_stage(
        &self,
        stage: Stage,
        plan: &DeploymentPlan,
        report: &mut DeployReport,
    ) -> Result<StageOutcome> {
        let container = plan.options.container.as_str();
        match stage {
            Stage::Start => {
                let rebuilt = !plan.options.no_rebuild;
                self.runtime.up(rebuilt)?;
                Ok(StageOutcome::Started { rebuilt })
            }
            Stage::WaitReady => {
                let attempts = readiness::wait_until_ready(&*self.runtime, container, self.readiness)?;
                Ok(StageOutcome::Ready { attempts })
            }
            Stage::CopyPasswordFiles => {
                let live = live_mounts(report);
                let mut copied = 0;
                let mut skipped = 0;
                for file in plan.password_files() {
                    let Some(name) = file.basename() else {
                        continue;
                    };
                    let target = self.layout.container_path(&name);
                    if live.contains(&target.as_str()) {
                        tracing::info!(
                            file = %file,
                            container_path = %target,
                            "already bind-mounted, not copying"
                        );
                        skipped += 1;
                        continue;
                    }
                    tracing::info!(file = %file, "copying password file");
                    self.runtime
                        .copy_into(container, file.source_path(), &self.layout.server_root)?;
                    copied += 1;
                }
                Ok(StageOutcome::Copied {
                    files: copied,
                    skipped,
                })
            }
            Stage::CreateLinks => {
                let links = plan.links();
                let mut skipped = 0;
                for link in &links {
                    match self.create_link(container, link)? {
                        Some(path) => report.links.push(path),
                        None => {
                            skipped += 1;
                            report.warnings.push(Warning::new(
                                WarningKind::LinkPrecheck,
                                format!(
                                    "{}/{} not linked: mount missing in container",
                                    link.assignment, link.password_file
                                ),
                            ));
                        }
                    }
                }
                Ok(StageOutcome::Linked {
                    created: links.len() - skipped,
                    skipped,
                })
            }
            Stage::FixPermissions => {
                self.fix_permissions(container)?;
                Ok(StageOutcome::PermissionsFixed)
            }
            Stage::Reload => {
                let ok = self.reload(container, &mut report.warnings);
                Ok(StageOutcome::Reloaded { ok })
            }
        }
    }

    fn exists(&self, container: &str, flag: &str, path: &str) -> Result<bool> {
        let out = self
            .runtime
            .exec(container, None, &argv(&["test", flag, path]))?;
        Ok(out.success())
    }

    /// Creates one link. Returns `Ok(None)` when a pre-check fails.
    fn create_link(&self, container: &str, link: &LinkSpec) -> Result<Option<String>> {
        let assignment_dir = self.layout.container_path(&link.assignment);
        let password_path = self.layout.container_path(&link.password_file);

        if !self.exists(container, "-d", &assignment_dir)? {
            tracing::warn!(dir = %assignment_dir, "assignment not mounted, skipping link");
            return Ok(None);
        }
        if !self.exists(container, "-f", &password_path)? {
            tracing::warn!(file = %password_path, "password file not mounted, skipping link");
            return Ok(None);
        }

        let link_path = self.layout.link_path(&link.assignment, &link.password_file);
        let target = ServiceLayout::link_target(&link.password_file);

        match self
            .runtime
            .exec(container, None, &argv(&["rm", "-f", &link_path]))
        {
            Ok(out) if !out.success() => {
                tracing::debug!(link = %link_path, error = %out.diagnostic(), "rm -f failed");
            }
            Err(e) => tracing::debug!(link = %link_path, error = %e, "rm -f failed"),
            Ok(_) => {}
        }

        let out = self
            .runtime
            .exec(container, None, &argv(&["ln", "-s", &target, &link_path]))
            .map_err(|e| DeployError::LinkFailed {
                link: link_path.clone(),
                message: e.to_string(),
            })?;
        if !out.success() {
            return Err(DeployError::LinkFailed {
                link: link_path,
                message: out.diagnostic(),
            });
        }
        tracing::info!(link = %link_path, %target, "link created");
        Ok(Some(link_path))
    }

    fn fix_permissions(&self, container: &str) -> Result<()> {
        let owner = self.identity.to_string();
        let root = self.layout.server_root.as_str();

        let chown = self
            .runtime
            .exec(container, Some("root"), &argv(&["chown", "-R", &owner, root]))
            .map_err(|e| DeployError::PermissionFixup {
                message: e.to_string(),
            })?;
        if !chown.success() {
            return Err(DeployError::PermissionFixup {
                message: format!("chown -R {owner} {root}: {}", chown.diagnostic()),
            });
        }

        let script = self.layout.fix_perms_command();
        let out = self
            .runtime
            .exec(container, Some(&owner), &argv(&["sh", "-c", &script]))
            .map_err(|e| DeployError::PermissionFixup {
                message: e.to_string(),
            })?;
        if !out.success() {
            return Err(DeployError::PermissionFixup {
                message: format!("{}: {}", self.layout.fix_perms_script, out.diagnostic()),
            });
        }
        tracing::info!(%owner, root, "permissions fixed");
        Ok(())
    }

    fn reload(&self, container: &str, warnings: &mut Vec<Warning>) -> bool {
        let failure = match self.runtime.exec(
            container,
            None,
            &argv(&["sh", "-c", &self.layout.reload_command]),
        ) {
            Ok(out) if out.success() => None,
            Ok(out) => Some(out.diagnostic()),
            Err(e) => Some(e.to_string()),
        };
        match failure {
            None => {
                tracing::info!(container, "server reloaded");
                true
            }
            Some(message) => {
                tracing::warn!(container, %message, "reload failed");
                warnings.push(Warning::new(WarningKind::Reload, message));
                false
            }
        }
    }
}
