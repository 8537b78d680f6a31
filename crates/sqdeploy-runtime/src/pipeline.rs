//! The fixed deploy pipeline.
//!
//! Stages always run in declaration order; options only remove stages.
//! The first stage that returns an error ends the run and earlier effects
//! stay in place.

use std::fmt;

use serde::Serialize;
use sqdeploy_compose::plan::DeployOptions;

/// One step of the deploy pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    /// Build and start the compose project.
    Start,
    /// Poll until the container is running.
    WaitReady,
    /// Copy password files into the server root.
    CopyPasswordFiles,
    /// Link password files into assignment directories.
    CreateLinks,
    /// Reassign ownership and run the maintenance script.
    FixPermissions,
    /// Signal the web server to reload.
    Reload,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Self; 6] = [
        Self::Start,
        Self::WaitReady,
        Self::CopyPasswordFiles,
        Self::CreateLinks,
        Self::FixPermissions,
        Self::Reload,
    ];

    /// Whether this stage runs under `options`.
    #[must_use]
    pub const fn enabled(self, options: &DeployOptions) -> bool {
        match self {
            Self::Start => !options.no_start,
            Self::WaitReady => true,
            Self::CopyPasswordFiles => !options.build_only && options.copy_pass_files,
            Self::CreateLinks | Self::FixPermissions | Self::Reload => !options.build_only,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start container",
            Self::WaitReady => "wait for container",
            Self::CopyPasswordFiles => "copy password files",
            Self::CreateLinks => "create password links",
            Self::FixPermissions => "fix permissions",
            Self::Reload => "reload server",
        };
        f.write_str(name)
    }
}

/// Stages to run for `options`, in order.
#[must_use]
pub fn stages_for(options: &DeployOptions) -> Vec<Stage> {
    Stage::ALL
        .into_iter()
        .filter(|s| s.enabled(options))
        .collect()
}

/// Result of one completed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StageOutcome {
    /// The project was started.
    Started {
        /// Whether the image was rebuilt.
        rebuilt: bool,
    },
    /// The container reported running.
    Ready {
        /// Polls it took.
        attempts: u32,
    },
    /// Password files were copied.
    Copied {
        /// Number of files copied.
        files: usize,
        /// Files left alone because they are already bind-mounted.
        skipped: usize,
    },
    /// Links were processed.
    Linked {
        /// Links created.
        created: usize,
        /// Links skipped by a failed pre-check.
        skipped: usize,
    },
    /// Ownership and maintenance script succeeded.
    PermissionsFixed,
    /// Reload was attempted.
    Reloaded {
        /// Whether the reload command succeeded.
        ok: bool,
    },
}

/// A stage together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// Stage that ran.
    pub stage: Stage,
    /// What it produced.
    pub outcome: StageOutcome,
}
