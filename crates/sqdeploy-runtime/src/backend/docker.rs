//! Docker CLI backend.
//!
//! Shells out to `docker` for container operations and to `docker compose`
//! (or the standalone `docker-compose`) for project operations. Compose
//! commands run in the project directory so the override file next to
//! `docker-compose.yml` is picked up.

use std::path::{Path, PathBuf};

use sqdeploy_common::error::{DeployError, Result};

use super::ContainerRuntime;
use crate::exec::{self, ExecOutput};

/// How compose is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ComposeCommand {
    /// `docker compose ...`
    Plugin,
    /// `docker-compose ...`
    Standalone(PathBuf),
}

/// Container runtime backed by the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerCli {
    docker: PathBuf,
    compose: ComposeCommand,
    project_dir: PathBuf,
}

impl DockerCli {
    /// Locates the Docker CLI and a compose frontend.
    ///
    /// Prefers the `docker compose` plugin and falls back to a standalone
    /// `docker-compose` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if `docker` is not installed, or if neither compose
    /// frontend is available.
    pub fn detect(project_dir: impl Into<PathBuf>) -> Result<Self> {
        let docker = find_binary("docker", "Install Docker Engine or Docker Desktop")?;
        let plugin = exec::run_command(&docker, &["compose".into(), "version".into()], None)
            .is_ok_and(|out| out.success());
        let compose = if plugin {
            ComposeCommand::Plugin
        } else {
            ComposeCommand::Standalone(find_binary(
                "docker-compose",
                "Install the docker compose plugin",
            )?)
        };
        tracing::debug!(docker = %docker.display(), ?compose, "docker backend detected");
        Ok(Self {
            docker,
            compose,
            project_dir: project_dir.into(),
        })
    }

    /// Returns the compose project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    fn docker(&self, args: Vec<String>) -> Result<ExecOutput> {
        exec::run_command(&self.docker, &args, None)
    }

    fn compose(&self, operation: &str, args: &[&str]) -> Result<()> {
        let (program, mut full) = match &self.compose {
            ComposeCommand::Plugin => (self.docker.as_path(), vec!["compose".to_string()]),
            ComposeCommand::Standalone(path) => (path.as_path(), Vec::new()),
        };
        full.extend(args.iter().map(|s| (*s).to_string()));
        tracing::info!(project_dir = %self.project_dir.display(), ?full, "running compose");
        let out = exec::run_command(program, &full, Some(&self.project_dir))?;
        ensure_success(operation, &out)
    }
}

fn find_binary(name: &str, hint: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| DeployError::NotFound {
        kind: "executable",
        id: format!("{name} ({hint})"),
    })
}

fn ensure_success(operation: &str, out: &ExecOutput) -> Result<()> {
    if out.success() {
        Ok(())
    } else {
        Err(DeployError::Runtime {
            operation: operation.to_string(),
            message: out.diagnostic(),
        })
    }
}

/// Arguments of `docker exec`.
fn exec_args(container: &str, user: Option<&str>, argv: &[String]) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(user) = user {
        args.push("--user".into());
        args.push(user.to_string());
    }
    args.push(container.to_string());
    args.extend(argv.iter().cloned());
    args
}

/// Arguments of `docker ps` filtered to exactly one container name.
fn status_args(container: &str) -> Vec<String> {
    vec![
        "ps".into(),
        "--all".into(),
        "--filter".into(),
        format!("name=^/?{container}$"),
        "--format".into(),
        "{{.Status}}".into(),
    ]
}

impl ContainerRuntime for DockerCli {
    fn up(&self, rebuild: bool) -> Result<()> {
        if rebuild {
            self.compose("compose up", &["up", "-d", "--build"])
        } else {
            self.compose("compose up", &["up", "-d"])
        }
    }

    fn down(&self) -> Result<()> {
        self.compose("compose down", &["down"])
    }

    fn status(&self, container: &str) -> Result<Option<String>> {
        let out = self.docker(status_args(container))?;
        ensure_success("docker ps", &out)?;
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    fn exec(&self, container: &str, user: Option<&str>, argv: &[String]) -> Result<ExecOutput> {
        if argv.is_empty() {
            return Err(DeployError::Config {
                message: "exec command is empty".into(),
            });
        }
        self.docker(exec_args(container, user, argv))
    }

    fn copy_into(&self, container: &str, host_path: &Path, dest_dir: &str) -> Result<()> {
        let dest = format!("{container}:{}/", dest_dir.trim_end_matches('/'));
        let out = self.docker(vec![
            "cp".into(),
            host_path.display().to_string(),
            dest,
        ])?;
        ensure_success("docker cp", &out)
    }

    fn is_available(&self) -> bool {
        self.docker(vec![
            "version".into(),
            "--format".into(),
            "{{.Server.Version}}".into(),
        ])
        .is_ok_and(|out| out.success())
    }
}
