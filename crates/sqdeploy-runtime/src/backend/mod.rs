//! Container runtime abstraction.
//!
//! The driver never shells out itself; every external call goes through
//! [`ContainerRuntime`] so the whole pipeline can run against a scripted
//! runtime in tests.

pub mod docker;

use std::path::Path;

use sqdeploy_common::error::Result;

use crate::exec::ExecOutput;

/// Operations the runtime driver issues against the container runtime.
///
/// Each call is a discrete, independently failable external operation.
pub trait ContainerRuntime: Send + Sync {
    /// Starts the compose project in the background.
    ///
    /// With `rebuild` the service image is rebuilt first.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be started.
    fn up(&self, rebuild: bool) -> Result<()>;

    /// Stops and removes the compose project's containers.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be brought down.
    fn down(&self) -> Result<()>;

    /// Returns the runtime's status line for `container`, or `None` if no
    /// such container is listed.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn status(&self, container: &str) -> Result<Option<String>>;

    /// Executes `argv` inside `container`, optionally as `user`.
    ///
    /// A non-zero exit is reported through [`ExecOutput`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be issued at all.
    fn exec(&self, container: &str, user: Option<&str>, argv: &[String]) -> Result<ExecOutput>;

    /// Copies a host file into `dest_dir` inside `container`.
    ///
    /// # Errors
    ///
    /// Returns an error if the copy fails.
    fn copy_into(&self, container: &str, host_path: &Path, dest_dir: &str) -> Result<()>;

    /// Returns whether the runtime is reachable.
    fn is_available(&self) -> bool;
}

/// Builds an argv from string slices.
#[must_use]
pub fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}
