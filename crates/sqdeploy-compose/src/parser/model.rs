//! Canonical in-memory model produced by every input decoder.

use std::path::PathBuf;

use serde::Deserialize;
use sqdeploy_common::types::DeploymentPair;

/// Scalar settings a deployment source may carry.
///
/// Every field is optional so sources can be layered: a later source only
/// overrides the values it actually sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScalarOverrides {
    /// Configuration file replacing the service default.
    pub config_file: Option<PathBuf>,
    /// Container name to drive.
    pub container: Option<String>,
    /// Stop after the container is up and ready.
    pub build_only: Option<bool>,
    /// Start without rebuilding the image.
    pub no_rebuild: Option<bool>,
    /// Remove the mount declaration and bring the project down.
    pub cleanup: Option<bool>,
    /// Copy password files into the server root before linking.
    pub copy_pass_files: Option<bool>,
    /// Assume the container is already running.
    pub no_start: Option<bool>,
}

impl ScalarOverrides {
    /// Overlays every value set in `other` onto `self`.
    pub fn overlay(&mut self, other: Self) {
        if other.config_file.is_some() {
            self.config_file = other.config_file;
        }
        if other.container.is_some() {
            self.container = other.container;
        }
        self.build_only = other.build_only.or(self.build_only);
        self.no_rebuild = other.no_rebuild.or(self.no_rebuild);
        self.cleanup = other.cleanup.or(self.cleanup);
        self.copy_pass_files = other.copy_pass_files.or(self.copy_pass_files);
        self.no_start = other.no_start.or(self.no_start);
    }
}

/// Pairs plus scalar overrides, independent of the input shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedConfig {
    /// Deployment pairs in the order they were declared.
    pub pairs: Vec<DeploymentPair>,
    /// Scalar overrides found in the source.
    pub overrides: ScalarOverrides,
}

impl NormalizedConfig {
    /// Appends `other`'s pairs and overlays its scalar overrides.
    pub fn merge(&mut self, other: Self) {
        self.pairs.extend(other.pairs);
        self.overrides.overlay(other.overrides);
    }
}
