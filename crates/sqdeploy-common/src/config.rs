//! Service layout configuration for a deployment target.
//!
//! Every in-container path the engine derives comes from a
//! [`ServiceLayout`], so tests and alternative deployments can swap the
//! defaults without touching planner or driver logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::MountBinding;

/// Where things live for the deployed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLayout {
    /// In-container directory all mounts are placed under.
    pub server_root: String,
    /// File name of the configuration override target under the server root.
    pub config_target_name: String,
    /// Service identifier inside the compose project.
    pub service_name: String,
    /// Host side of the baseline data mount.
    pub data_host_path: String,
    /// Directory name of the baseline data mount under the server root.
    pub data_dir_name: String,
    /// Compose project directory on the host.
    pub project_dir: PathBuf,
    /// File name of the persisted mount declaration inside `project_dir`.
    pub override_file: String,
    /// Maintenance script, relative to the server root.
    pub fix_perms_script: String,
    /// Shell snippet that reloads the served process.
    pub reload_command: String,
}

impl Default for ServiceLayout {
    fn default() -> Self {
        Self {
            server_root: constants::SERVER_ROOT.into(),
            config_target_name: constants::CONFIG_TARGET_NAME.into(),
            service_name: constants::SERVICE_NAME.into(),
            data_host_path: constants::DATA_HOST_PATH.into(),
            data_dir_name: constants::DATA_DIR_NAME.into(),
            project_dir: PathBuf::from("."),
            override_file: constants::OVERRIDE_FILE.into(),
            fix_perms_script: constants::FIX_PERMS_SCRIPT.into(),
            reload_command: constants::RELOAD_COMMAND.into(),
        }
    }
}

impl ServiceLayout {
    /// Returns the in-container path for a mounted entry named `basename`.
    #[must_use]
    pub fn container_path(&self, basename: &str) -> String {
        format!("{}/{basename}", self.server_root.trim_end_matches('/'))
    }

    /// Returns the fixed in-container path of the configuration override.
    #[must_use]
    pub fn config_target(&self) -> String {
        self.container_path(&self.config_target_name)
    }

    /// Returns the in-container path of the baseline data mount.
    #[must_use]
    pub fn baseline_target(&self) -> String {
        self.container_path(&self.data_dir_name)
    }

    /// Returns the always-present data mount.
    #[must_use]
    pub fn baseline_binding(&self) -> MountBinding {
        MountBinding::new(self.data_host_path.clone(), self.baseline_target())
    }

    /// Returns the host path of the persisted mount declaration.
    #[must_use]
    pub fn override_path(&self) -> PathBuf {
        self.project_dir.join(&self.override_file)
    }

    /// Returns the path of a password-file link inside an assignment directory.
    #[must_use]
    pub fn link_path(&self, assignment: &str, password_file: &str) -> String {
        format!("{}/{password_file}", self.container_path(assignment))
    }

    /// Returns the relative target a password-file link points at.
    #[must_use]
    pub fn link_target(password_file: &str) -> String {
        format!("../{password_file}")
    }

    /// Returns the shell command that runs the maintenance script.
    #[must_use]
    pub fn fix_perms_command(&self) -> String {
        format!(
            "cd {root} && chmod +x {script} && sh {script}",
            root = self.server_root,
            script = self.fix_perms_script
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_paths() {
        let layout = ServiceLayout::default();
        assert_eq!(
            layout.container_path("tree"),
            "/usr/local/apache2/htdocs/tree"
        );
        assert_eq!(layout.config_target(), "/usr/local/apache2/htdocs/sqtpm.cfg");
        assert_eq!(
            layout.baseline_binding().to_string(),
            "./data:/usr/local/apache2/htdocs/data"
        );
        assert_eq!(
            layout.override_path(),
            PathBuf::from("./docker-compose.override.yml")
        );
    }

    #[test]
    fn container_path_tolerates_trailing_slash_root() {
        let layout = ServiceLayout {
            server_root: "/srv/".into(),
            ..ServiceLayout::default()
        };
        assert_eq!(layout.container_path("a"), "/srv/a");
    }

    #[test]
    fn link_paths_are_relative_to_server_root() {
        let layout = ServiceLayout::default();
        assert_eq!(
            layout.link_path("tree", "users.pass"),
            "/usr/local/apache2/htdocs/tree/users.pass"
        );
        assert_eq!(ServiceLayout::link_target("users.pass"), "../users.pass");
    }

    #[test]
    fn fix_perms_command_enters_server_root() {
        let cmd = ServiceLayout::default().fix_perms_command();
        assert!(cmd.starts_with("cd /usr/local/apache2/htdocs && "));
        assert!(cmd.ends_with("sh Utils/fix-perms.sh"));
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let layout: ServiceLayout =
            serde_yaml::from_str("server_root: /srv/www\n").expect("parse");
        assert_eq!(layout.server_root, "/srv/www");
        assert_eq!(layout.service_name, "sqtpm-web");
    }
}
