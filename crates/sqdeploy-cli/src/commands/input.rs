//! Deployment input shared by `deploy` and `plan`.

use std::path::PathBuf;

use clap::Args;
use sqdeploy_common::config::ServiceLayout;
use sqdeploy_compose::parser::{self, model::NormalizedConfig, model::ScalarOverrides};

/// Pairs, YAML file and option flags.
///
/// Flags given here override the same keys in the YAML file.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Deployment pairs: `assign1,assign2:pass1,pass2` or `assign`.
    pub pairs: Vec<String>,

    /// YAML deployment file (mapping, grouped or list shape).
    #[arg(long, value_name = "FILE")]
    pub config_yaml: Option<PathBuf>,

    /// Configuration file mounted over the service's `sqtpm.cfg`.
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Container to drive.
    #[arg(long, env = "SQDEPLOY_CONTAINER")]
    pub container: Option<String>,

    /// Directory holding `docker-compose.yml`.
    #[arg(long, env = "SQDEPLOY_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Stop once the container is up and ready.
    #[arg(long)]
    pub build_only: bool,

    /// Start without rebuilding the image.
    #[arg(long, alias = "no-build")]
    pub no_rebuild: bool,

    /// Remove the override file and bring the project down.
    #[arg(long)]
    pub cleanup: bool,

    /// Assume the container is already running.
    #[arg(long)]
    pub no_start: bool,

    /// Copy password files into the server root before linking.
    #[arg(long)]
    pub copy_pass_files: bool,
}

const fn flag(set: bool) -> Option<bool> {
    if set { Some(true) } else { None }
}

impl InputArgs {
    /// Scalar overrides set on the command line.
    #[must_use]
    pub fn overrides(&self) -> ScalarOverrides {
        ScalarOverrides {
            config_file: self.config_file.clone(),
            container: self.container.clone(),
            build_only: flag(self.build_only),
            no_rebuild: flag(self.no_rebuild),
            cleanup: flag(self.cleanup),
            copy_pass_files: flag(self.copy_pass_files),
            no_start: flag(self.no_start),
        }
    }

    /// Normalizes the YAML file (if any) and the pair tokens into one
    /// model, command-line flags last.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML file cannot be read or parsed.
    pub fn normalized(&self) -> anyhow::Result<NormalizedConfig> {
        let mut config = match &self.config_yaml {
            Some(path) => parser::load_yaml_file(path).map_err(|e| anyhow::anyhow!("{e}"))?,
            None => NormalizedConfig::default(),
        };
        config.merge(parser::normalize_pairs(&self.pairs));
        config.overrides.overlay(self.overrides());
        Ok(config)
    }

    /// Service layout rooted at the project directory.
    #[must_use]
    pub fn layout(&self) -> ServiceLayout {
        ServiceLayout {
            project_dir: self.project_dir.clone(),
            ..ServiceLayout::default()
        }
    }
}
