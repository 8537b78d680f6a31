//! Deployment plan assembly.
//!
//! Turns a normalized config into the validated, de-duplicated plan the
//! runtime driver executes. The plan itself is never persisted.

use serde::Serialize;
use sqdeploy_common::constants::DEFAULT_CONTAINER;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::{ConfigOverrideRef, DeploymentPair, PasswordFileRef, Warning};

use crate::parser::model::{NormalizedConfig, ScalarOverrides};
use crate::validator;

/// Resolved scalar options of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployOptions {
    /// Container to drive.
    pub container: String,
    /// Stop once the container is ready.
    pub build_only: bool,
    /// Start without rebuilding the image.
    pub no_rebuild: bool,
    /// Remove mount state and bring the project down instead of deploying.
    pub cleanup: bool,
    /// Copy password files into the server root before linking.
    pub copy_pass_files: bool,
    /// Skip the start stage.
    pub no_start: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self::from_overrides(&ScalarOverrides::default())
    }
}

impl DeployOptions {
    /// Resolves options, falling back to defaults for unset values.
    #[must_use]
    pub fn from_overrides(overrides: &ScalarOverrides) -> Self {
        Self {
            container: overrides
                .container
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
            build_only: overrides.build_only.unwrap_or(false),
            no_rebuild: overrides.no_rebuild.unwrap_or(false),
            cleanup: overrides.cleanup.unwrap_or(false),
            copy_pass_files: overrides.copy_pass_files.unwrap_or(false),
            no_start: overrides.no_start.unwrap_or(false),
        }
    }
}

/// One symlink to create: `<root>/<assignment>/<password_file>` pointing at
/// `../<password_file>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LinkSpec {
    /// Basename of the assignment directory.
    pub assignment: String,
    /// Basename of the password file.
    pub password_file: String,
}

/// Validated pairs, config override and options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// Pairs that survived validation.
    pub pairs: Vec<DeploymentPair>,
    /// Config override, if valid.
    pub config_file: Option<ConfigOverrideRef>,
    /// Resolved options.
    pub options: DeployOptions,
    /// Validation warnings.
    pub warnings: Vec<Warning>,
}

impl DeploymentPlan {
    /// Links to create, pair by pair. Pairs never cross-link.
    #[must_use]
    pub fn links(&self) -> Vec<LinkSpec> {
        let mut links = Vec::new();
        for pair in &self.pairs {
            for assignment in pair.assignments.iter().filter_map(|a| a.basename()) {
                for password_file in pair.password_files.iter().filter_map(|p| p.basename()) {
                    let link = LinkSpec {
                        assignment: assignment.clone(),
                        password_file,
                    };
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }
        links
    }

    /// Every password file across all pairs, first occurrence kept.
    #[must_use]
    pub fn password_files(&self) -> Vec<&PasswordFileRef> {
        let mut files: Vec<&PasswordFileRef> = Vec::new();
        for file in self.pairs.iter().flat_map(|p| &p.password_files) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        files
    }
}

/// Validates a normalized config and resolves its options.
///
/// # Errors
///
/// Returns [`DeployError::NothingToDeploy`] when no pair survives
/// validation, unless cleanup was requested.
pub fn build_plan(config: NormalizedConfig) -> Result<DeploymentPlan> {
    let options = DeployOptions::from_overrides(&config.overrides);
    let config_file = config.overrides.config_file.map(ConfigOverrideRef::new);
    let validated = validator::validate(config.pairs, config_file);
    if validated.is_empty() && !options.cleanup {
        return Err(DeployError::NothingToDeploy);
    }
    Ok(DeploymentPlan {
        pairs: validated.pairs,
        config_file: validated.config_file,
        options,
        warnings: validated.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_of(pairs: Vec<DeploymentPair>) -> DeploymentPlan {
        DeploymentPlan {
            pairs,
            config_file: None,
            options: DeployOptions::default(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn options_default_to_known_container() {
        let options = DeployOptions::default();
        assert_eq!(options.container, DEFAULT_CONTAINER);
        assert!(!options.build_only && !options.cleanup && !options.no_start);
    }

    #[test]
    fn links_stay_inside_their_pair() {
        let plan = plan_of(vec![
            DeploymentPair::from_paths(["/h/A"], ["/h/users.pass"]),
            DeploymentPair::from_paths(["/h/B", "/h/C"], Vec::<String>::new()),
        ]);
        assert_eq!(
            plan.links(),
            vec![LinkSpec {
                assignment: "A".into(),
                password_file: "users.pass".into()
            }]
        );
    }

    #[test]
    fn links_cover_every_combination() {
        let plan = plan_of(vec![DeploymentPair::from_paths(
            ["/h/A", "/h/B"],
            ["/h/x.pass", "/h/y.pass"],
        )]);
        assert_eq!(plan.links().len(), 4);
    }

    #[test]
    fn password_files_are_collected_once() {
        let plan = plan_of(vec![
            DeploymentPair::from_paths(["/h/A"], ["/h/users.pass"]),
            DeploymentPair::from_paths(["/h/B"], ["/h/users.pass"]),
        ]);
        assert_eq!(plan.password_files().len(), 1);
    }

    #[test]
    fn empty_validation_is_fatal() {
        let config = NormalizedConfig {
            pairs: vec![DeploymentPair::from_paths(
                ["/definitely/not/here"],
                Vec::<String>::new(),
            )],
            overrides: ScalarOverrides::default(),
        };
        assert!(matches!(
            build_plan(config).unwrap_err(),
            DeployError::NothingToDeploy
        ));
    }

    #[test]
    fn cleanup_needs_no_pairs() {
        let config = NormalizedConfig {
            pairs: Vec::new(),
            overrides: ScalarOverrides {
                cleanup: Some(true),
                ..ScalarOverrides::default()
            },
        };
        let plan = build_plan(config).expect("plan");
        assert!(plan.options.cleanup);
        assert!(plan.pairs.is_empty());
    }

    #[test]
    fn valid_pairs_build_a_plan() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("A");
        std::fs::create_dir(&a).expect("mkdir");
        let config = NormalizedConfig {
            pairs: vec![DeploymentPair::from_paths([a], Vec::<String>::new())],
            overrides: ScalarOverrides {
                container: Some("web-7".into()),
                no_rebuild: Some(true),
                ..ScalarOverrides::default()
            },
        };
        let plan = build_plan(config).expect("plan");
        assert_eq!(plan.pairs.len(), 1);
        assert_eq!(plan.options.container, "web-7");
        assert!(plan.options.no_rebuild);
    }
}
