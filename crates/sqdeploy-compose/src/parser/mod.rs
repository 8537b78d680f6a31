//! Deployment input normalization.
//!
//! Every accepted input shape is a [`ConfigSource`] variant with its own
//! decoder; all of them normalize into one [`NormalizedConfig`].

pub mod model;
pub mod pairs;
pub mod yaml;

use std::path::Path;

use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::DeploymentPair;

use self::model::{NormalizedConfig, ScalarOverrides};
use self::yaml::{GroupEntry, ListEntry, MappingDocument};

/// A deployment input in one of its accepted shapes.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Inline `assign1,assign2:pass1,pass2` tokens.
    PairSyntax(Vec<String>),
    /// `assignments: {name: [pass, ...]}` document.
    MappingYaml {
        /// `(assignment, password files)` entries in document order.
        assignments: Vec<(String, Vec<String>)>,
        /// Scalar keys of the document.
        overrides: ScalarOverrides,
    },
    /// `deployments: [{assignments, password_files}, ...]` document.
    GroupedYaml {
        /// Pair groups in document order.
        deployments: Vec<GroupEntry>,
        /// Scalar keys of the document.
        overrides: ScalarOverrides,
    },
    /// Bare top-level list of `{assignment, password_files}` objects.
    ListYaml(Vec<ListEntry>),
    /// A YAML document of no recognized shape; yields no pairs.
    Unrecognized,
}

impl ConfigSource {
    /// Detects the shape of a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML, or if a recognized
    /// shape carries values of the wrong type.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::Unrecognized);
        }
        let value: serde_yaml::Value = serde_yaml::from_str(input)?;
        Self::from_yaml_value(value)
    }

    /// Detects the shape of an already-parsed YAML value.
    ///
    /// # Errors
    ///
    /// Returns an error if a recognized shape carries values of the wrong type.
    pub fn from_yaml_value(value: serde_yaml::Value) -> Result<Self> {
        if value.is_mapping() {
            let doc: MappingDocument = serde_yaml::from_value(value)?;
            return Self::from_mapping(doc);
        }
        let is_object_list = value
            .as_sequence()
            .is_some_and(|items| items.iter().all(serde_yaml::Value::is_mapping));
        if is_object_list {
            return Ok(Self::ListYaml(serde_yaml::from_value(value)?));
        }
        tracing::warn!(kind = yaml_kind(&value), "unrecognized deployment document shape");
        Ok(Self::Unrecognized)
    }

    fn from_mapping(doc: MappingDocument) -> Result<Self> {
        if let Some(deployments) = doc.deployments {
            if doc.assignments.is_some() {
                tracing::warn!("both `deployments` and `assignments` present, using `deployments`");
            }
            return Ok(Self::GroupedYaml {
                deployments,
                overrides: doc.overrides,
            });
        }
        let assignments = doc
            .assignments
            .map(yaml::decode_assignment_map)
            .transpose()?
            .unwrap_or_default();
        Ok(Self::MappingYaml {
            assignments,
            overrides: doc.overrides,
        })
    }

    /// Converts the source into the canonical model.
    #[must_use]
    pub fn normalize(self) -> NormalizedConfig {
        match self {
            Self::PairSyntax(tokens) => NormalizedConfig {
                pairs: pairs::parse_pairs(&tokens),
                overrides: ScalarOverrides::default(),
            },
            Self::MappingYaml {
                assignments,
                overrides,
            } => NormalizedConfig {
                pairs: assignments
                    .into_iter()
                    .map(|(assignment, passes)| DeploymentPair::from_paths([assignment], passes))
                    .collect(),
                overrides,
            },
            Self::GroupedYaml {
                deployments,
                overrides,
            } => NormalizedConfig {
                pairs: non_empty(deployments.into_iter().map(GroupEntry::into_pair)),
                overrides,
            },
            Self::ListYaml(entries) => NormalizedConfig {
                pairs: non_empty(entries.into_iter().map(ListEntry::into_pair)),
                overrides: ScalarOverrides::default(),
            },
            Self::Unrecognized => NormalizedConfig::default(),
        }
    }
}

fn non_empty(pairs: impl Iterator<Item = DeploymentPair>) -> Vec<DeploymentPair> {
    pairs
        .filter(|pair| {
            if pair.assignments.is_empty() {
                tracing::warn!(
                    password_files = pair.password_files.len(),
                    "deployment entry has no assignments, ignoring"
                );
                false
            } else {
                true
            }
        })
        .collect()
}

const fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "list",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged",
    }
}

/// Normalizes inline pair tokens.
#[must_use]
pub fn normalize_pairs<S: AsRef<str>>(tokens: &[S]) -> NormalizedConfig {
    ConfigSource::PairSyntax(tokens.iter().map(|t| t.as_ref().to_string()).collect()).normalize()
}

/// Normalizes a YAML deployment document.
///
/// # Errors
///
/// Returns an error if the document is not valid YAML or a recognized
/// shape is malformed. An unrecognized shape yields an empty model.
pub fn normalize_yaml(input: &str) -> Result<NormalizedConfig> {
    Ok(ConfigSource::from_yaml_str(input)?.normalize())
}

/// Reads and normalizes a YAML deployment file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to normalize.
pub fn load_yaml_file(path: &Path) -> Result<NormalizedConfig> {
    tracing::info!(path = %path.display(), "loading deployment file");
    let content = std::fs::read_to_string(path).map_err(|e| DeployError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    normalize_yaml(&content)
}
