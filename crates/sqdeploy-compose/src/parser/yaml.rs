//! Typed views of the YAML deployment document shapes.
//!
//! Three shapes are accepted:
//!
//! ```yaml
//! # mapping: assignment -> password files
//! assignments:
//!   tree: [users.pass, admins.pass]
//!   graphs: users.pass
//!
//! # grouped: explicit pairs
//! deployments:
//!   - assignments: [tree, graphs]
//!     password_files: [users.pass]
//!
//! # list: bare top-level sequence
//! - assignment: tree
//!   password_files: users.pass
//! ```

use serde::Deserialize;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::DeploymentPair;

use super::model::ScalarOverrides;

/// A YAML value that is either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A scalar, coerced to a single-element list.
    One(String),
    /// A list of names.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Returns the trimmed, non-empty names.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn names(value: Option<OneOrMany>) -> Vec<String> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

/// One entry of a `deployments:` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupEntry {
    /// Assignments of the pair.
    pub assignments: Option<OneOrMany>,
    /// Password files of the pair.
    pub password_files: Option<OneOrMany>,
}

impl GroupEntry {
    /// Converts the entry into a pair.
    #[must_use]
    pub fn into_pair(self) -> DeploymentPair {
        DeploymentPair::from_paths(names(self.assignments), names(self.password_files))
    }
}

/// One entry of a bare top-level list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListEntry {
    /// Assignment (or assignments) of the pair.
    #[serde(alias = "assignments")]
    pub assignment: Option<OneOrMany>,
    /// Password files of the pair.
    pub password_files: Option<OneOrMany>,
}

impl ListEntry {
    /// Converts the entry into a pair.
    #[must_use]
    pub fn into_pair(self) -> DeploymentPair {
        DeploymentPair::from_paths(names(self.assignment), names(self.password_files))
    }
}

/// A top-level YAML mapping: either shape plus scalar keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingDocument {
    /// `assignments:` key of the mapping shape.
    pub assignments: Option<serde_yaml::Value>,
    /// `deployments:` key of the grouped shape.
    pub deployments: Option<Vec<GroupEntry>>,
    /// Scalar keys next to the pairs.
    #[serde(flatten)]
    pub overrides: ScalarOverrides,
}

/// Decodes the value of an `assignments:` key into `(assignment, password files)`
/// entries, in document order.
///
/// A mapping yields one entry per key. A string or list yields one entry per
/// assignment without password files.
///
/// # Errors
///
/// Returns an error if the value has an unsupported type.
pub fn decode_assignment_map(value: serde_yaml::Value) -> Result<Vec<(String, Vec<String>)>> {
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, passes) in map {
                let name = match key {
                    serde_yaml::Value::String(s) => s,
                    other => {
                        return Err(DeployError::Config {
                            message: format!("assignment name must be a string, got {other:?}"),
                        });
                    }
                };
                let passes: Option<OneOrMany> = serde_yaml::from_value(passes)?;
                entries.push((name, names(passes)));
            }
            Ok(entries)
        }
        other @ (serde_yaml::Value::String(_) | serde_yaml::Value::Sequence(_)) => {
            let list: OneOrMany = serde_yaml::from_value(other)?;
            Ok(list.into_vec().into_iter().map(|a| (a, Vec::new())).collect())
        }
        other => Err(DeployError::Config {
            message: format!("`assignments` must be a mapping or a list, got {other:?}"),
        }),
    }
}
