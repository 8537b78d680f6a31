//! Domain primitive types used across the sqdeploy workspace.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};

/// Returns the last path segment after stripping trailing separators.
///
/// Returns `None` when the segment is empty, `.` or `..`, which can never
/// name a mount inside the server root.
#[must_use]
pub fn basename_of(path: &Path) -> Option<String> {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches('/');
    let name = trimmed.rsplit('/').next().unwrap_or_default();
    match name {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// A host directory holding assignment content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentRef {
    source_path: PathBuf,
}

impl AssignmentRef {
    /// Creates a reference from the path as given by the user.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    /// Returns the path as given by the user.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the in-container directory name, if the path has a usable one.
    #[must_use]
    pub fn basename(&self) -> Option<String> {
        basename_of(&self.source_path)
    }
}

impl fmt::Display for AssignmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_path.display())
    }
}

/// A host credentials file linked into assignment directories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PasswordFileRef {
    source_path: PathBuf,
}

impl PasswordFileRef {
    /// Creates a reference from the path as given by the user.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    /// Returns the path as given by the user.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the in-container file name, if the path has a usable one.
    #[must_use]
    pub fn basename(&self) -> Option<String> {
        basename_of(&self.source_path)
    }
}

impl fmt::Display for PasswordFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_path.display())
    }
}

/// A host configuration file replacing the service's default configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigOverrideRef {
    source_path: PathBuf,
}

impl ConfigOverrideRef {
    /// Creates a reference from the path as given by the user.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }

    /// Returns the path as given by the user.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }
}

impl fmt::Display for ConfigOverrideRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_path.display())
    }
}

/// Assignments together with the password files linked into each of them.
///
/// Password files of one pair are never linked into another pair's
/// assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPair {
    /// Assignment directories of this pair.
    pub assignments: Vec<AssignmentRef>,
    /// Password files linked into every assignment of this pair.
    pub password_files: Vec<PasswordFileRef>,
}

impl DeploymentPair {
    /// Creates a pair from raw path strings.
    #[must_use]
    pub fn from_paths<A, P>(assignments: A, password_files: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<PathBuf>,
        P: IntoIterator,
        P::Item: Into<PathBuf>,
    {
        Self {
            assignments: assignments.into_iter().map(AssignmentRef::new).collect(),
            password_files: password_files
                .into_iter()
                .map(PasswordFileRef::new)
                .collect(),
        }
    }

    /// Removes repeated refs while keeping first-seen order.
    pub fn dedup(&mut self) {
        dedup_in_order(&mut self.assignments);
        dedup_in_order(&mut self.password_files);
    }
}

fn dedup_in_order<T: PartialEq + Clone>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

/// One `host_path:container_path[:mode]` bind entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountBinding {
    /// Path on the host.
    pub host_path: String,
    /// Path inside the container.
    pub container_path: String,
    /// Optional mount mode suffix (`ro`, `rw`, ...), preserved verbatim.
    pub mode: Option<String>,
}

impl MountBinding {
    /// Creates a read-write binding.
    #[must_use]
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
            mode: None,
        }
    }

    /// Parses a compose bind string.
    ///
    /// # Errors
    ///
    /// Returns an error if either side of the bind is missing.
    pub fn parse(entry: &str) -> Result<Self> {
        let mut parts = entry.trim().splitn(3, ':');
        let host = parts.next().unwrap_or_default();
        let container = parts.next().unwrap_or_default();
        let mode = parts.next().filter(|m| !m.is_empty());
        if host.is_empty() || container.is_empty() {
            return Err(DeployError::Config {
                message: format!("malformed bind entry \"{entry}\": expected host:container"),
            });
        }
        Ok(Self {
            host_path: host.to_string(),
            container_path: container.to_string(),
            mode: mode.map(str::to_string),
        })
    }
}

impl fmt::Display for MountBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)?;
        if let Some(mode) = &self.mode {
            write!(f, ":{mode}")?;
        }
        Ok(())
    }
}

/// Ordered bind list for the service, unique by container path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountDeclaration {
    bindings: Vec<MountBinding>,
}

impl MountDeclaration {
    /// Creates a declaration from bindings, keeping the last binding for any
    /// repeated container path.
    #[must_use]
    pub fn new(bindings: Vec<MountBinding>) -> Self {
        let mut decl = Self::default();
        for binding in bindings {
            let _ = decl.replace(binding);
        }
        decl
    }

    /// Returns the bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[MountBinding] {
        &self.bindings
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns whether the declaration has no bindings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the binding targeting `container_path`, if any.
    #[must_use]
    pub fn find(&self, container_path: &str) -> Option<&MountBinding> {
        self.bindings
            .iter()
            .find(|b| b.container_path == container_path)
    }

    /// Returns whether any binding targets `container_path`.
    #[must_use]
    pub fn targets(&self, container_path: &str) -> bool {
        self.find(container_path).is_some()
    }

    /// Appends `binding` unless its container path is already taken.
    ///
    /// Returns `false` when the binding was skipped.
    pub fn insert(&mut self, binding: MountBinding) -> bool {
        if self.targets(&binding.container_path) {
            return false;
        }
        self.bindings.push(binding);
        true
    }

    /// Removes any binding with the same container path and appends
    /// `binding`, returning the removed one.
    pub fn replace(&mut self, binding: MountBinding) -> Option<MountBinding> {
        let previous = self
            .bindings
            .iter()
            .position(|b| b.container_path == binding.container_path)
            .map(|idx| self.bindings.remove(idx));
        self.bindings.push(binding);
        previous
    }

    /// Returns whether every binding targets `baseline_target`.
    #[must_use]
    pub fn only_targets(&self, baseline_target: &str) -> bool {
        self.bindings
            .iter()
            .all(|b| b.container_path == baseline_target)
    }
}

/// Category of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// A referenced host path does not exist.
    MissingPath,
    /// A referenced host path exists but has the wrong kind.
    WrongKind,
    /// A path has no usable last segment.
    InvalidBasename,
    /// Password files were discarded with a pair that lost all assignments.
    OrphanedPasswordFiles,
    /// A mount target was already declared.
    AlreadyMounted,
    /// A link pre-check failed inside the container.
    LinkPrecheck,
    /// The service reload signal failed.
    Reload,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPath => write!(f, "missing path"),
            Self::WrongKind => write!(f, "wrong kind"),
            Self::InvalidBasename => write!(f, "invalid name"),
            Self::OrphanedPasswordFiles => write!(f, "orphaned password files"),
            Self::AlreadyMounted => write!(f, "already mounted"),
            Self::LinkPrecheck => write!(f, "link skipped"),
            Self::Reload => write!(f, "reload failed"),
        }
    }
}

/// A recoverable problem reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Category of the problem.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

impl Warning {
    /// Creates a warning.
    #[must_use]
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
