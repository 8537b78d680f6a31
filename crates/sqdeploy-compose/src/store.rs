//! Persisted mount state.
//!
//! The mount declaration lives in a docker-compose override document that
//! maps the service identifier to its `volumes:` list. [`MountStore`] hides
//! where that document lives so planning and writing can run against an
//! in-memory store in tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqdeploy_common::config::ServiceLayout;
use sqdeploy_common::constants::APP_NAME;
use sqdeploy_common::error::{DeployError, Result};
use sqdeploy_common::types::{MountBinding, MountDeclaration};

/// Load/save/remove access to the persisted mount declaration.
pub trait MountStore {
    /// Loads the persisted declaration.
    ///
    /// Returns `Ok(None)` when nothing is persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted state exists but cannot be read.
    fn load(&self) -> Result<Option<MountDeclaration>>;

    /// Replaces the persisted declaration in full.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration cannot be written.
    fn save(&self, declaration: &MountDeclaration) -> Result<()>;

    /// Removes the persisted declaration. Returns whether anything existed.
    ///
    /// # Errors
    ///
    /// Returns an error if existing state cannot be removed.
    fn remove(&self) -> Result<bool>;

    /// Human-readable location of the persisted state.
    fn location(&self) -> String;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OverrideDocument {
    #[serde(default)]
    services: BTreeMap<String, ServiceVolumes>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ServiceVolumes {
    #[serde(default)]
    volumes: Vec<String>,
}

/// Mount state stored as a docker-compose override file.
#[derive(Debug, Clone)]
pub struct OverrideFileStore {
    path: PathBuf,
    service: String,
}

impl OverrideFileStore {
    /// Creates a store for `service` backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            service: service.into(),
        }
    }

    /// Creates the store described by a service layout.
    #[must_use]
    pub fn from_layout(layout: &ServiceLayout) -> Self {
        Self::new(layout.override_path(), layout.service_name.clone())
    }

    /// Path of the override file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> DeployError {
        DeployError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn render(&self, declaration: &MountDeclaration) -> Result<String> {
        if let Some(bad) = declaration
            .bindings()
            .iter()
            .find(|b| b.host_path.contains(':') || b.container_path.contains(':'))
        {
            return Err(DeployError::Config {
                message: format!(
                    "cannot write bind for {} -> {}: paths must not contain ':'",
                    bad.host_path, bad.container_path
                ),
            });
        }
        let mut doc = OverrideDocument::default();
        let _ = doc.services.insert(
            self.service.clone(),
            ServiceVolumes {
                volumes: declaration.bindings().iter().map(ToString::to_string).collect(),
            },
        );
        let body = serde_yaml::to_string(&doc)?;
        Ok(format!(
            "# Generated by {APP_NAME}. Mounts are reconciled on every deploy.\n{body}"
        ))
    }
}

impl MountStore for OverrideFileStore {
    fn load(&self) -> Result<Option<MountDeclaration>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no override file");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let doc: OverrideDocument = serde_yaml::from_str(&content)?;
        let Some(service) = doc.services.get(&self.service) else {
            tracing::debug!(service = %self.service, "override file has no entry for service");
            return Ok(None);
        };
        let bindings = service
            .volumes
            .iter()
            .map(|v| MountBinding::parse(v))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            path = %self.path.display(),
            mounts = bindings.len(),
            "loaded override file"
        );
        Ok(Some(MountDeclaration::new(bindings)))
    }

    fn save(&self, declaration: &MountDeclaration) -> Result<()> {
        let rendered = self.render(declaration)?;
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| self.io_error(e))?;
        tmp.write_all(rendered.as_bytes())
            .map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        let _ = tmp
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        tracing::info!(
            path = %self.path.display(),
            mounts = declaration.len(),
            "wrote override file"
        );
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "removed override file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<Option<MountDeclaration>>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `declaration`.
    #[must_use]
    pub fn with(declaration: MountDeclaration) -> Self {
        Self {
            state: RefCell::new(Some(declaration)),
            fail_writes: false,
        }
    }

    /// Creates a store whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            state: RefCell::new(None),
            fail_writes: true,
        }
    }

    /// Returns a copy of the stored declaration.
    #[must_use]
    pub fn current(&self) -> Option<MountDeclaration> {
        self.state.borrow().clone()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            return Err(DeployError::Io {
                path: PathBuf::from(self.location()),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only store"),
            });
        }
        Ok(())
    }
}

impl MountStore for MemoryStore {
    fn load(&self) -> Result<Option<MountDeclaration>> {
        Ok(self.current())
    }

    fn save(&self, declaration: &MountDeclaration) -> Result<()> {
        self.check_writable()?;
        *self.state.borrow_mut() = Some(declaration.clone());
        Ok(())
    }

    fn remove(&self) -> Result<bool> {
        self.check_writable()?;
        Ok(self.state.borrow_mut().take().is_some())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
