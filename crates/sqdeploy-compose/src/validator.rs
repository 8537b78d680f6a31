//! Filesystem validation of deployment pairs.
//!
//! Refs that do not exist on the host, have the wrong kind, or have no
//! usable basename are dropped with a [`Warning`]. Nothing here fails the
//! run; the caller decides what an empty result means.
//!
//! A `:` anywhere in the absolute host path is rejected too: compose bind
//! entries are `host:container[:mode]` and cannot carry one.

use std::path::Path;

use sqdeploy_common::types::{
    AssignmentRef, ConfigOverrideRef, DeploymentPair, PasswordFileRef, Warning, WarningKind,
};

/// Pairs and config override that survived validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validated {
    /// Pairs with at least one valid assignment.
    pub pairs: Vec<DeploymentPair>,
    /// Config override, if one was requested and is a regular file.
    pub config_file: Option<ConfigOverrideRef>,
    /// Everything that was dropped, and why.
    pub warnings: Vec<Warning>,
}

impl Validated {
    /// Returns whether no pair survived validation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Expected {
    Directory,
    File,
}

impl Expected {
    const fn noun(self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::File => "regular file",
        }
    }
}

fn check_path(
    path: &Path,
    basename: Option<&str>,
    label: &str,
    expected: Expected,
) -> Result<(), Warning> {
    if basename.is_none() {
        return Err(Warning::new(
            WarningKind::InvalidBasename,
            format!("{label} '{}' has no usable name", path.display()),
        ));
    }
    let host = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if host.to_string_lossy().contains(':') {
        return Err(Warning::new(
            WarningKind::InvalidBasename,
            format!(
                "{label} '{}' contains ':', which a bind mount cannot express",
                host.display()
            ),
        ));
    }
    let Ok(meta) = std::fs::metadata(path) else {
        return Err(Warning::new(
            WarningKind::MissingPath,
            format!("{label} '{}' does not exist", path.display()),
        ));
    };
    let kind_ok = match expected {
        Expected::Directory => meta.is_dir(),
        Expected::File => meta.is_file(),
    };
    if kind_ok {
        Ok(())
    } else {
        Err(Warning::new(
            WarningKind::WrongKind,
            format!("{label} '{}' is not a {}", path.display(), expected.noun()),
        ))
    }
}

fn report(warning: Warning, warnings: &mut Vec<Warning>) {
    tracing::warn!(kind = %warning.kind, "{}", warning.message);
    warnings.push(warning);
}

fn valid_assignment(assignment: &AssignmentRef, warnings: &mut Vec<Warning>) -> bool {
    let name = assignment.basename();
    match check_path(
        assignment.source_path(),
        name.as_deref(),
        "assignment",
        Expected::Directory,
    ) {
        Ok(()) => true,
        Err(w) => {
            report(w, warnings);
            false
        }
    }
}

fn valid_password_file(file: &PasswordFileRef, warnings: &mut Vec<Warning>) -> bool {
    let name = file.basename();
    match check_path(
        file.source_path(),
        name.as_deref(),
        "password file",
        Expected::File,
    ) {
        Ok(()) => true,
        Err(w) => {
            report(w, warnings);
            false
        }
    }
}

/// Validates every pair and the optional config override against the host
/// filesystem.
///
/// A pair whose assignments are all invalid is dropped together with its
/// password files. A pair may keep its assignments while losing every
/// password file.
#[must_use]
pub fn validate(pairs: Vec<DeploymentPair>, config_file: Option<ConfigOverrideRef>) -> Validated {
    tracing::info!(pairs = pairs.len(), "validating deployment pairs");
    let mut out = Validated::default();

    for mut pair in pairs {
        pair.dedup();
        pair.assignments
            .retain(|a| valid_assignment(a, &mut out.warnings));
        if pair.assignments.is_empty() {
            if !pair.password_files.is_empty() {
                let names: Vec<String> =
                    pair.password_files.iter().map(ToString::to_string).collect();
                report(
                    Warning::new(
                        WarningKind::OrphanedPasswordFiles,
                        format!(
                            "discarding password files [{}]: their pair has no valid assignment",
                            names.join(", ")
                        ),
                    ),
                    &mut out.warnings,
                );
            }
            continue;
        }
        pair.password_files
            .retain(|p| valid_password_file(p, &mut out.warnings));
        out.pairs.push(pair);
    }

    out.config_file = config_file.filter(|cfg| {
        match check_path(cfg.source_path(), Some("config"), "config file", Expected::File) {
            Ok(()) => true,
            Err(w) => {
                report(w, &mut out.warnings);
                false
            }
        }
    });

    tracing::info!(
        pairs = out.pairs.len(),
        dropped = out.warnings.len(),
        "validation finished"
    );
    out
}
