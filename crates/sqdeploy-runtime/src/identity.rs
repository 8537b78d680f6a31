//! Host identity used for ownership fixup inside the container.

use std::fmt;

/// Numeric user and group of the invoking host user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostIdentity {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

impl HostIdentity {
    /// Returns the operator's uid and gid.
    ///
    /// Under `sudo` the real ids are root's, so `SUDO_UID` and `SUDO_GID`
    /// name the operator instead.
    #[must_use]
    pub fn current() -> Self {
        let real = Self {
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
        };
        real.or_sudo_caller(
            std::env::var("SUDO_UID").ok().as_deref(),
            std::env::var("SUDO_GID").ok().as_deref(),
        )
    }

    /// Replaces a root identity with the sudo caller's, when both ids are
    /// present and numeric.
    #[must_use]
    pub fn or_sudo_caller(self, sudo_uid: Option<&str>, sudo_gid: Option<&str>) -> Self {
        if self.uid != 0 {
            return self;
        }
        let parsed = sudo_uid
            .and_then(|u| u.trim().parse().ok())
            .zip(sudo_gid.and_then(|g| g.trim().parse().ok()));
        match parsed {
            Some((uid, gid)) => {
                tracing::debug!(uid, gid, "running under sudo, using caller identity");
                Self { uid, gid }
            }
            None => self,
        }
    }
}

impl fmt::Display for HostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: HostIdentity = HostIdentity { uid: 0, gid: 0 };

    #[test]
    fn displays_as_chown_owner() {
        let id = HostIdentity { uid: 1000, gid: 100 };
        assert_eq!(id.to_string(), "1000:100");
    }

    #[test]
    fn sudo_caller_replaces_root() {
        let id = ROOT.or_sudo_caller(Some("1000"), Some("100"));
        assert_eq!(id, HostIdentity { uid: 1000, gid: 100 });
    }

    #[test]
    fn sudo_variables_ignored_for_regular_users() {
        let user = HostIdentity { uid: 1001, gid: 1001 };
        assert_eq!(user.or_sudo_caller(Some("1000"), Some("100")), user);
    }

    #[test]
    fn partial_or_garbled_sudo_variables_keep_root() {
        assert_eq!(ROOT.or_sudo_caller(Some("1000"), None), ROOT);
        assert_eq!(ROOT.or_sudo_caller(Some("alice"), Some("100")), ROOT);
        assert_eq!(ROOT.or_sudo_caller(None, None), ROOT);
    }
}
