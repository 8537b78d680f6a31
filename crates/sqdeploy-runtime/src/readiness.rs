//! Bounded readiness polling.

use std::time::Duration;

use sqdeploy_common::constants::{READY_MAX_ATTEMPTS, READY_POLL_INTERVAL_SECS};
use sqdeploy_common::error::{DeployError, Result};

use crate::backend::ContainerRuntime;

/// How often and how long to poll for a running container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Pause between two polls.
    pub interval: Duration,
    /// Number of polls before giving up. Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(READY_POLL_INTERVAL_SECS),
            max_attempts: READY_MAX_ATTEMPTS,
        }
    }
}

impl ReadinessPolicy {
    /// A policy that never sleeps.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            interval: Duration::ZERO,
            max_attempts,
        }
    }
}

/// Returns whether a runtime status line reports a running container.
#[must_use]
pub fn is_running(status: &str) -> bool {
    status.trim_start().starts_with("Up")
}

/// Polls `container` until it reports a running state.
///
/// Returns the number of polls it took. A failing status query counts as
/// "not ready yet".
///
/// # Errors
///
/// Returns [`DeployError::ReadyTimeout`] once the attempts are exhausted.
pub fn wait_until_ready(
    runtime: &dyn ContainerRuntime,
    container: &str,
    policy: ReadinessPolicy,
) -> Result<u32> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        match runtime.status(container) {
            Ok(Some(status)) if is_running(&status) => {
                tracing::info!(container, attempt, %status, "container is ready");
                return Ok(attempt);
            }
            Ok(status) => {
                tracing::debug!(container, attempt, ?status, "container not ready");
            }
            Err(e) => {
                tracing::debug!(container, attempt, error = %e, "status query failed");
            }
        }
        if attempt < attempts && !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
    }
    tracing::warn!(container, attempts, "container never became ready");
    Err(DeployError::ReadyTimeout {
        container: container.to_string(),
        attempts,
    })
}
