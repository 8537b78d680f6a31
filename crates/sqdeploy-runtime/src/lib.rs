//! Runtime driver for sqdeploy.
//!
//! Takes a validated deployment plan, commits its mounts, and drives the
//! container runtime through start, readiness, linking, permission fixup
//! and reload.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod driver;
pub mod exec;
pub mod identity;
pub mod pipeline;
pub mod readiness;
