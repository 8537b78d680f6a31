//! # sqdeploy-compose
//!
//! Everything between raw deployment input and the persisted
//! docker-compose override file.
//!
//! - **Parser**: pair syntax and the three YAML shapes, normalized into one model.
//! - **Validator**: host filesystem checks, downgraded to warnings.
//! - **Plan**: validated pairs plus resolved run options.
//! - **Planner**: merges requested mounts into the persisted declaration.
//! - **Store** / **Writer**: persisted mount state and its atomic replacement.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod parser;
pub mod plan;
pub mod planner;
pub mod store;
pub mod validator;
pub mod writer;
