//! # resume-operator
//!
//! Command-line front end for the resume operator: configuration, the
//! in-memory control plane used by `run`, and the offline `init`,
//! `generate` and `version` commands.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod control_plane;
pub mod error;

pub use config::{LogFormat, OperatorConfig};
pub use error::{ConfigError, ConfigResult};
