//! AQA Core
//!
//! Core types and decision logic for the AQA test runner.
//!
//! This crate contains:
//! - Domain types: run configuration, repository references, platform profile,
//!   pipeline results and log entries
//! - Errors: validation failures raised before any external work begins
//!
//! Nothing in here touches the filesystem, the network or child processes.

pub mod domain;
pub mod error;

pub use error::ConfigError;
