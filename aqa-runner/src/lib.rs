//! AQA Runner
//!
//! Prepares a host for the AQA test harness and drives one test run:
//! - Configuration: runner settings from the environment
//! - Context: platform profile, execution environment and log buffer
//! - Services: provisioning, JDK location, source acquisition, make
//! - Orchestrator: stage sequencing and the final report

pub mod config;
pub mod context;
pub mod download;
pub mod environment;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod service;

#[cfg(test)]
mod testing;

pub use context::Context;
pub use orchestrator::{Orchestrator, RunReport};
