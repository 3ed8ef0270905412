//! Core domain types
//!
//! This module contains the structures shared by every stage of a test run.
//! They are created by the runner (configuration, platform profile) and
//! reported back to the host task (pipeline result, outcome, logs).

pub mod config;
pub mod log;
pub mod pipeline;
pub mod platform;
pub mod properties;
pub mod repo;
