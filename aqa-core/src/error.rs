//! Error types for run configuration

use thiserror::Error;

/// Invalid or missing task input
///
/// Raised while turning raw task inputs into a `RunConfiguration`, before
/// any provisioning, fetching or building takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// jdksource is not one of the known kinds
    #[error(
        "jdksource should be one of [upstream, github-hosted, install-jdk, nightly, customized]. Found: {0}"
    )]
    InvalidJdkSource(String),

    /// build_list is neither `openjdk` nor below one of the known roots
    #[error(
        "buildList should be one of or sub dir of [openjdk, external, functional, system, perf]. Found: {0}"
    )]
    InvalidBuildList(String),

    /// The JDK source needs a version to find the JDK
    #[error(
        "Please provide jdkversion if jdksource is github-hosted installed or AdoptOpenJDK/install-jdk installed."
    )]
    MissingVersion,

    /// No make target was given
    #[error("target cannot be empty")]
    MissingTarget,
}
