//! Run configuration
//!
//! The host task hands over a set of named string inputs. They are validated
//! once and turned into an immutable `RunConfiguration` that every later
//! stage reads from.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::domain::repo::RepoBranch;
use crate::error::ConfigError;

/// Where the JDK under test comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JdkSource {
    /// Preinstalled JDK found through `JAVA_HOME`
    Upstream,
    /// JDK provided by the hosted runner image
    GithubHosted,
    /// JDK installed by the AdoptOpenJDK install-jdk step
    InstallJdk,
    /// Nightly build fetched by the harness
    Nightly,
    /// Build fetched by the harness from a custom URL
    Customized,
}

impl JdkSource {
    pub const ALL: [JdkSource; 5] = [
        JdkSource::Upstream,
        JdkSource::GithubHosted,
        JdkSource::InstallJdk,
        JdkSource::Nightly,
        JdkSource::Customized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JdkSource::Upstream => "upstream",
            JdkSource::GithubHosted => "github-hosted",
            JdkSource::InstallJdk => "install-jdk",
            JdkSource::Nightly => "nightly",
            JdkSource::Customized => "customized",
        }
    }

    /// Whether the JDK is looked up in the host environment
    pub fn resolves_from_env(&self) -> bool {
        matches!(
            self,
            JdkSource::Upstream | JdkSource::GithubHosted | JdkSource::InstallJdk
        )
    }

    /// Whether a JDK version must be supplied with this source
    pub fn requires_version(&self) -> bool {
        matches!(self, JdkSource::GithubHosted | JdkSource::InstallJdk)
    }
}

impl FromStr for JdkSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidJdkSource(s.to_string()))
    }
}

impl std::fmt::Display for JdkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test build list selector
///
/// Either `openjdk` or a path under one of the known roots, such as
/// `functional` or `system/sanity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildList(String);

impl BuildList {
    const ROOTS: [&'static str; 4] = ["external", "functional", "perf", "system"];

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        if value == "openjdk" || Self::ROOTS.iter().any(|root| value.starts_with(root)) {
            Ok(Self(value.to_string()))
        } else {
            Err(ConfigError::InvalidBuildList(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether system tests are selected, which need extra dependencies
    pub fn includes_system(&self) -> bool {
        self.0.contains("system")
    }
}

impl TryFrom<String> for BuildList {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BuildList> for String {
    fn from(value: BuildList) -> Self {
        value.0
    }
}

impl std::fmt::Display for BuildList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Third-party test suites layered on top of the harness
///
/// Values are passed through to the fetch script untouched; multiple
/// entries are comma separated by convention of the harness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorTestParams {
    pub repos: String,
    pub branches: String,
    pub dirs: String,
    pub shas: String,
}

impl VendorTestParams {
    /// Fetch script arguments, one flag/value pair per non-empty field
    pub fn to_args(&self) -> Vec<String> {
        [
            ("--vendor_repos", &self.repos),
            ("--vendor_branches", &self.branches),
            ("--vendor_dirs", &self.dirs),
            ("--vendor_shas", &self.shas),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .flat_map(|(flag, value)| [flag.to_string(), value.clone()])
        .collect()
    }
}

/// Raw task inputs as supplied by the host task
///
/// Every field is a plain string and empty means "not supplied".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInputs {
    pub jdksource: String,
    pub customized_sdk_url: String,
    pub sdkdir: String,
    pub version: String,
    pub build_list: String,
    pub target: String,
    pub custom_target: String,
    pub aqa_tests_repo: String,
    pub aqa_systemtests_repo: String,
    pub openj9_repo: String,
    pub tkg_repo: String,
    pub vendor_test_repos: String,
    pub vendor_test_branches: String,
    pub vendor_test_dirs: String,
    pub vendor_test_shas: String,
}

/// Validated, immutable configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfiguration {
    pub jdk_source: JdkSource,
    /// JDK version, may be empty for sources that do not need it
    pub version: String,
    pub customized_sdk_url: Option<String>,
    /// Directory the harness downloads SDKs into
    pub sdk_dir: String,
    pub build_list: BuildList,
    /// make target, e.g. `_jdk_custom` or `_sanity.openjdk`
    pub target: String,
    pub custom_target: Option<String>,
    /// Harness repository, defaulted when not given
    pub aqa_tests: RepoBranch,
    pub aqa_systemtests: Option<RepoBranch>,
    pub openj9: Option<RepoBranch>,
    pub tkg: Option<RepoBranch>,
    pub vendor: VendorTestParams,
}

impl RunConfiguration {
    /// Validates raw inputs
    ///
    /// # Arguments
    /// * `inputs` - Raw task inputs
    /// * `default_sdk_dir` - Used when `sdkdir` is empty
    ///
    /// # Returns
    /// The first validation failure, checked in the order jdksource,
    /// build_list, version, target
    pub fn from_inputs(inputs: RawInputs, default_sdk_dir: &Path) -> Result<Self, ConfigError> {
        let jdk_source: JdkSource = inputs.jdksource.parse()?;
        let build_list = BuildList::parse(&inputs.build_list)?;

        if jdk_source.requires_version() && inputs.version.is_empty() {
            return Err(ConfigError::MissingVersion);
        }

        if inputs.target.is_empty() {
            return Err(ConfigError::MissingTarget);
        }

        let sdk_dir = if inputs.sdkdir.is_empty() {
            default_sdk_dir.to_string_lossy().to_string()
        } else {
            inputs.sdkdir
        };

        Ok(Self {
            jdk_source,
            version: inputs.version,
            customized_sdk_url: non_empty(inputs.customized_sdk_url),
            sdk_dir,
            build_list,
            target: inputs.target,
            custom_target: non_empty(inputs.custom_target),
            aqa_tests: RepoBranch::parse_or_default(&inputs.aqa_tests_repo),
            aqa_systemtests: RepoBranch::parse_optional(&inputs.aqa_systemtests_repo),
            openj9: RepoBranch::parse_optional(&inputs.openj9_repo),
            tkg: RepoBranch::parse_optional(&inputs.tkg_repo),
            vendor: VendorTestParams {
                repos: inputs.vendor_test_repos,
                branches: inputs.vendor_test_branches,
                dirs: inputs.vendor_test_dirs,
                shas: inputs.vendor_test_shas,
            },
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
