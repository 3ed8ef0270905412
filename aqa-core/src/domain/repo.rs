//! Repository references
//!
//! Task inputs name repositories as `owner/repo:branch`. This module turns
//! those strings into a structured pair and knows the default harness location.

use serde::{Deserialize, Serialize};

/// Repository used when no harness repository is given
pub const DEFAULT_TEST_REPO: &str = "adoptium/aqa-tests";

/// Branch used when no harness repository is given
pub const DEFAULT_TEST_BRANCH: &str = "master";

/// A repository identifier and branch name
///
/// No validation is performed on either half: a malformed reference turns
/// into a malformed clone URL and fails at the clone step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoBranch {
    /// `owner/repo` identifier on GitHub
    pub repo: String,
    /// Branch name, empty when the reference had no `:branch` part
    pub branch: String,
}

impl RepoBranch {
    /// Parses an `owner/repo:branch` reference
    ///
    /// All whitespace is removed first, then the string is split on the
    /// first `:`.
    pub fn parse(input: &str) -> Self {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        match compact.split_once(':') {
            Some((repo, branch)) => Self {
                repo: repo.to_string(),
                branch: branch.to_string(),
            },
            None => Self {
                repo: compact,
                branch: String::new(),
            },
        }
    }

    /// Parses `input`, or returns `None` when the input is empty
    pub fn parse_optional(input: &str) -> Option<Self> {
        if input.is_empty() {
            None
        } else {
            Some(Self::parse(input))
        }
    }

    /// Parses `input`, falling back to the default harness repository when empty
    pub fn parse_or_default(input: &str) -> Self {
        Self::parse_optional(input).unwrap_or_default()
    }

    /// HTTPS clone URL on GitHub
    pub fn github_url(&self) -> String {
        format!("https://github.com/{}.git", self.repo)
    }
}

impl Default for RepoBranch {
    fn default() -> Self {
        Self {
            repo: DEFAULT_TEST_REPO.to_string(),
            branch: DEFAULT_TEST_BRANCH.to_string(),
        }
    }
}

impl std::fmt::Display for RepoBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repo, self.branch)
    }
}
