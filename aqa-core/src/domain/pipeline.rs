//! Pipeline domain types
//!
//! The harness is driven through `make`. This module derives the target
//! invocation and interprets what the harness printed.

use serde::{Deserialize, Serialize};

/// Marker the harness prints when at least one test target failed
pub const FAILURE_MARKER: &str = "FAILED test targets";

/// Whether `target` selects a custom target that takes an extra option
pub fn is_custom_target(target: &str) -> bool {
    target.contains("custom")
}

/// Builds the `<NAME>_TARGET=<value>` option for a custom target
///
/// The name is the target uppercased, with a leading non-alphanumeric
/// marker removed: `_jdk_custom` gives `JDK_CUSTOM_TARGET`.
///
/// A target that starts with a letter keeps it (`customtarget` gives
/// `CUSTOMTARGET_TARGET`). The GitHub action always dropped the first
/// character, which turned such targets into `USTOMTARGET_TARGET`.
pub fn custom_target_option(target: &str, custom_target: &str) -> String {
    let name = match target.chars().next() {
        Some(first) if !first.is_alphanumeric() => &target[first.len_utf8()..],
        _ => target,
    };
    format!("{}_TARGET={}", name.to_uppercase(), custom_target)
}

/// Verdict for a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Clean exit and no failure marker
    Success,
    /// The harness reported failed test targets
    TestFailuresDetected,
    /// make failed without reporting test failures
    ProcessError,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Success => write!(f, "success"),
            Verdict::TestFailuresDetected => write!(f, "test failures detected"),
            Verdict::ProcessError => write!(f, "process error"),
        }
    }
}

/// Outcome of the test target invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Captured stdout and stderr of the target run
    pub output: String,
    /// Exit code, `None` when the process could not be run or was killed
    pub exit_code: Option<i32>,
    pub verdict: Verdict,
}

impl PipelineResult {
    /// Classifies captured output
    ///
    /// The failure marker wins over the exit status.
    pub fn classify(output: String, exit_code: Option<i32>) -> Self {
        let verdict = if output.contains(FAILURE_MARKER) {
            Verdict::TestFailuresDetected
        } else if exit_code == Some(0) {
            Verdict::Success
        } else {
            Verdict::ProcessError
        };

        Self {
            output,
            exit_code,
            verdict,
        }
    }

    /// Converts the verdict into the signal reported to the host task
    pub fn outcome(&self) -> RunOutcome {
        match self.verdict {
            Verdict::Success => RunOutcome::succeeded(),
            Verdict::TestFailuresDetected => RunOutcome::failed("There are failed tests"),
            Verdict::ProcessError => RunOutcome {
                result: TaskResult::SucceededWithIssues,
                message: None,
            },
        }
    }
}

/// Terminal result reported to the host task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskResult {
    Succeeded,
    /// Finished, but errors were logged along the way
    SucceededWithIssues,
    Failed,
}

impl std::fmt::Display for TaskResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskResult::Succeeded => write!(f, "Succeeded"),
            TaskResult::SucceededWithIssues => write!(f, "SucceededWithIssues"),
            TaskResult::Failed => write!(f, "Failed"),
        }
    }
}

/// Exactly one of these is produced per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub result: TaskResult,
    pub message: Option<String>,
}

impl RunOutcome {
    pub fn succeeded() -> Self {
        Self {
            result: TaskResult::Succeeded,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: TaskResult::Failed,
            message: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.result == TaskResult::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_target_option() {
        assert_eq!(
            custom_target_option("customtarget", "MyOption"),
            "CUSTOMTARGET_TARGET=MyOption"
        );
        assert_eq!(
            custom_target_option("_jdk_custom", "java/lang/Math"),
            "JDK_CUSTOM_TARGET=java/lang/Math"
        );
        assert_eq!(
            custom_target_option("-system_custom", "-test=Mini"),
            "SYSTEM_CUSTOM_TARGET=-test=Mini"
        );
    }

    #[test]
    fn test_is_custom_target() {
        assert!(is_custom_target("_jdk_custom"));
        assert!(is_custom_target("customtarget"));
        assert!(!is_custom_target("_sanity.openjdk"));
    }

    #[test]
    fn test_classify_success() {
        let result = PipelineResult::classify("ALL TESTS PASSED".to_string(), Some(0));
        assert_eq!(result.verdict, Verdict::Success);
        assert_eq!(result.outcome(), RunOutcome::succeeded());
    }

    #[test]
    fn test_marker_wins_over_exit_status() {
        let output = "...\nFAILED test targets:\n\tjdk_math_0\n".to_string();

        let clean_exit = PipelineResult::classify(output.clone(), Some(0));
        assert_eq!(clean_exit.verdict, Verdict::TestFailuresDetected);

        let bad_exit = PipelineResult::classify(output, Some(2));
        assert_eq!(bad_exit.verdict, Verdict::TestFailuresDetected);

        let outcome = bad_exit.outcome();
        assert!(outcome.is_failure());
        assert_eq!(outcome.message.as_deref(), Some("There are failed tests"));
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        let result = PipelineResult::classify("failed test targets".to_string(), Some(0));
        assert_eq!(result.verdict, Verdict::Success);
    }

    #[test]
    fn test_process_error() {
        let result = PipelineResult::classify("make: *** No rule".to_string(), Some(2));
        assert_eq!(result.verdict, Verdict::ProcessError);
        assert_eq!(result.outcome().result, TaskResult::SucceededWithIssues);
        assert!(!result.outcome().is_failure());

        let not_run = PipelineResult::classify(String::new(), None);
        assert_eq!(not_run.verdict, Verdict::ProcessError);
    }
}
