//! Pipeline executor
//!
//! Compiles the harness with `make compile` and runs the requested make
//! target, classifying the outcome from the target's output.

use aqa_core::domain::config::RunConfiguration;
use aqa_core::domain::pipeline::{PipelineResult, custom_target_option, is_custom_target};
use std::path::Path;
use std::sync::Arc;

use crate::context::Context;
use crate::error::RunError;
use crate::process::{CommandRunner, CommandSpec};

/// Directory of the harness makefiles
const TKG_DIR: &str = "TKG";

/// Builds `make <target> [OPTION=value]`
pub fn target_command(ctx: &Context, config: &RunConfiguration, tkg_dir: &Path) -> CommandSpec {
    let mut spec = ctx.command("make").arg(config.target.as_str());

    if is_custom_target(&config.target) {
        if let Some(custom) = &config.custom_target {
            spec = spec.arg(custom_target_option(&config.target, custom));
        }
    }

    spec.current_dir(tkg_dir)
}

/// Runs the harness build and the selected target
pub struct PipelineExecutor {
    runner: Arc<dyn CommandRunner>,
}

impl PipelineExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Compiles the harness and runs the target
    ///
    /// A failing `make compile` is logged and the target still runs. The
    /// target's exit code only matters when its output has no failure
    /// marker.
    pub async fn run(
        &self,
        ctx: &mut Context,
        config: &RunConfiguration,
        harness_dir: &Path,
    ) -> PipelineResult {
        let tkg_dir = harness_dir.join(TKG_DIR);

        let compile = ctx.command("make").arg("compile").current_dir(&tkg_dir);
        ctx.log_info(format!("Running {}", compile));
        if let Err(e) = self.run_checked(&compile).await {
            ctx.log_error(RunError::Build(e).to_string());
        }

        let target = target_command(ctx, config, &tkg_dir);
        ctx.log_info(format!("Running {}", target));

        let (output, exit_code) = match self.runner.run(&target).await {
            Ok(result) => {
                if !result.success() {
                    ctx.log_error(format!(
                        "'{}' exited with code {:?}",
                        target, result.exit_code
                    ));
                }
                (result.output, result.exit_code)
            }
            Err(e) => {
                ctx.log_error(format!("{:#}", e));
                (String::new(), None)
            }
        };

        let result = PipelineResult::classify(output, exit_code);
        ctx.log_info(format!("Pipeline verdict: {:?}", result.verdict));
        result
    }

    async fn run_checked(&self, spec: &CommandSpec) -> anyhow::Result<()> {
        self.runner.run(spec).await?.ensure_success(spec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::HostEnv;
    use crate::testing::{FakeRunner, exit, linux_context, ok};
    use aqa_core::domain::config::RawInputs;
    use aqa_core::domain::log::LogLevel;
    use aqa_core::domain::pipeline::Verdict;

    fn config(target: &str, custom_target: &str) -> RunConfiguration {
        RunConfiguration::from_inputs(
            RawInputs {
                jdksource: "nightly".to_string(),
                build_list: "openjdk".to_string(),
                target: target.to_string(),
                custom_target: custom_target.to_string(),
                ..Default::default()
            },
            Path::new("/work"),
        )
        .unwrap()
    }

    #[test]
    fn test_target_command_custom_option() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = linux_context(dir.path(), HostEnv::default());
        let tkg = Path::new("/work/aqa-tests/TKG");

        let spec = target_command(&ctx, &config("_jdk_custom", "java/lang/Math"), tkg);
        assert_eq!(spec.to_string(), "make _jdk_custom JDK_CUSTOM_TARGET=java/lang/Math");
        assert_eq!(spec.cwd.as_deref(), Some(tkg));

        let spec = target_command(&ctx, &config("_sanity.openjdk", "java/lang/Math"), tkg);
        assert_eq!(spec.to_string(), "make _sanity.openjdk");

        let spec = target_command(&ctx, &config("_jdk_custom", ""), tkg);
        assert_eq!(spec.to_string(), "make _jdk_custom");
    }

    #[tokio::test]
    async fn test_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|_| ok("TEST TARGETS SUMMARY\nPASSED: 10")));
        let executor = PipelineExecutor::new(runner.clone());

        let harness = ctx.harness_dir();
        let result = executor.run(&mut ctx, &config("_sanity.openjdk", ""), &harness).await;

        assert_eq!(result.verdict, Verdict::Success);
        assert_eq!(
            runner.command_lines(),
            vec!["make compile", "make _sanity.openjdk"]
        );
        assert!(runner.calls().iter().all(|c| c.cwd == Some(harness.join("TKG"))));
    }

    #[tokio::test]
    async fn test_failure_marker_wins_over_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|spec| match spec.subcommand() {
            Some("compile") => ok(""),
            _ => exit(2, "FAILED test targets:\n\tjdk_math_0"),
        }));
        let executor = PipelineExecutor::new(runner);

        let harness = ctx.harness_dir();
        let result = executor.run(&mut ctx, &config("_jdk_custom", ""), &harness).await;

        assert_eq!(result.verdict, Verdict::TestFailuresDetected);
        assert_eq!(result.exit_code, Some(2));
    }

    #[tokio::test]
    async fn test_compile_failure_still_runs_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|spec| match spec.subcommand() {
            Some("compile") => exit(2, "compilation error"),
            _ => ok("ALL TESTS PASSED"),
        }));
        let executor = PipelineExecutor::new(runner.clone());

        let harness = ctx.harness_dir();
        let result = executor.run(&mut ctx, &config("_sanity.openjdk", ""), &harness).await;

        assert_eq!(result.verdict, Verdict::Success);
        assert_eq!(runner.calls().len(), 2);
        let errors: Vec<_> = ctx.logs_at_least(LogLevel::Error).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("make compile"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_without_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = linux_context(dir.path(), HostEnv::default());
        let runner = Arc::new(FakeRunner::with_handler(|spec| match spec.subcommand() {
            Some("compile") => ok(""),
            _ => exit(1, "make: *** No rule to make target"),
        }));
        let executor = PipelineExecutor::new(runner);

        let harness = ctx.harness_dir();
        let result = executor.run(&mut ctx, &config("_nope", ""), &harness).await;

        assert_eq!(result.verdict, Verdict::ProcessError);
        assert_eq!(ctx.logs_at_least(LogLevel::Error).count(), 1);
    }
}
