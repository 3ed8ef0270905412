//! Run report output

use anyhow::Result;
use aqa_core::domain::log::{LogEntry, LogLevel};
use aqa_core::domain::pipeline::TaskResult;
use aqa_runner::RunReport;
use colored::*;
use std::path::Path;

/// Prints the outcome, produced environment and warnings of a run
pub fn print_summary(report: &RunReport) {
    println!();
    println!("{}", "─".repeat(80).dimmed());
    println!("{}", "AQA run summary:".bold());
    println!("  Run:      {}", report.run_id.to_string().dimmed());
    println!("  Result:   {}", colorize_result(report.outcome.result));
    if let Some(verdict) = report.verdict {
        println!("  Verdict:  {:?}", verdict);
    }
    if let Some(message) = &report.outcome.message {
        println!("  Message:  {}", message.red());
    }

    let duration = report.finished_at.signed_duration_since(report.started_at);
    println!("  Duration: {}s", duration.num_seconds());

    if !report.environment.is_empty() {
        println!();
        println!("{}", "Environment:".bold());
        for (key, value) in &report.environment {
            println!("  {}={}", key.cyan(), value);
        }
    }

    let issues: Vec<_> = report
        .logs
        .iter()
        .filter(|entry| entry.level >= LogLevel::Warning)
        .collect();
    if !issues.is_empty() {
        println!();
        println!("{}", format!("{} issue(s):", issues.len()).bold());
        for entry in issues {
            print_log_entry(entry);
        }
    }
    println!("{}", "─".repeat(80).dimmed());
}

/// Writes the report as pretty-printed JSON
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn print_log_entry(log: &LogEntry) {
    let level_str = log.level.to_string().to_uppercase();
    let level_colored = match log.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "  {} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}

fn colorize_result(result: TaskResult) -> ColoredString {
    let result_str = format!("{:?}", result);
    match result {
        TaskResult::Succeeded => result_str.green(),
        TaskResult::SucceededWithIssues => result_str.yellow(),
        TaskResult::Failed => result_str.red(),
    }
}
