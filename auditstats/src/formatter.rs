//! Output formatters for audit statistics

use anyhow::Result;
use auditsheet_core::session::FileFailure;
use auditsheet_core::stats::GroupStats;
use auditsheet_core::AuditStats;
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Print statistics in human-readable format with colors
pub fn print_human(
    stats: &AuditStats,
    calendar: Option<&BTreeMap<String, u32>>,
    failures: &[FileFailure],
) {
    for failure in failures {
        println!(
            "{} {}: {}",
            "ERROR".red().bold(),
            failure.file_name,
            failure.error
        );
    }
    if !failures.is_empty() {
        println!();
    }

    if stats.total_audits == 0 {
        println!("{}", "No audits match the current filters".yellow());
        return;
    }

    println!("{}", "Summary:".bold().underline());
    println!("  Audits:        {}", stats.total_audits);
    println!("  Items:         {}", stats.total_items);
    println!(
        "  {} {}",
        "Compliance:".bold(),
        colored_percentage(stats.average_compliance)
    );
    println!("  {} {}", "Cumple:".green(), stats.counts.complies);
    println!("  {} {}", "Cumple parcialmente:".yellow(), stats.counts.partial);
    println!("  {} {}", "No cumple:".red(), stats.counts.fails);
    println!("  {} {}", "No aplica:".bright_black(), stats.counts.not_applicable);
    println!();

    print_groups("By operation:", &stats.by_operation);
    print_groups("By auditor:", &stats.by_auditor);
    print_groups("By month:", &stats.by_month);

    if !stats.top_failed_items.is_empty() {
        println!("{}", "Most failed items:".bold().underline());
        for (rank, item) in stats.top_failed_items.iter().enumerate() {
            println!(
                "  {:>2}. {} [{}] {}",
                rank + 1,
                item.count.to_string().red().bold(),
                item.category.bright_black(),
                item.question
            );
        }
        println!();
    }

    if let Some(calendar) = calendar {
        println!("{}", "Calendar:".bold().underline());
        for (day, audits) in calendar {
            println!("  {}  {}", day.cyan(), audits);
        }
    }
}

fn print_groups(title: &str, groups: &BTreeMap<String, GroupStats>) {
    println!("{}", title.bold().underline());
    for (name, group) in groups {
        println!(
            "  {:<30} {:>3} audits  {:>5} items  {}",
            name.cyan(),
            group.audits,
            group.total_items,
            colored_percentage(group.compliance)
        );
    }
    println!();
}

fn colored_percentage(value: f64) -> ColoredString {
    let text = format!("{:.2}%", value);
    if value >= 90.0 {
        text.green().bold()
    } else if value >= 70.0 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    file: &'a str,
    error: String,
}

/// Print statistics in JSON format
pub fn print_json(
    stats: &AuditStats,
    calendar: Option<&BTreeMap<String, u32>>,
    failures: &[FileFailure],
) -> Result<()> {
    let failures: Vec<FailureOutput> = failures
        .iter()
        .map(|f| FailureOutput {
            file: &f.file_name,
            error: f.error.to_string(),
        })
        .collect();

    let mut output = serde_json::json!({
        "stats": stats,
        "failures": failures,
    });
    if let Some(calendar) = calendar {
        output["calendar"] = serde_json::to_value(calendar)?;
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
