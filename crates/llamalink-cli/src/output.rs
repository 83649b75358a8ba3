//! Colourised console output.

use colored::Colorize;
use llamalink_core::link::CleanupReport;
use llamalink_core::{LinkConfig, LinkDecision, ModelEntry, ModelOutcome, RunReport, TreeSurvey};

/// Format a byte count the way `ollama list` does.
pub fn format_size(size_bytes: Option<u64>) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    let Some(bytes) = size_bytes else {
        return "?".to_string();
    };
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    if unit == "B" {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, unit)
    }
}

pub fn print_paths(config: &LinkConfig) {
    println!();
    println!(
        "{} {}",
        "Ollama models directory:".bright_white(),
        config.source_root.display()
    );
    println!(
        "{} {}",
        "LM Studio models directory:".bright_white(),
        config.dest_root.display()
    );
    println!();
}

pub fn print_model_list(models: &[ModelEntry]) {
    println!("{}", "Select the models to link to LM Studio:".bright_white());
    for (i, model) in models.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", i + 1).bright_yellow(),
            model.name,
            format!("({})", format_size(model.size_bytes)).dimmed()
        );
    }
}

pub fn print_outcome(outcome: &ModelOutcome, dry_run: bool) {
    let link = outcome.link_path.display();
    let prefix = if dry_run { "would " } else { "" };
    if let Some(error) = &outcome.error {
        println!("{} {}: {}", "Error".red(), outcome.model, error);
        return;
    }
    match outcome.decision {
        LinkDecision::Create => println!(
            "{} {} {} {}",
            format!("{}link", prefix).green(),
            outcome.model,
            "->".dimmed(),
            link
        ),
        LinkDecision::Repair => println!(
            "{} {} {} {}",
            format!("{}repair", prefix).yellow(),
            outcome.model,
            "->".dimmed(),
            link
        ),
        LinkDecision::Skip => println!(
            "{} {} {}",
            "ok".dimmed(),
            outcome.model,
            "(already linked)".dimmed()
        ),
        LinkDecision::Deduplicate => {
            let canonical = outcome
                .canonical
                .as_ref()
                .map(|c| c.display().to_string())
                .unwrap_or_default();
            println!(
                "{} {} {} {}",
                format!("{}dedupe", prefix).cyan(),
                outcome.model,
                "already linked at".dimmed(),
                canonical
            );
        }
        LinkDecision::Reject => println!(
            "{} {}: {}",
            "skip".red(),
            outcome.model,
            outcome.reject.as_deref().unwrap_or("rejected")
        ),
    }
}

pub fn print_cleanup(report: &CleanupReport) {
    for link in &report.links_removed {
        println!("{} {}", "Removed symlink".yellow(), link.display());
    }
    for dir in &report.dirs_removed {
        println!("{} {}", "Removed empty directory".yellow(), dir.display());
    }
    for (path, error) in &report.errors {
        println!("{} {}: {}", "Cleanup failed".red(), path.display(), error);
    }
}

pub fn print_report(report: &RunReport) {
    for link in &report.pruned.removed {
        println!("{} {}", "Removed duplicate link".yellow(), link.display());
    }
    for outcome in &report.outcomes {
        print_outcome(outcome, report.dry_run);
    }
    if let Some(cleanup) = &report.cleanup {
        print_cleanup(cleanup);
    }
    if report.cancelled {
        println!("{}", "Run cancelled.".yellow());
    }

    println!();
    println!(
        "{} {} created, {} repaired, {} already linked, {} deduplicated, {} skipped",
        "Summary:".bold(),
        report.count(LinkDecision::Create),
        report.count(LinkDecision::Repair),
        report.count(LinkDecision::Skip),
        report.count(LinkDecision::Deduplicate),
        report.count(LinkDecision::Reject),
    );
}

pub fn print_survey(survey: &TreeSurvey) {
    println!("{}", "LM Studio tree report:".bright_white());
    println!("  {} {}", "Valid links:".dimmed(), survey.valid_links);

    println!("{}", "Model files not managed by llamalink:".bright_white());
    for path in &survey.unmanaged {
        println!("- {}", path.display());
    }

    println!("{}", "Broken links:".bright_white());
    for broken in &survey.broken {
        println!(
            "- {} {} {}",
            broken.path.display(),
            "->".dimmed(),
            format!("{} ({})", broken.target.display(), broken.verdict).red()
        );
    }

    println!("{}", "Duplicate links:".bright_white());
    for group in &survey.duplicates {
        println!("- {}", group.target.display());
        println!("    {} {}", "keep".green(), group.canonical.display());
        for link in &group.redundant {
            println!("    {} {}", "drop".yellow(), link.display());
        }
    }
    println!();
}
