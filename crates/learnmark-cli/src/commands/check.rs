//! The `learnmark check` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use learnmark_core::config::load_config_from;
use learnmark_core::parser;
use learnmark_core::report::CompletionReport;

use super::{engine_for, saved_report_path, OutputFormat};

pub fn execute(
    scenario_path: PathBuf,
    apply: bool,
    format: String,
    output: Option<PathBuf>,
    save: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let scenario = parser::parse_course_scenario(&scenario_path)?;

    for w in parser::validate_course_scenario(&scenario) {
        tracing::warn!("{}: {}", scenario.name, w.message);
    }

    let course = scenario
        .build_course()
        .with_context(|| format!("failed to build course from {}", scenario_path.display()))?;
    let mut enrollment = scenario
        .build_enrollment(&course)
        .with_context(|| format!("failed to build enrollment from {}", scenario_path.display()))?;

    let engine = engine_for(scenario.as_of, &config);
    let report = if apply {
        engine.apply_completion(&course, &mut enrollment)?
    } else {
        engine.evaluate_completion(&course, &enrollment)?
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Markdown => println!("{}", report.to_markdown()),
        OutputFormat::Text => print_text(&report),
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Report written to {}", path.display());
    }
    if save {
        let path = saved_report_path(&config.output_dir, "completion", &scenario.name);
        report.save_json(&path)?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

fn print_text(report: &CompletionReport) {
    println!("Course: {}", report.course_title);
    println!(
        "Enrollment: {} ({}, {:.1}% progress)",
        report.enrollment_id, report.status, report.progress_percentage
    );

    if report.progress_fallback {
        println!("No completion requirements; completion requires 100% progress.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["#", "Criterion", "Requirement", "Required", "Met", "Progress"]);
        for (i, r) in report.requirements.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(r.criterion),
                Cell::new(&r.description),
                Cell::new(if r.is_required { "yes" } else { "optional" }),
                Cell::new(if r.satisfied { "yes" } else { "no" }),
                Cell::new(&r.progress),
            ]);
        }
        println!("{table}");
    }

    if report.completed_now {
        println!("Enrollment completed.");
    } else if report.eligible {
        println!("Eligible for completion: yes");
    } else if report.progress_fallback {
        println!("Eligible for completion: no (progress below 100%)");
    } else {
        println!(
            "Eligible for completion: no ({} requirement(s) outstanding)",
            report.blocking().count()
        );
    }
}
