//! The `learnmark score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use learnmark_core::config::load_config_from;
use learnmark_core::parser;
use learnmark_core::report::AssessmentReport;

use super::{engine_for, saved_report_path, OutputFormat};

pub fn execute(
    attempt_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
    save: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let format = OutputFormat::parse(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let attempt = parser::parse_assessment_attempt(&attempt_path)?;

    for w in parser::validate_assessment_attempt(&attempt) {
        tracing::warn!("{}: {}", attempt.name, w.message);
    }

    let mut assessment = attempt
        .build_assessment()
        .with_context(|| format!("failed to build assessment from {}", attempt_path.display()))?;

    let engine = engine_for(attempt.as_of, &config);
    let mut report = engine
        .grade_attempt(&mut assessment, &attempt.submissions())
        .with_context(|| format!("failed to grade {}", attempt_path.display()))?;

    if let (Some(verifier), Some(review)) = (attempt.verifier_id(), &attempt.review) {
        let verified_at = attempt.as_of.unwrap_or(report.created_at);
        assessment
            .verify_result(report.result.id(), verifier, review.notes.clone(), verified_at)
            .context("failed to apply review")?;
        if let Some(result) = assessment.results().last() {
            report.result = result.clone();
        }
        report.current_level = assessment.current_level();
    }

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
        let path = saved_report_path(&config.output_dir, "assessment", &attempt.name);
        report.save_json(&path)?;
        eprintln!("Report saved to {}", path.display());
    }

    Ok(())
}

fn print_text(report: &AssessmentReport) {
    println!("Assessment: {}", report.skill_name);

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Type", "Score"]);
    for (i, q) in report.questions.iter().enumerate() {
        let score = if q.answered {
            format!("{}/{}", q.earned, q.possible)
        } else {
            format!("-/{}", q.possible)
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&q.text),
            Cell::new(q.question_type),
            Cell::new(score),
        ]);
    }
    println!("{table}");

    let result = &report.result;
    println!(
        "Total: {}/{} ({:.1}%)",
        result.total_score(),
        result.maximum_possible_score(),
        result.score_percentage()
    );
    println!("Level: {}", result.assigned_level());
    if let Some(verifier) = result.verified_by() {
        println!("Verified by: {verifier}");
        if let Some(feedback) = result.feedback() {
            println!("Feedback: {feedback}");
        }
    }
}
