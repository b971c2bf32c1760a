//! The `learnmark validate` command.

use std::path::PathBuf;

use anyhow::Result;

use learnmark_core::parser::{self, ScenarioFile};

pub fn execute(path: PathBuf) -> Result<()> {
    let scenarios = if path.is_dir() {
        parser::load_scenario_directory(&path)?
    } else {
        vec![(path.clone(), parser::parse_scenario_file(&path)?)]
    };

    let mut total_warnings = 0;
    let mut failed = 0;

    for (file, scenario) in &scenarios {
        let (summary, warnings, build) = match scenario {
            ScenarioFile::Course(s) => (
                format!(
                    "Course scenario: {} ({} requirement(s))",
                    s.name,
                    s.course.requirements.len()
                ),
                parser::validate_course_scenario(s),
                s.build_course()
                    .and_then(|course| s.build_enrollment(&course).map(|_| ())),
            ),
            ScenarioFile::Attempt(a) => (
                format!(
                    "Assessment attempt: {} ({} question(s), {} answer(s))",
                    a.name,
                    a.assessment.questions.len(),
                    a.answers.len()
                ),
                parser::validate_assessment_attempt(a),
                a.build_assessment().map(|_| ()),
            ),
        };

        println!("{summary}");
        for w in &warnings {
            let prefix = w
                .key
                .as_ref()
                .map(|key| format!("  [{key}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        if let Err(e) = build {
            println!("  ERROR: {}: {e}", file.display());
            failed += 1;
        }
        total_warnings += warnings.len();
    }

    if failed > 0 {
        anyhow::bail!("{failed} scenario(s) are invalid");
    }
    if total_warnings == 0 {
        println!("All scenarios valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
