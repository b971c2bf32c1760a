//! The `learnmark init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("learnmark.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("scenarios").context("failed to create scenarios/")?;
    write_if_missing(Path::new("scenarios/example-course.toml"), EXAMPLE_COURSE)?;
    write_if_missing(Path::new("scenarios/example-attempt.toml"), EXAMPLE_ATTEMPT)?;

    println!("\nNext steps:");
    println!("  1. Run: learnmark validate --path scenarios");
    println!("  2. Run: learnmark check --scenario scenarios/example-course.toml");
    println!("  3. Run: learnmark score --attempt scenarios/example-attempt.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# learnmark configuration

# Rounding for partial-credit scores: "half_even" or "half_away_from_zero".
# LEARNMARK_ROUNDING overrides this value.
rounding = "half_even"

# Where `--save` writes JSON reports.
output_dir = "./learnmark-reports"
"#;

const EXAMPLE_COURSE: &str = r#"as_of = "2026-01-15T12:00:00Z"

[course]
key = "example-course"
title = "Example Course"

[[course.modules]]
key = "welcome"
title = "Welcome"

[[course.modules.lessons]]
key = "intro"
title = "Introduction"
type = "video"
duration_minutes = 5

[[course.modules.lessons]]
key = "first-steps"
title = "First steps"
type = "article"
duration_minutes = 10

[[course.requirements]]
criterion = "percentage_complete"
value = 100

[[course.requirements]]
criterion = "minimum_grade"
value = 60
required = false

[enrollment]
user = "learner"
enrolled_at = "2026-01-01T09:00:00Z"
completed_lessons = ["intro"]
"#;

const EXAMPLE_ATTEMPT: &str = r#"as_of = "2026-01-15T12:00:00Z"

[assessment]
key = "example-assessment"
skill = "Example skill"
user = "learner"

[[assessment.questions]]
key = "q1"
text = "Pick the correct answer"
type = "single_choice"
points = 2

[[assessment.questions.options]]
key = "right"
text = "This one"
correct = true

[[assessment.questions.options]]
key = "wrong"
text = "Not this one"

[[assessment.questions]]
key = "q2"
text = "Pick every correct answer"
type = "multiple_choice"
points = 4

[[assessment.questions.options]]
key = "a"
text = "A"
correct = true

[[assessment.questions.options]]
key = "b"
text = "B"
correct = true

[[assessment.questions.options]]
key = "c"
text = "C"

[[answers]]
question = "q1"
selected = ["right"]

[[answers]]
question = "q2"
selected = ["a"]
"#;
