//! Completion and assessment reports with JSON persistence.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::CompletionCriterion;
use crate::model::{EnrollmentStatus, ProficiencyLevel, QuestionType};
use crate::results::AssessmentResult;

/// Outcome of evaluating one enrollment against its course's requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub course_id: Uuid,
    pub course_title: String,
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    /// Enrollment status after evaluation.
    pub status: EnrollmentStatus,
    pub progress_percentage: f64,
    /// One entry per requirement, in course order.
    pub requirements: Vec<RequirementStatus>,
    /// Whether the course has no requirements and completion fell back to
    /// full progress.
    pub progress_fallback: bool,
    /// Whether the enrollment meets the course's completion rules.
    pub eligible: bool,
    /// Whether this evaluation moved the enrollment to `Completed`.
    pub completed_now: bool,
}

/// Per-requirement line of a [`CompletionReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementStatus {
    pub requirement_id: Uuid,
    pub criterion: CompletionCriterion,
    pub required_value: u32,
    pub is_required: bool,
    pub satisfied: bool,
    pub description: String,
    pub progress: String,
}

impl CompletionReport {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }

    /// Required requirements that are not yet satisfied.
    pub fn blocking(&self) -> impl Iterator<Item = &RequirementStatus> {
        self.requirements
            .iter()
            .filter(|r| r.is_required && !r.satisfied)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Completion: {}\n", self.course_title);
        let _ = writeln!(md, "- Enrollment: `{}`", self.enrollment_id);
        let _ = writeln!(md, "- Status: {}", self.status);
        let _ = writeln!(md, "- Progress: {:.1}%", self.progress_percentage);
        let _ = writeln!(
            md,
            "- Eligible: {}",
            if self.eligible { "yes" } else { "no" }
        );
        if self.completed_now {
            let _ = writeln!(md, "- Completed by this check");
        }
        md.push('\n');

        if self.progress_fallback {
            md.push_str("No completion requirements; completion requires 100% progress.\n");
            return md;
        }

        md.push_str("| # | Requirement | Required | Met | Progress |\n");
        md.push_str("|---|-------------|----------|-----|----------|\n");
        for (i, r) in self.requirements.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} |",
                i + 1,
                r.description,
                if r.is_required { "yes" } else { "optional" },
                if r.satisfied { "✓" } else { "✗" },
                r.progress
            );
        }
        md
    }
}

/// Scored attempt at a skill assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub assessment_id: Uuid,
    pub skill_name: String,
    pub user_id: Uuid,
    /// One entry per question, in assessment order.
    pub questions: Vec<QuestionBreakdown>,
    pub result: AssessmentResult,
    /// The assessment's standing level after this attempt.
    pub current_level: Option<ProficiencyLevel>,
}

/// Per-question line of an [`AssessmentReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBreakdown {
    pub question_id: Uuid,
    pub text: String,
    pub question_type: QuestionType,
    pub answered: bool,
    pub earned: u32,
    pub possible: u32,
}

impl AssessmentReport {
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Assessment: {}\n", self.skill_name);
        let _ = writeln!(
            md,
            "- Score: {}/{} ({:.1}%)",
            self.result.total_score(),
            self.result.maximum_possible_score(),
            self.result.score_percentage()
        );
        let _ = writeln!(md, "- Level: {}", self.result.assigned_level());
        if let Some(level) = self.current_level {
            let _ = writeln!(md, "- Current level: {level}");
        }
        md.push('\n');

        md.push_str("| # | Question | Type | Points |\n");
        md.push_str("|---|----------|------|--------|\n");
        for (i, q) in self.questions.iter().enumerate() {
            let points = if q.answered {
                format!("{}/{}", q.earned, q.possible)
            } else {
                format!("unanswered/{}", q.possible)
            };
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                i + 1,
                q.text,
                q.question_type,
                points
            );
        }
        md
    }
}

fn save_json<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    serde_json::from_str(&content).context("failed to parse report JSON")
}
