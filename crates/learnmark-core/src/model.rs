//! Closed enumerations shared across the engine.
//!
//! These are the small vocabularies the aggregates are built from:
//! enrollment states, lesson and question kinds, and proficiency levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    OnHold,
    Expired,
    Pending,
}

impl EnrollmentStatus {
    /// Returns `true` for states that can no longer progress toward completion.
    pub fn is_closed(self) -> bool {
        matches!(self, EnrollmentStatus::Dropped | EnrollmentStatus::Expired)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
            EnrollmentStatus::OnHold => "on_hold",
            EnrollmentStatus::Expired => "expired",
            EnrollmentStatus::Pending => "pending",
        };
        f.write_str(label)
    }
}

/// Kind of content a lesson delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Video,
    Article,
    Quiz,
    Assignment,
    Interactive,
    LiveSession,
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonType::Video => write!(f, "video"),
            LessonType::Article => write!(f, "article"),
            LessonType::Quiz => write!(f, "quiz"),
            LessonType::Assignment => write!(f, "assignment"),
            LessonType::Interactive => write!(f, "interactive"),
            LessonType::LiveSession => write!(f, "live_session"),
        }
    }
}

impl FromStr for LessonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "video" => Ok(LessonType::Video),
            "article" | "text" => Ok(LessonType::Article),
            "quiz" => Ok(LessonType::Quiz),
            "assignment" => Ok(LessonType::Assignment),
            "interactive" => Ok(LessonType::Interactive),
            "livesession" | "live" => Ok(LessonType::LiveSession),
            _ => Err(format!("unknown lesson type: {s}")),
        }
    }
}

/// Kind of assessment question, which decides how answers are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    OpenText,
    TrueFalse,
    Matching,
    Ordering,
    FillInBlank,
    Hotspot,
}

impl QuestionType {
    /// Questions graded by a person rather than by option correctness.
    pub fn is_manually_graded(self) -> bool {
        matches!(self, QuestionType::OpenText)
    }

    /// Questions that accept at most one selected option.
    pub fn is_single_select(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::TrueFalse)
    }

    /// Questions scored with the partial-credit formula.
    pub fn allows_partial_credit(self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice
                | QuestionType::Matching
                | QuestionType::Ordering
                | QuestionType::FillInBlank
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::OpenText => "open_text",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Matching => "matching",
            QuestionType::Ordering => "ordering",
            QuestionType::FillInBlank => "fill_in_blank",
            QuestionType::Hotspot => "hotspot",
        };
        f.write_str(label)
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "singlechoice" | "single" => Ok(QuestionType::SingleChoice),
            "multiplechoice" | "multiple" => Ok(QuestionType::MultipleChoice),
            "opentext" | "text" => Ok(QuestionType::OpenText),
            "truefalse" => Ok(QuestionType::TrueFalse),
            "matching" => Ok(QuestionType::Matching),
            "ordering" => Ok(QuestionType::Ordering),
            "fillinblank" | "fillintheblank" => Ok(QuestionType::FillInBlank),
            "hotspot" => Ok(QuestionType::Hotspot),
            _ => Err(format!("unknown question type: {s}")),
        }
    }
}

/// Proficiency classification derived from an assessment score percentage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    /// Maps a score percentage onto a level. Lower bounds are inclusive.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            ProficiencyLevel::Expert
        } else if percentage >= 75.0 {
            ProficiencyLevel::Advanced
        } else if percentage >= 50.0 {
            ProficiencyLevel::Intermediate
        } else {
            ProficiencyLevel::Beginner
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProficiencyLevel::Beginner => write!(f, "beginner"),
            ProficiencyLevel::Intermediate => write!(f, "intermediate"),
            ProficiencyLevel::Advanced => write!(f, "advanced"),
            ProficiencyLevel::Expert => write!(f, "expert"),
        }
    }
}

/// Lowercases and strips separators so `fill_in_blank`, `FillInBlank` and
/// `fill-in-blank` all compare equal.
pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
