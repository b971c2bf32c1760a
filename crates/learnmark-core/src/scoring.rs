//! Per-answer scoring.
//!
//! Choice-based answers are scored from the question's correct-option set.
//! Partial-credit questions use
//!
//! ```text
//! score = round(pointValue × max(0, C − K) / T)
//! ```
//!
//! where `C` and `K` are the correct and incorrect selections and `T` is the
//! number of correct options. The ratio is kept as an exact fraction and
//! rounded with integer arithmetic, so `.5` boundaries are never blurred by
//! floating point. Open-text answers are scored by a person and only range
//! checked here.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::AssessmentQuestion;
use crate::error::{DomainError, DomainResult};
use crate::model::{normalize, QuestionType};

/// How a fractional partial-credit score is rounded to whole points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Ties go to the even neighbour (2.5 → 2, 3.5 → 4).
    #[default]
    #[serde(rename = "half_even", alias = "half_to_even", alias = "bankers")]
    HalfToEven,
    /// Ties go up (2.5 → 3).
    #[serde(rename = "half_away_from_zero", alias = "half_up")]
    HalfAwayFromZero,
}

impl RoundingMode {
    /// Rounds `numerator / denominator` to a whole number.
    ///
    /// `denominator` must be non-zero.
    pub fn divide(self, numerator: u64, denominator: u64) -> u64 {
        debug_assert!(denominator > 0, "rounding a fraction with zero denominator");
        let quotient = numerator / denominator;
        let twice_remainder = 2 * (numerator % denominator);

        let round_up = match twice_remainder.cmp(&denominator) {
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => match self {
                RoundingMode::HalfToEven => quotient % 2 == 1,
                RoundingMode::HalfAwayFromZero => true,
            },
        };
        quotient + u64::from(round_up)
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingMode::HalfToEven => write!(f, "half_even"),
            RoundingMode::HalfAwayFromZero => write!(f, "half_away_from_zero"),
        }
    }
}

impl FromStr for RoundingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "halfeven" | "halftoeven" | "bankers" => Ok(RoundingMode::HalfToEven),
            "halfawayfromzero" | "halfup" => Ok(RoundingMode::HalfAwayFromZero),
            _ => Err(format!("unknown rounding mode: {s}")),
        }
    }
}

/// Scores a set of selected options against a choice-based question.
///
/// Every id in `selected` must belong to the question. The result is always
/// within `0..=question.point_value()`.
pub fn score_selection(
    question: &AssessmentQuestion,
    selected: &BTreeSet<Uuid>,
    rounding: RoundingMode,
) -> DomainResult<u32> {
    let question_type = question.question_type();
    if question_type.is_manually_graded() {
        return Err(DomainError::invalid_operation(format!(
            "question {} is {question_type} and cannot be answered with options",
            question.id()
        )));
    }
    if let Some(unknown) = selected.iter().find(|id| !question.has_option(**id)) {
        return Err(DomainError::invalid_input(format!(
            "option {unknown} does not belong to question {}",
            question.id()
        )));
    }
    if question_type.is_single_select() && selected.len() > 1 {
        return Err(DomainError::invalid_operation(format!(
            "{question_type} question {} accepts one option, got {}",
            question.id(),
            selected.len()
        )));
    }

    let correct_options = question.correct_option_ids();
    let points = question.point_value();

    let score = if question_type.allows_partial_credit() {
        partial_credit(points, selected, &correct_options, rounding)
    } else {
        match question_type {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                let hit = selected.len() == 1 && selected.is_subset(&correct_options);
                if hit {
                    points
                } else {
                    0
                }
            }
            QuestionType::Hotspot => {
                if !correct_options.is_empty() && *selected == correct_options {
                    points
                } else {
                    0
                }
            }
            _ => 0,
        }
    };

    tracing::debug!(
        question_id = %question.id(),
        question_type = %question_type,
        selected = selected.len(),
        score,
        points,
        "scored selection"
    );
    Ok(score)
}

fn partial_credit(
    points: u32,
    selected: &BTreeSet<Uuid>,
    correct_options: &BTreeSet<Uuid>,
    rounding: RoundingMode,
) -> u32 {
    let total_correct = correct_options.len() as u64;
    if total_correct == 0 {
        return 0;
    }
    let correct = selected.intersection(correct_options).count() as u64;
    let incorrect = selected.len() as u64 - correct;

    // correct/T - incorrect/T == (correct - incorrect)/T, floored at zero.
    let net = correct.saturating_sub(incorrect);
    let earned = rounding.divide(u64::from(points) * net, total_correct);
    // net <= T, so earned <= points.
    earned.min(u64::from(points)) as u32
}

/// One learner answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentAnswer {
    id: Uuid,
    assessment_id: Uuid,
    question_id: Uuid,
    text_answer: Option<String>,
    selected_option_ids: BTreeSet<Uuid>,
    score_earned: u32,
    is_graded: bool,
}

impl AssessmentAnswer {
    /// Creates an empty, ungraded answer for `question`.
    pub fn new(question: &AssessmentQuestion) -> Self {
        Self {
            id: Uuid::new_v4(),
            assessment_id: question.assessment_id(),
            question_id: question.id(),
            text_answer: None,
            selected_option_ids: BTreeSet::new(),
            score_earned: 0,
            is_graded: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assessment_id(&self) -> Uuid {
        self.assessment_id
    }

    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn text_answer(&self) -> Option<&str> {
        self.text_answer.as_deref()
    }

    pub fn selected_option_ids(&self) -> &BTreeSet<Uuid> {
        &self.selected_option_ids
    }

    pub fn score_earned(&self) -> u32 {
        self.score_earned
    }

    /// `false` for open-text answers still awaiting a grader.
    pub fn is_graded(&self) -> bool {
        self.is_graded
    }

    /// Replaces the selection and recomputes the score from scratch.
    pub fn select_options(
        &mut self,
        question: &AssessmentQuestion,
        option_ids: &[Uuid],
        rounding: RoundingMode,
    ) -> DomainResult<u32> {
        self.ensure_question(question)?;
        let selected: BTreeSet<Uuid> = option_ids.iter().copied().collect();
        let score = score_selection(question, &selected, rounding)?;

        self.selected_option_ids = selected;
        self.score_earned = score;
        self.is_graded = true;
        Ok(score)
    }

    /// Stores a free-text response. Only valid for open-text questions.
    pub fn set_text_answer(
        &mut self,
        question: &AssessmentQuestion,
        text: impl Into<String>,
    ) -> DomainResult<()> {
        self.ensure_question(question)?;
        if !question.question_type().is_manually_graded() {
            return Err(DomainError::invalid_operation(format!(
                "{} question {} does not accept a text answer",
                question.question_type(),
                question.id()
            )));
        }
        self.text_answer = Some(text.into());
        Ok(())
    }

    /// Records the score a grader assigned to an open-text answer.
    pub fn grade_text(&mut self, question: &AssessmentQuestion, score: u32) -> DomainResult<()> {
        self.ensure_question(question)?;
        if !question.question_type().is_manually_graded() {
            return Err(DomainError::invalid_operation(format!(
                "{} question {} is scored automatically",
                question.question_type(),
                question.id()
            )));
        }
        if score > question.point_value() {
            return Err(DomainError::invalid_input(format!(
                "score {score} is outside 0..={} for question {}",
                question.point_value(),
                question.id()
            )));
        }
        self.score_earned = score;
        self.is_graded = true;
        Ok(())
    }

    fn ensure_question(&self, question: &AssessmentQuestion) -> DomainResult<()> {
        if question.id() != self.question_id {
            return Err(DomainError::invalid_operation(format!(
                "answer {} is for question {}, not {}",
                self.id,
                self.question_id,
                question.id()
            )));
        }
        Ok(())
    }
}
