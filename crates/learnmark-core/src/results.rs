//! Assessment results: totals, percentage and proficiency classification.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::AssessmentQuestion;
use crate::error::{DomainError, DomainResult};
use crate::model::ProficiencyLevel;
use crate::scoring::AssessmentAnswer;

/// One scored attempt at an assessment. Totals are fixed at build time;
/// only the verification fields change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    id: Uuid,
    assessment_id: Uuid,
    user_id: Uuid,
    answers: Vec<AssessmentAnswer>,
    total_score: u32,
    maximum_possible_score: u32,
    score_percentage: f64,
    assigned_level: ProficiencyLevel,
    evaluated_at: DateTime<Utc>,
    is_verified: bool,
    verified_by: Option<Uuid>,
    verified_at: Option<DateTime<Utc>>,
    feedback: Option<String>,
}

impl AssessmentResult {
    /// Aggregates scored answers against the assessment's full question list.
    ///
    /// Unanswered questions still count toward the maximum.
    pub fn build(
        user_id: Uuid,
        assessment_id: Uuid,
        answers: Vec<AssessmentAnswer>,
        questions: &[AssessmentQuestion],
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut answered = BTreeSet::new();
        for answer in &answers {
            if answer.assessment_id() != assessment_id {
                return Err(DomainError::invalid_operation(format!(
                    "answer {} belongs to assessment {}, not {}",
                    answer.id(),
                    answer.assessment_id(),
                    assessment_id
                )));
            }
            if !questions.iter().any(|q| q.id() == answer.question_id()) {
                return Err(DomainError::not_found("question", answer.question_id()));
            }
            if !answered.insert(answer.question_id()) {
                return Err(DomainError::invalid_input(format!(
                    "question {} is answered more than once",
                    answer.question_id()
                )));
            }
        }

        let total_score = checked_total(
            answers.iter().map(AssessmentAnswer::score_earned),
            "total score",
        )?;
        let maximum_possible_score = checked_total(
            questions.iter().map(AssessmentQuestion::point_value),
            "maximum possible score",
        )?;
        let score_percentage = percentage(total_score, maximum_possible_score);
        let assigned_level = ProficiencyLevel::from_percentage(score_percentage);

        tracing::debug!(
            %assessment_id,
            total_score,
            maximum_possible_score,
            score_percentage,
            level = %assigned_level,
            "assessment result built"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            assessment_id,
            user_id,
            answers,
            total_score,
            maximum_possible_score,
            score_percentage,
            assigned_level,
            evaluated_at: now,
            is_verified: false,
            verified_by: None,
            verified_at: None,
            feedback: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assessment_id(&self) -> Uuid {
        self.assessment_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn answers(&self) -> &[AssessmentAnswer] {
        &self.answers
    }

    pub fn answer_for(&self, question_id: Uuid) -> Option<&AssessmentAnswer> {
        self.answers.iter().find(|a| a.question_id() == question_id)
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn maximum_possible_score(&self) -> u32 {
        self.maximum_possible_score
    }

    pub fn score_percentage(&self) -> f64 {
        self.score_percentage
    }

    pub fn assigned_level(&self) -> ProficiencyLevel {
        self.assigned_level
    }

    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn verified_by(&self) -> Option<Uuid> {
        self.verified_by
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Marks the result verified. Verification is one-way.
    pub fn verify(
        &mut self,
        verifier_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if verifier_id == self.user_id {
            return Err(DomainError::invalid_operation(
                "users cannot verify their own assessment result",
            ));
        }
        if self.is_verified {
            return Err(DomainError::invalid_operation(format!(
                "result {} is already verified",
                self.id
            )));
        }

        self.is_verified = true;
        self.verified_by = Some(verifier_id);
        self.verified_at = Some(now);
        self.feedback = notes.filter(|n| !n.trim().is_empty());

        tracing::info!(result_id = %self.id, verifier = %verifier_id, "assessment result verified");
        Ok(())
    }
}

/// Sums point values, rejecting totals that do not fit in `u32`.
pub(crate) fn checked_total(
    values: impl IntoIterator<Item = u32>,
    what: &str,
) -> DomainResult<u32> {
    values
        .into_iter()
        .try_fold(0u32, |sum, value| sum.checked_add(value))
        .ok_or_else(|| DomainError::invalid_input(format!("{what} exceeds {}", u32::MAX)))
}

fn percentage(total: u32, maximum: u32) -> f64 {
    if maximum == 0 {
        return 0.0;
    }
    f64::from(total) / f64::from(maximum) * 100.0
}

/// Level standing for a set of results.
///
/// The most recently verified result wins (latest `verified_at`, later
/// position on ties). Without any verified result, the highest
/// `score_percentage` wins, ties going to the earliest `evaluated_at` and
/// then to the earlier position. Returns `None` for no results.
pub fn current_level(results: &[AssessmentResult]) -> Option<ProficiencyLevel> {
    let latest_verified = results
        .iter()
        .filter_map(|r| r.verified_at.map(|at| (at, r)))
        .fold(None::<(DateTime<Utc>, &AssessmentResult)>, |best, (at, r)| {
            match best {
                Some((best_at, _)) if best_at > at => best,
                _ => Some((at, r)),
            }
        });
    if let Some((_, result)) = latest_verified {
        return Some(result.assigned_level);
    }

    results
        .iter()
        .fold(None::<&AssessmentResult>, |best, r| match best {
            Some(b)
                if b.score_percentage > r.score_percentage
                    || (b.score_percentage == r.score_percentage
                        && b.evaluated_at <= r.evaluated_at) =>
            {
                Some(b)
            }
            _ => Some(r),
        })
        .map(|r| r.assigned_level)
}
