//! Engine facade tying the clock, rounding config and aggregates together.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::SkillAssessment;
use crate::config::LearnmarkConfig;
use crate::course::Course;
use crate::enrollment::Enrollment;
use crate::error::{DomainError, DomainResult};
use crate::model::EnrollmentStatus;
use crate::report::{AssessmentReport, CompletionReport, QuestionBreakdown, RequirementStatus};
use crate::scoring::{AssessmentAnswer, RoundingMode};
use crate::traits::{Clock, SystemClock};

/// Configuration for the learning engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rounding for partial-credit scores.
    pub rounding: RoundingMode,
}

impl From<&LearnmarkConfig> for EngineConfig {
    fn from(config: &LearnmarkConfig) -> Self {
        Self {
            rounding: config.rounding,
        }
    }
}

/// One learner response, before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerSubmission {
    /// Options picked for a choice-based question.
    Selection { question: Uuid, options: Vec<Uuid> },
    /// Free text for an open-text question, with the grader's score if any.
    Text {
        question: Uuid,
        text: String,
        #[serde(default)]
        score: Option<u32>,
    },
}

impl AnswerSubmission {
    pub fn question_id(&self) -> Uuid {
        match self {
            AnswerSubmission::Selection { question, .. } => *question,
            AnswerSubmission::Text { question, .. } => *question,
        }
    }
}

/// The learning engine.
pub struct LearningEngine {
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl LearningEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(Arc::new(SystemClock), config)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self { clock, config }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Evaluates every requirement of `course` against `enrollment` without
    /// changing anything.
    pub fn evaluate_completion(
        &self,
        course: &Course,
        enrollment: &Enrollment,
    ) -> DomainResult<CompletionReport> {
        let now = self.clock.now();
        let eligible = course.check_enrollment_completion(enrollment, now)?;
        completion_report(course, enrollment, now, eligible, false)
    }

    /// Evaluates and, when every required requirement holds, completes the
    /// enrollment.
    pub fn apply_completion(
        &self,
        course: &Course,
        enrollment: &mut Enrollment,
    ) -> DomainResult<CompletionReport> {
        let now = self.clock.now();
        let was_completed = enrollment.status() == EnrollmentStatus::Completed;
        let eligible = course.try_auto_complete(enrollment, now)?;
        let completed_now = !was_completed && enrollment.status() == EnrollmentStatus::Completed;
        completion_report(course, enrollment, now, eligible, completed_now)
    }

    /// Scores `submissions`, stores the result on the assessment and reports
    /// the per-question breakdown.
    ///
    /// Nothing is stored if any submission is rejected.
    pub fn grade_attempt(
        &self,
        assessment: &mut SkillAssessment,
        submissions: &[AnswerSubmission],
    ) -> DomainResult<AssessmentReport> {
        let now = self.clock.now();
        let assessment_id = assessment.id();
        let answers = submissions
            .iter()
            .map(|submission| self.score_submission(assessment, submission))
            .collect::<DomainResult<Vec<_>>>()
            .inspect_err(|err| {
                tracing::warn!(
                    %assessment_id,
                    kind = ?err.kind(),
                    error = %err,
                    "attempt rejected"
                );
            })?;

        let result = assessment.submit(answers, now)?.clone();
        let questions = assessment
            .questions()
            .iter()
            .map(|question| {
                let answer = result.answer_for(question.id());
                QuestionBreakdown {
                    question_id: question.id(),
                    text: question.text().to_string(),
                    question_type: question.question_type(),
                    answered: answer.is_some(),
                    earned: answer.map_or(0, AssessmentAnswer::score_earned),
                    possible: question.point_value(),
                }
            })
            .collect();

        tracing::info!(
            assessment_id = %assessment.id(),
            score = result.total_score(),
            max = result.maximum_possible_score(),
            level = %result.assigned_level(),
            "attempt graded"
        );

        Ok(AssessmentReport {
            id: Uuid::new_v4(),
            created_at: now,
            assessment_id: assessment.id(),
            skill_name: assessment.skill_name().to_string(),
            user_id: assessment.user_id(),
            questions,
            result,
            current_level: assessment.current_level(),
        })
    }

    fn score_submission(
        &self,
        assessment: &SkillAssessment,
        submission: &AnswerSubmission,
    ) -> DomainResult<AssessmentAnswer> {
        let question = assessment.question(submission.question_id())?;
        let mut answer = AssessmentAnswer::new(question);
        match submission {
            AnswerSubmission::Selection { options, .. } => {
                if question.question_type().is_manually_graded() {
                    return Err(DomainError::invalid_operation(format!(
                        "{} question {} needs a text answer",
                        question.question_type(),
                        question.id()
                    )));
                }
                let score = answer.select_options(question, options, self.config.rounding)?;
                tracing::debug!(question_id = %question.id(), score, "selection scored");
            }
            AnswerSubmission::Text { text, score, .. } => {
                answer.set_text_answer(question, text.as_str())?;
                if let Some(score) = score {
                    answer.grade_text(question, *score)?;
                }
            }
        }
        Ok(answer)
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn completion_report(
    course: &Course,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
    eligible: bool,
    completed_now: bool,
) -> DomainResult<CompletionReport> {
    let requirements = course
        .completion_requirements()
        .iter()
        .map(|requirement| {
            Ok(RequirementStatus {
                requirement_id: requirement.id(),
                criterion: requirement.criterion(),
                required_value: requirement.required_value(),
                is_required: requirement.is_required(),
                satisfied: requirement.is_satisfied_by(enrollment, now)?,
                description: requirement.description().to_string(),
                progress: requirement.progress_description(enrollment, now),
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    Ok(CompletionReport {
        id: Uuid::new_v4(),
        created_at: now,
        course_id: course.id(),
        course_title: course.title().to_string(),
        enrollment_id: enrollment.id(),
        user_id: enrollment.user_id(),
        status: enrollment.status(),
        progress_percentage: enrollment.progress_percentage(),
        progress_fallback: requirements.is_empty(),
        requirements,
        eligible,
        completed_now,
    })
}
