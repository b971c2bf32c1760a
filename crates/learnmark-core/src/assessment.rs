//! Skill assessments, their questions and answer options.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::events::DomainEvent;
use crate::model::{ProficiencyLevel, QuestionType};
use crate::ordering::{Ordered, OrderedCollection};
use crate::results::{self, AssessmentResult};
use crate::scoring::AssessmentAnswer;

/// One selectable answer option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    id: Uuid,
    text: String,
    is_correct: bool,
    order_index: usize,
}

impl QuestionOption {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }
}

impl Ordered for QuestionOption {
    const KIND: &'static str = "option";

    fn id(&self) -> Uuid {
        self.id
    }
    fn order_index(&self) -> usize {
        self.order_index
    }
    fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

/// A question belonging to one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentQuestion {
    id: Uuid,
    assessment_id: Uuid,
    text: String,
    question_type: QuestionType,
    point_value: u32,
    order_index: usize,
    options: OrderedCollection<QuestionOption>,
}

impl AssessmentQuestion {
    pub fn new(
        assessment_id: Uuid,
        text: impl Into<String>,
        question_type: QuestionType,
        point_value: u32,
    ) -> DomainResult<Self> {
        Self::with_id(Uuid::new_v4(), assessment_id, text, question_type, point_value)
    }

    pub fn with_id(
        id: Uuid,
        assessment_id: Uuid,
        text: impl Into<String>,
        question_type: QuestionType,
        point_value: u32,
    ) -> DomainResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::invalid_input("question text must not be empty"));
        }
        if point_value == 0 {
            return Err(DomainError::invalid_input(
                "question point value must be positive",
            ));
        }
        Ok(Self {
            id,
            assessment_id,
            text,
            question_type,
            point_value,
            order_index: 0,
            options: OrderedCollection::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assessment_id(&self) -> Uuid {
        self.assessment_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    pub fn point_value(&self) -> u32 {
        self.point_value
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }

    pub fn options(&self) -> &[QuestionOption] {
        self.options.as_slice()
    }

    pub fn has_option(&self, option_id: Uuid) -> bool {
        self.options.contains(option_id)
    }

    pub fn correct_option_ids(&self) -> BTreeSet<Uuid> {
        self.options
            .iter()
            .filter(|option| option.is_correct)
            .map(QuestionOption::id)
            .collect()
    }

    pub fn set_point_value(&mut self, point_value: u32) -> DomainResult<()> {
        if point_value == 0 {
            return Err(DomainError::invalid_input(
                "question point value must be positive",
            ));
        }
        self.point_value = point_value;
        Ok(())
    }

    /// Appends an option and returns its id.
    pub fn add_option(&mut self, text: impl Into<String>, is_correct: bool) -> DomainResult<Uuid> {
        self.add_option_with_id(Uuid::new_v4(), text, is_correct)
    }

    pub fn add_option_with_id(
        &mut self,
        id: Uuid,
        text: impl Into<String>,
        is_correct: bool,
    ) -> DomainResult<Uuid> {
        let option = self.new_option(id, text.into(), is_correct)?;
        self.options.push(option)?;
        Ok(id)
    }

    pub fn insert_option_at(
        &mut self,
        index: usize,
        text: impl Into<String>,
        is_correct: bool,
    ) -> DomainResult<Uuid> {
        let id = Uuid::new_v4();
        let option = self.new_option(id, text.into(), is_correct)?;
        self.options.insert_at(index, option)?;
        Ok(id)
    }

    pub fn remove_option(&mut self, option_id: Uuid) -> DomainResult<QuestionOption> {
        self.options.remove(option_id)
    }

    pub fn reorder_options(&mut self, option_ids: &[Uuid]) -> DomainResult<()> {
        self.options.reorder(option_ids)
    }

    /// Flags or unflags an option as correct. Single-select questions keep at
    /// most one correct option.
    pub fn set_option_correct(&mut self, option_id: Uuid, is_correct: bool) -> DomainResult<()> {
        self.options.require(option_id)?;
        if is_correct {
            self.ensure_can_add_correct(Some(option_id))?;
        }
        self.options
            .update(option_id, |option| option.is_correct = is_correct)
    }

    fn new_option(&self, id: Uuid, text: String, is_correct: bool) -> DomainResult<QuestionOption> {
        if self.question_type.is_manually_graded() {
            return Err(DomainError::invalid_operation(format!(
                "{} questions do not have options",
                self.question_type
            )));
        }
        if text.trim().is_empty() {
            return Err(DomainError::invalid_input("option text must not be empty"));
        }
        if is_correct {
            self.ensure_can_add_correct(None)?;
        }
        Ok(QuestionOption {
            id,
            text,
            is_correct,
            order_index: 0,
        })
    }

    fn ensure_can_add_correct(&self, flagged: Option<Uuid>) -> DomainResult<()> {
        if !self.question_type.is_single_select() {
            return Ok(());
        }
        let other_correct = self
            .options
            .iter()
            .any(|option| option.is_correct && Some(option.id) != flagged);
        if other_correct {
            return Err(DomainError::invalid_operation(format!(
                "{} question {} already has a correct option",
                self.question_type, self.id
            )));
        }
        Ok(())
    }
}

impl Ordered for AssessmentQuestion {
    const KIND: &'static str = "question";

    fn id(&self) -> Uuid {
        self.id
    }
    fn order_index(&self) -> usize {
        self.order_index
    }
    fn set_order_index(&mut self, index: usize) {
        self.order_index = index;
    }
}

/// A user's self-declared skill, backed by scored question attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillAssessment {
    id: Uuid,
    user_id: Uuid,
    skill_name: String,
    questions: OrderedCollection<AssessmentQuestion>,
    results: Vec<AssessmentResult>,
    is_verified: bool,
    verified_by: Option<Uuid>,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl SkillAssessment {
    pub fn new(user_id: Uuid, skill_name: impl Into<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::with_id(Uuid::new_v4(), user_id, skill_name, now)
    }

    pub fn with_id(
        id: Uuid,
        user_id: Uuid,
        skill_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let skill_name = skill_name.into();
        if skill_name.trim().is_empty() {
            return Err(DomainError::invalid_input("skill name must not be empty"));
        }
        Ok(Self {
            id,
            user_id,
            skill_name,
            questions: OrderedCollection::new(),
            results: Vec::new(),
            is_verified: false,
            verified_by: None,
            verified_at: None,
            created_at: now,
            pending_events: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn skill_name(&self) -> &str {
        &self.skill_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn questions(&self) -> &[AssessmentQuestion] {
        self.questions.as_slice()
    }

    pub fn question(&self, question_id: Uuid) -> DomainResult<&AssessmentQuestion> {
        self.questions.require(question_id)
    }

    pub fn results(&self) -> &[AssessmentResult] {
        &self.results
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

    /// Sum of every question's point value, saturating at `u32::MAX`.
    pub fn maximum_possible_score(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |sum, q| sum.saturating_add(q.point_value()))
    }

    // --- questions ---

    /// Adds a new question at the end and returns its id.
    pub fn add_question(
        &mut self,
        text: impl Into<String>,
        question_type: QuestionType,
        point_value: u32,
    ) -> DomainResult<Uuid> {
        let question = AssessmentQuestion::new(self.id, text, question_type, point_value)?;
        let id = question.id();
        self.push_question(question)?;
        Ok(id)
    }

    /// Inserts a prepared question at `index`.
    pub fn insert_question_at(
        &mut self,
        index: usize,
        question: AssessmentQuestion,
    ) -> DomainResult<()> {
        if question.assessment_id() != self.id {
            return Err(DomainError::invalid_operation(format!(
                "question {} belongs to assessment {}, not {}",
                question.id(),
                question.assessment_id(),
                self.id
            )));
        }
        results::checked_total(
            self.questions
                .iter()
                .map(AssessmentQuestion::point_value)
                .chain([question.point_value()]),
            "maximum possible score",
        )?;
        self.questions.insert_at(index, question)
    }

    pub fn push_question(&mut self, question: AssessmentQuestion) -> DomainResult<usize> {
        let index = self.questions.len();
        self.insert_question_at(index, question)?;
        Ok(index)
    }

    pub fn remove_question(&mut self, question_id: Uuid) -> DomainResult<AssessmentQuestion> {
        self.questions.remove(question_id)
    }

    pub fn reorder_questions(&mut self, question_ids: &[Uuid]) -> DomainResult<()> {
        self.questions.reorder(question_ids)
    }

    /// Edits a question (options, point value) in place.
    pub fn update_question<R>(
        &mut self,
        question_id: Uuid,
        f: impl FnOnce(&mut AssessmentQuestion) -> R,
    ) -> DomainResult<R> {
        self.questions.update(question_id, f)
    }

    // --- attempts ---

    /// Builds a result from scored answers and stores it.
    pub fn submit(
        &mut self,
        answers: Vec<AssessmentAnswer>,
        now: DateTime<Utc>,
    ) -> DomainResult<&AssessmentResult> {
        let result = AssessmentResult::build(
            self.user_id,
            self.id,
            answers,
            self.questions.as_slice(),
            now,
        )?;

        self.pending_events.push(DomainEvent::AssessmentSubmitted {
            assessment_id: self.id,
            result_id: result.id(),
            user_id: self.user_id,
            score_percentage: result.score_percentage(),
            level: result.assigned_level(),
            occurred_at: now,
        });
        self.results.push(result);
        Ok(&self.results[self.results.len() - 1])
    }

    /// Verifies one stored result on behalf of `verifier_id`.
    pub fn verify_result(
        &mut self,
        result_id: Uuid,
        verifier_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let result = self
            .results
            .iter_mut()
            .find(|result| result.id() == result_id)
            .ok_or_else(|| DomainError::not_found("assessment result", result_id))?;
        result.verify(verifier_id, notes, now)?;

        self.pending_events.push(DomainEvent::ResultVerified {
            assessment_id: self.id,
            result_id,
            verified_by: verifier_id,
            verified_at: now,
        });
        Ok(())
    }

    /// Second-party sign-off on the assessment as a whole.
    pub fn verify(&mut self, verifier_id: Uuid, now: DateTime<Utc>) -> DomainResult<()> {
        if verifier_id == self.user_id {
            return Err(DomainError::invalid_operation(
                "users cannot verify their own assessment",
            ));
        }
        self.is_verified = true;
        self.verified_by = Some(verifier_id);
        self.verified_at = Some(now);

        tracing::info!(assessment_id = %self.id, verifier = %verifier_id, "assessment verified");
        self.pending_events.push(DomainEvent::AssessmentVerified {
            assessment_id: self.id,
            verified_by: verifier_id,
            verified_at: now,
        });
        Ok(())
    }

    pub fn remove_verification(&mut self) {
        if !self.is_verified {
            return;
        }
        self.is_verified = false;
        self.verified_by = None;
        self.verified_at = None;
        self.pending_events
            .push(DomainEvent::AssessmentVerificationRemoved {
                assessment_id: self.id,
            });
    }

    /// The assessment's standing level; see [`results::current_level`].
    pub fn current_level(&self) -> Option<ProficiencyLevel> {
        results::current_level(&self.results)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RoundingMode;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn question_requires_positive_points() {
        let err = AssessmentQuestion::new(Uuid::new_v4(), "Q", QuestionType::SingleChoice, 0)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn single_choice_allows_one_correct_option() {
        let mut q =
            AssessmentQuestion::new(Uuid::new_v4(), "Pick one", QuestionType::SingleChoice, 1)
                .unwrap();
        let a = q.add_option("A", true).unwrap();
        let b = q.add_option("B", false).unwrap();

        assert!(matches!(
            q.add_option("C", true),
            Err(DomainError::InvalidOperation(_))
        ));
        assert!(matches!(
            q.set_option_correct(b, true),
            Err(DomainError::InvalidOperation(_))
        ));

        // Moving the flag works once the old one is cleared.
        q.set_option_correct(a, false).unwrap();
        q.set_option_correct(b, true).unwrap();
        assert_eq!(q.correct_option_ids(), [b].into_iter().collect());

        // Re-flagging the same option is fine.
        q.set_option_correct(b, true).unwrap();
    }

    #[test]
    fn multiple_choice_allows_many_correct() {
        let mut q =
            AssessmentQuestion::new(Uuid::new_v4(), "Pick all", QuestionType::MultipleChoice, 3)
                .unwrap();
        q.add_option("A", true).unwrap();
        q.add_option("B", true).unwrap();
        assert_eq!(q.correct_option_ids().len(), 2);
    }

    #[test]
    fn open_text_has_no_options() {
        let mut q =
            AssessmentQuestion::new(Uuid::new_v4(), "Explain", QuestionType::OpenText, 5).unwrap();
        assert!(matches!(
            q.add_option("A", false),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn options_reindex() {
        let mut q =
            AssessmentQuestion::new(Uuid::new_v4(), "Order", QuestionType::Ordering, 4).unwrap();
        let a = q.add_option("A", true).unwrap();
        let b = q.add_option("B", true).unwrap();
        let c = q.insert_option_at(0, "C", false).unwrap();
        assert_eq!(
            q.options().iter().map(QuestionOption::id).collect::<Vec<_>>(),
            vec![c, a, b]
        );
        q.remove_option(a).unwrap();
        assert_eq!(
            q.options()
                .iter()
                .map(QuestionOption::order_index)
                .collect::<Vec<_>>(),
            vec![0, 1]
        );
        q.reorder_options(&[b, c]).unwrap();
        assert_eq!(q.options()[0].id(), b);
        assert!(q.set_option_correct(a, true).unwrap_err().is_not_found());
    }

    #[test]
    fn question_totals_must_fit() {
        let mut assessment = SkillAssessment::new(Uuid::new_v4(), "Rust", now()).unwrap();
        assessment
            .add_question("Big", QuestionType::OpenText, u32::MAX)
            .unwrap();
        let err = assessment
            .add_question("Small", QuestionType::OpenText, 1)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(assessment.questions().len(), 1);
        assert_eq!(assessment.maximum_possible_score(), u32::MAX);

        // A point value raised in place cannot panic the totals either.
        let big = assessment.questions()[0].id();
        let extra = AssessmentQuestion::new(assessment.id(), "Tiny", QuestionType::OpenText, 1)
            .unwrap();
        assessment
            .update_question(big, |q| q.set_point_value(u32::MAX - 1))
            .unwrap()
            .unwrap();
        assessment.push_question(extra).unwrap();
        assessment
            .update_question(big, |q| q.set_point_value(u32::MAX))
            .unwrap()
            .unwrap();
        assert_eq!(assessment.maximum_possible_score(), u32::MAX);
        assert!(matches!(
            assessment.submit(Vec::new(), now()),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(assessment.results().is_empty());
    }

    #[test]
    fn questions_reindex_and_sum_points() {
        let mut assessment = SkillAssessment::new(Uuid::new_v4(), "Rust", now()).unwrap();
        let q1 = assessment
            .add_question("One", QuestionType::SingleChoice, 2)
            .unwrap();
        let q2 = assessment
            .add_question("Two", QuestionType::MultipleChoice, 5)
            .unwrap();
        let q3 = assessment
            .add_question("Three", QuestionType::OpenText, 3)
            .unwrap();
        assert_eq!(assessment.maximum_possible_score(), 10);

        assessment.remove_question(q1).unwrap();
        assert_eq!(assessment.maximum_possible_score(), 8);
        assessment.reorder_questions(&[q3, q2]).unwrap();
        assert_eq!(assessment.questions()[0].id(), q3);
        assert_eq!(assessment.questions()[1].order_index(), 1);
    }

    #[test]
    fn foreign_question_is_rejected() {
        let mut assessment = SkillAssessment::new(Uuid::new_v4(), "Rust", now()).unwrap();
        let foreign =
            AssessmentQuestion::new(Uuid::new_v4(), "Q", QuestionType::TrueFalse, 1).unwrap();
        assert!(matches!(
            assessment.push_question(foreign),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn submit_stores_result_and_records_event() {
        let user = Uuid::new_v4();
        let mut assessment = SkillAssessment::new(user, "Rust", now()).unwrap();
        let qid = assessment
            .add_question("Borrowing?", QuestionType::SingleChoice, 4)
            .unwrap();
        let right = assessment
            .update_question(qid, |q| q.add_option("yes", true))
            .unwrap()
            .unwrap();
        assessment
            .update_question(qid, |q| q.add_option("no", false))
            .unwrap()
            .unwrap();

        let question = assessment.question(qid).unwrap().clone();
        let mut answer = AssessmentAnswer::new(&question);
        answer
            .select_options(&question, &[right], RoundingMode::default())
            .unwrap();

        let result = assessment.submit(vec![answer], now()).unwrap();
        assert_eq!(result.total_score(), 4);
        assert_eq!(result.assigned_level(), ProficiencyLevel::Expert);
        assert_eq!(assessment.results().len(), 1);
        assert_eq!(assessment.current_level(), Some(ProficiencyLevel::Expert));

        let events = assessment.take_events();
        assert!(matches!(events[0], DomainEvent::AssessmentSubmitted { .. }));
    }

    #[test]
    fn self_verification_is_rejected() {
        let user = Uuid::new_v4();
        let mut assessment = SkillAssessment::new(user, "Rust", now()).unwrap();
        assert!(matches!(
            assessment.verify(user, now()),
            Err(DomainError::InvalidOperation(_))
        ));
        assert!(!assessment.is_verified());
    }

    #[test]
    fn verification_can_be_removed() {
        let mut assessment = SkillAssessment::new(Uuid::new_v4(), "Rust", now()).unwrap();
        let reviewer = Uuid::new_v4();
        assessment.verify(reviewer, now()).unwrap();
        assert_eq!(assessment.verified_by(), Some(reviewer));

        assessment.remove_verification();
        assert!(!assessment.is_verified());
        assert!(assessment.verified_at().is_none());

        let names: Vec<&str> = assessment.take_events().iter().map(DomainEvent::name).collect();
        assert_eq!(names, vec!["assessment_verified", "assessment_verification_removed"]);
    }

    #[test]
    fn verify_unknown_result_is_not_found() {
        let mut assessment = SkillAssessment::new(Uuid::new_v4(), "Rust", now()).unwrap();
        let err = assessment
            .verify_result(Uuid::new_v4(), Uuid::new_v4(), None, now())
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
