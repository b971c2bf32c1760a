//! The enrollment aggregate: one learner's progress record in one course.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::events::DomainEvent;
use crate::model::EnrollmentStatus;

/// Final exam score at or above which the exam counts as passed.
pub const FINAL_EXAM_PASS_MARK: f64 = 70.0;

/// A user's registration in, and progress through, a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    status: EnrollmentStatus,
    progress_percentage: f64,
    lesson_completions: BTreeMap<Uuid, bool>,
    completed_assignments: u32,
    completed_quizzes: u32,
    final_grade: Option<f64>,
    /// `None` until an exam score is recorded; a recorded 0 still counts as taken.
    final_exam_score: Option<f64>,
    discussion_post_count: u32,
    note_count: u32,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pending_events: Vec<DomainEvent>,
}

impl Enrollment {
    /// Creates an `Active` enrollment with no recorded progress.
    pub fn new(user_id: Uuid, course_id: Uuid, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            status: EnrollmentStatus::Active,
            progress_percentage: 0.0,
            lesson_completions: BTreeMap::new(),
            completed_assignments: 0,
            completed_quizzes: 0,
            final_grade: None,
            final_exam_score: None,
            discussion_post_count: 0,
            note_count: 0,
            created_at: enrolled_at,
            completed_at: None,
            pending_events: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    pub fn progress_percentage(&self) -> f64 {
        self.progress_percentage
    }

    pub fn lesson_completions(&self) -> &BTreeMap<Uuid, bool> {
        &self.lesson_completions
    }

    /// Number of registered lessons marked complete.
    pub fn completed_lesson_count(&self) -> usize {
        self.lesson_completions.values().filter(|done| **done).count()
    }

    pub fn completed_assignments(&self) -> u32 {
        self.completed_assignments
    }

    pub fn completed_quizzes(&self) -> u32 {
        self.completed_quizzes
    }

    pub fn final_grade(&self) -> Option<f64> {
        self.final_grade
    }

    pub fn final_exam_score(&self) -> Option<f64> {
        self.final_exam_score
    }

    pub fn discussion_post_count(&self) -> u32 {
        self.discussion_post_count
    }

    pub fn note_count(&self) -> u32 {
        self.note_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn has_taken_final_exam(&self) -> bool {
        self.final_exam_score.is_some()
    }

    pub fn has_passed_final_exam(&self) -> bool {
        self.final_exam_score
            .is_some_and(|score| score >= FINAL_EXAM_PASS_MARK)
    }

    /// Whole days elapsed between enrollment and `now`; never negative.
    pub fn days_active(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Starts tracking a lesson as not yet completed. Already tracked lessons
    /// keep their state.
    pub fn register_lesson(&mut self, lesson_id: Uuid) {
        self.lesson_completions.entry(lesson_id).or_insert(false);
        self.recompute_progress();
    }

    /// Marks a tracked lesson complete.
    pub fn complete_lesson(&mut self, lesson_id: Uuid, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open("complete a lesson")?;
        let entry = self
            .lesson_completions
            .get_mut(&lesson_id)
            .ok_or_else(|| DomainError::not_found("lesson", lesson_id))?;
        if *entry {
            return Ok(());
        }
        *entry = true;
        self.recompute_progress();

        self.pending_events.push(DomainEvent::LessonCompleted {
            enrollment_id: self.id,
            lesson_id,
            progress_percentage: self.progress_percentage,
            occurred_at: now,
        });
        Ok(())
    }

    /// Undoes a lesson completion. A completed enrollment whose progress
    /// drops below 100 goes back to `Active`.
    pub fn uncomplete_lesson(&mut self, lesson_id: Uuid) -> DomainResult<()> {
        let entry = self
            .lesson_completions
            .get_mut(&lesson_id)
            .ok_or_else(|| DomainError::not_found("lesson", lesson_id))?;
        if !*entry {
            return Ok(());
        }
        *entry = false;

        let below_full = self.lesson_progress().is_some_and(|p| p < 100.0);
        if self.status == EnrollmentStatus::Completed && below_full {
            self.status = EnrollmentStatus::Active;
            self.completed_at = None;
            self.recompute_progress();
            self.pending_events.push(DomainEvent::EnrollmentReactivated {
                enrollment_id: self.id,
                progress_percentage: self.progress_percentage,
            });
        } else {
            self.recompute_progress();
        }
        Ok(())
    }

    /// Sets progress directly, for courses whose progress is tracked outside
    /// the lesson map.
    pub fn update_progress(&mut self, percentage: f64) -> DomainResult<()> {
        ensure_percentage("progress percentage", percentage)?;
        self.progress_percentage = percentage;
        Ok(())
    }

    pub fn set_final_grade(&mut self, grade: f64) -> DomainResult<()> {
        ensure_percentage("final grade", grade)?;
        self.final_grade = Some(grade);
        Ok(())
    }

    pub fn record_final_exam(&mut self, score: f64) -> DomainResult<()> {
        ensure_percentage("final exam score", score)?;
        self.final_exam_score = Some(score);
        Ok(())
    }

    pub fn record_assignment_completed(&mut self) {
        self.completed_assignments += 1;
    }

    pub fn record_quiz_completed(&mut self) {
        self.completed_quizzes += 1;
    }

    pub fn record_discussion_post(&mut self) {
        self.discussion_post_count += 1;
    }

    pub fn record_note(&mut self) {
        self.note_count += 1;
    }

    /// Moves the enrollment to `Completed`, forcing progress to 100.
    ///
    /// Returns `Ok(false)` when it was already completed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<bool> {
        if self.status == EnrollmentStatus::Completed {
            return Ok(false);
        }
        self.ensure_open("complete the enrollment")?;

        self.status = EnrollmentStatus::Completed;
        self.completed_at = Some(now);
        self.progress_percentage = 100.0;
        self.pending_events.push(DomainEvent::EnrollmentCompleted {
            enrollment_id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            completed_at: now,
        });
        Ok(true)
    }

    pub fn drop_out(&mut self) -> DomainResult<()> {
        if self.status == EnrollmentStatus::Completed {
            return Err(DomainError::invalid_operation(
                "cannot drop a completed enrollment",
            ));
        }
        self.status = EnrollmentStatus::Dropped;
        Ok(())
    }

    pub fn put_on_hold(&mut self) -> DomainResult<()> {
        match self.status {
            EnrollmentStatus::Active | EnrollmentStatus::Pending => {
                self.status = EnrollmentStatus::OnHold;
                Ok(())
            }
            other => Err(DomainError::invalid_operation(format!(
                "cannot put a {other} enrollment on hold"
            ))),
        }
    }

    /// Returns an on-hold or pending enrollment to `Active`.
    pub fn resume(&mut self) -> DomainResult<()> {
        match self.status {
            EnrollmentStatus::OnHold | EnrollmentStatus::Pending => {
                self.status = EnrollmentStatus::Active;
                Ok(())
            }
            other => Err(DomainError::invalid_operation(format!(
                "cannot resume a {other} enrollment"
            ))),
        }
    }

    pub fn expire(&mut self) -> DomainResult<()> {
        if self.status == EnrollmentStatus::Completed {
            return Err(DomainError::invalid_operation(
                "cannot expire a completed enrollment",
            ));
        }
        self.status = EnrollmentStatus::Expired;
        Ok(())
    }

    /// Drains the outbox of events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn ensure_open(&self, action: &str) -> DomainResult<()> {
        if self.status.is_closed() {
            return Err(DomainError::invalid_operation(format!(
                "cannot {action} on a {} enrollment",
                self.status
            )));
        }
        Ok(())
    }

    /// Share of tracked lessons completed, or `None` with no lessons.
    fn lesson_progress(&self) -> Option<f64> {
        let total = self.lesson_completions.len();
        if total == 0 {
            return None;
        }
        Some(self.completed_lesson_count() as f64 / total as f64 * 100.0)
    }

    /// A completed enrollment stays at 100%.
    fn recompute_progress(&mut self) {
        if self.status == EnrollmentStatus::Completed {
            self.progress_percentage = 100.0;
        } else if let Some(progress) = self.lesson_progress() {
            self.progress_percentage = progress;
        }
    }
}

fn ensure_percentage(what: &str, value: f64) -> DomainResult<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(DomainError::invalid_input(format!(
            "{what} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}
