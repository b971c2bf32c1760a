//! Completion requirements and their aggregation.
//!
//! A requirement attaches one [`CompletionCriterion`] to a course with a
//! required value and a required/optional flag. The aggregation functions
//! decide whether an enrollment meets every required rule and can move it to
//! `Completed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::CompletionCriterion;
use crate::enrollment::Enrollment;
use crate::error::{DomainError, DomainResult};
use crate::model::EnrollmentStatus;
use crate::ordering::Ordered;

/// A criterion instance attached to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequirement {
    id: Uuid,
    course_id: Uuid,
    criterion: CompletionCriterion,
    required_value: u32,
    is_required: bool,
    order_index: usize,
    description: String,
}

impl CompletionRequirement {
    /// Builds a requirement for `course_id`. Criteria that compare against a
    /// threshold need a strictly positive `required_value`.
    pub fn new(
        course_id: Uuid,
        criterion: CompletionCriterion,
        required_value: u32,
        is_required: bool,
        description: impl Into<String>,
    ) -> DomainResult<Self> {
        if criterion.uses_required_value() && required_value == 0 {
            return Err(DomainError::invalid_input(format!(
                "{criterion} requires a positive required value"
            )));
        }
        let description = description.into();
        let description = if description.trim().is_empty() {
            criterion.requirement_description(required_value)
        } else {
            description
        };

        Ok(Self {
            id: Uuid::new_v4(),
            course_id,
            criterion,
            required_value,
            is_required,
            order_index: 0,
            description,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn course_id(&self) -> Uuid {
        self.course_id
    }

    pub fn criterion(&self) -> CompletionCriterion {
        self.criterion
    }

    pub fn required_value(&self) -> u32 {
        self.required_value
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_required(&mut self, is_required: bool) {
        self.is_required = is_required;
    }

    pub fn set_required_value(&mut self, required_value: u32) -> DomainResult<()> {
        if self.criterion.uses_required_value() && required_value == 0 {
            return Err(DomainError::invalid_input(format!(
                "{} requires a positive required value",
                self.criterion
            )));
        }
        self.required_value = required_value;
        Ok(())
    }

    /// Tests the enrollment against this requirement.
    ///
    /// An enrollment from another course is rejected rather than evaluated.
    pub fn is_satisfied_by(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> DomainResult<bool> {
        self.ensure_same_course(enrollment)?;
        Ok(self
            .criterion
            .is_satisfied_by(Some(enrollment), self.required_value, now))
    }

    /// Display text describing the learner's current standing.
    pub fn progress_description(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> String {
        self.criterion
            .progress_description(Some(enrollment), self.required_value, now)
    }

    fn ensure_same_course(&self, enrollment: &Enrollment) -> DomainResult<()> {
        if enrollment.course_id() != self.course_id {
            return Err(DomainError::invalid_operation(format!(
                "requirement {} belongs to course {} but enrollment {} is for course {}",
                self.id,
                self.course_id,
                enrollment.id(),
                enrollment.course_id()
            )));
        }
        Ok(())
    }
}

impl Ordered for CompletionRequirement {
    const KIND: &'static str = "completion requirement";

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

/// Returns `true` when every requirement flagged as required is satisfied.
/// Optional requirements are ignored, and an empty required set is satisfied.
///
/// Every requirement, optional or not, must belong to the enrollment's course.
pub fn all_required_satisfied<'a>(
    enrollment: &Enrollment,
    requirements: impl IntoIterator<Item = &'a CompletionRequirement>,
    now: DateTime<Utc>,
) -> DomainResult<bool> {
    let mut all_satisfied = true;
    for requirement in requirements {
        requirement.ensure_same_course(enrollment)?;
        if requirement.is_required && !requirement.is_satisfied_by(enrollment, now)? {
            all_satisfied = false;
        }
    }
    Ok(all_satisfied)
}

/// Course-level completion check. With no requirements at all the course
/// falls back to "progress is 100%".
pub fn check_enrollment_completion(
    enrollment: &Enrollment,
    requirements: &[CompletionRequirement],
    now: DateTime<Utc>,
) -> DomainResult<bool> {
    if requirements.is_empty() {
        return Ok(enrollment.progress_percentage() >= 100.0);
    }
    all_required_satisfied(enrollment, requirements, now)
}

/// Completes the enrollment when all required requirements are satisfied.
///
/// Already completed enrollments succeed without change once every
/// requirement is known to share their course. Otherwise the enrollment is
/// only touched when the requirements pass.
pub fn try_auto_complete(
    enrollment: &mut Enrollment,
    requirements: &[CompletionRequirement],
    now: DateTime<Utc>,
) -> DomainResult<bool> {
    for requirement in requirements {
        requirement.ensure_same_course(enrollment)?;
    }
    if enrollment.status() == EnrollmentStatus::Completed {
        return Ok(true);
    }
    if !all_required_satisfied(enrollment, requirements, now)? {
        return Ok(false);
    }

    enrollment.complete(now)?;
    tracing::info!(
        enrollment_id = %enrollment.id(),
        course_id = %enrollment.course_id(),
        "enrollment auto-completed"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
    }

    fn requirement(
        course_id: Uuid,
        criterion: CompletionCriterion,
        value: u32,
        required: bool,
    ) -> CompletionRequirement {
        CompletionRequirement::new(course_id, criterion, value, required, "").unwrap()
    }

    #[test]
    fn new_rejects_zero_threshold() {
        let err = CompletionRequirement::new(
            Uuid::new_v4(),
            CompletionCriterion::MinimumGrade,
            0,
            true,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        // Criteria without a threshold accept zero.
        assert!(CompletionRequirement::new(
            Uuid::new_v4(),
            CompletionCriterion::TakeFinalExam,
            0,
            true,
            ""
        )
        .is_ok());
    }

    #[test]
    fn blank_description_falls_back_to_criterion_text() {
        let r = requirement(Uuid::new_v4(), CompletionCriterion::QuizzesCompleted, 2, true);
        assert_eq!(r.description(), "Complete at least 2 quizzes");
    }

    #[test]
    fn optional_requirements_do_not_block() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        enrollment.update_progress(100.0).unwrap();

        let requirements = vec![
            requirement(course, CompletionCriterion::PercentageComplete, 100, true),
            requirement(course, CompletionCriterion::MinimumGrade, 90, false),
        ];
        assert!(all_required_satisfied(&enrollment, &requirements, now()).unwrap());
    }

    #[test]
    fn only_optional_requirements_is_satisfied() {
        let course = Uuid::new_v4();
        let enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        let requirements = vec![requirement(
            course,
            CompletionCriterion::MinimumGrade,
            90,
            false,
        )];
        assert!(all_required_satisfied(&enrollment, &requirements, now()).unwrap());
    }

    #[test]
    fn failing_required_requirement_blocks() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        enrollment.update_progress(100.0).unwrap();
        let requirements = vec![
            requirement(course, CompletionCriterion::PercentageComplete, 100, true),
            requirement(course, CompletionCriterion::MinimumGrade, 60, true),
        ];
        assert!(!all_required_satisfied(&enrollment, &requirements, now()).unwrap());
    }

    #[test]
    fn cross_course_requirement_is_rejected() {
        let enrollment = Enrollment::new(Uuid::new_v4(), Uuid::new_v4(), now());
        let foreign = requirement(Uuid::new_v4(), CompletionCriterion::TakeFinalExam, 0, true);
        assert!(matches!(
            foreign.is_satisfied_by(&enrollment, now()),
            Err(DomainError::InvalidOperation(_))
        ));

        let optional_foreign =
            requirement(Uuid::new_v4(), CompletionCriterion::TakeFinalExam, 0, false);
        assert!(matches!(
            all_required_satisfied(&enrollment, [&optional_foreign], now()),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn no_requirements_falls_back_to_full_progress() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        enrollment.update_progress(99.0).unwrap();
        assert!(!check_enrollment_completion(&enrollment, &[], now()).unwrap());
        enrollment.update_progress(100.0).unwrap();
        assert!(check_enrollment_completion(&enrollment, &[], now()).unwrap());
    }

    #[test]
    fn try_auto_complete_transitions_when_satisfied() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        for _ in 0..2 {
            enrollment.record_assignment_completed();
        }
        let requirements = vec![requirement(
            course,
            CompletionCriterion::AssignmentsCompleted,
            2,
            true,
        )];

        assert!(try_auto_complete(&mut enrollment, &requirements, now()).unwrap());
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
        assert_eq!(enrollment.progress_percentage(), 100.0);
        assert_eq!(enrollment.completed_at(), Some(now()));
    }

    #[test]
    fn try_auto_complete_leaves_state_when_unsatisfied() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        enrollment.update_progress(40.0).unwrap();
        let before = enrollment.clone();
        let requirements = vec![requirement(
            course,
            CompletionCriterion::PercentageComplete,
            80,
            true,
        )];

        assert!(!try_auto_complete(&mut enrollment, &requirements, now()).unwrap());
        assert_eq!(enrollment, before);
    }

    #[test]
    fn try_auto_complete_is_noop_for_completed() {
        let course = Uuid::new_v4();
        let mut enrollment = Enrollment::new(Uuid::new_v4(), course, now());
        enrollment.complete(now()).unwrap();
        enrollment.take_events();
        let requirements = vec![requirement(
            course,
            CompletionCriterion::MinimumGrade,
            99,
            true,
        )];
        assert!(try_auto_complete(&mut enrollment, &requirements, now()).unwrap());
        assert!(enrollment.take_events().is_empty());
    }

    #[test]
    fn try_auto_complete_rejects_other_course_when_completed() {
        let mut enrollment = Enrollment::new(Uuid::new_v4(), Uuid::new_v4(), now());
        enrollment.complete(now()).unwrap();
        let requirements = vec![requirement(
            Uuid::new_v4(),
            CompletionCriterion::TakeFinalExam,
            0,
            false,
        )];
        let err = try_auto_complete(&mut enrollment, &requirements, now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
    }
}
