//! The course aggregate: ordered modules of ordered lessons, plus the
//! ordered completion requirements that gate completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criteria::CompletionCriterion;
use crate::enrollment::Enrollment;
use crate::error::{DomainError, DomainResult};
use crate::model::{EnrollmentStatus, LessonType};
use crate::ordering::{Ordered, OrderedCollection};
use crate::requirements::{self, CompletionRequirement};

/// A single unit of content inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    id: Uuid,
    title: String,
    lesson_type: LessonType,
    duration_minutes: u32,
    order_index: usize,
}

impl Lesson {
    pub fn new(title: impl Into<String>, lesson_type: LessonType, duration_minutes: u32) -> DomainResult<Self> {
        Self::with_id(Uuid::new_v4(), title, lesson_type, duration_minutes)
    }

    /// Builds a lesson with a caller-chosen id, e.g. one derived from a
    /// scenario key.
    pub fn with_id(
        id: Uuid,
        title: impl Into<String>,
        lesson_type: LessonType,
        duration_minutes: u32,
    ) -> DomainResult<Self> {
        let title = title.into();
        ensure_title("lesson", &title)?;
        Ok(Self {
            id,
            title,
            lesson_type,
            duration_minutes,
            order_index: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lesson_type(&self) -> LessonType {
        self.lesson_type
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }
}

impl Ordered for Lesson {
    const KIND: &'static str = "lesson";

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

/// A titled group of lessons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseModule {
    id: Uuid,
    title: String,
    order_index: usize,
    lessons: OrderedCollection<Lesson>,
}

impl CourseModule {
    pub fn new(title: impl Into<String>) -> DomainResult<Self> {
        Self::with_id(Uuid::new_v4(), title)
    }

    pub fn with_id(id: Uuid, title: impl Into<String>) -> DomainResult<Self> {
        let title = title.into();
        ensure_title("module", &title)?;
        Ok(Self {
            id,
            title,
            order_index: 0,
            lessons: OrderedCollection::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> usize {
        self.order_index
    }

    pub fn lessons(&self) -> &[Lesson] {
        self.lessons.as_slice()
    }

    pub fn total_duration_minutes(&self) -> u32 {
        self.lessons.iter().map(Lesson::duration_minutes).sum()
    }
}

impl Ordered for CourseModule {
    const KIND: &'static str = "module";

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

/// A course with its content outline and completion rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    id: Uuid,
    title: String,
    instructor_id: Uuid,
    modules: OrderedCollection<CourseModule>,
    requirements: OrderedCollection<CompletionRequirement>,
}

impl Course {
    pub fn new(title: impl Into<String>, instructor_id: Uuid) -> DomainResult<Self> {
        Self::with_id(Uuid::new_v4(), title, instructor_id)
    }

    pub fn with_id(id: Uuid, title: impl Into<String>, instructor_id: Uuid) -> DomainResult<Self> {
        let title = title.into();
        ensure_title("course", &title)?;
        Ok(Self {
            id,
            title,
            instructor_id,
            modules: OrderedCollection::new(),
            requirements: OrderedCollection::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn instructor_id(&self) -> Uuid {
        self.instructor_id
    }

    pub fn modules(&self) -> &[CourseModule] {
        self.modules.as_slice()
    }

    pub fn module(&self, module_id: Uuid) -> DomainResult<&CourseModule> {
        self.modules.require(module_id)
    }

    /// Every lesson id, module by module, in display order.
    pub fn lesson_ids(&self) -> Vec<Uuid> {
        self.modules
            .iter()
            .flat_map(|module| module.lessons.iter().map(Lesson::id))
            .collect()
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|module| module.lessons.len()).sum()
    }

    pub fn completion_requirements(&self) -> &[CompletionRequirement] {
        self.requirements.as_slice()
    }

    // --- modules ---

    pub fn add_module(&mut self, module: CourseModule) -> DomainResult<usize> {
        self.modules.push(module)
    }

    pub fn insert_module_at(&mut self, index: usize, module: CourseModule) -> DomainResult<()> {
        self.modules.insert_at(index, module)
    }

    pub fn remove_module(&mut self, module_id: Uuid) -> DomainResult<CourseModule> {
        self.modules.remove(module_id)
    }

    pub fn reorder_modules(&mut self, module_ids: &[Uuid]) -> DomainResult<()> {
        self.modules.reorder(module_ids)
    }

    // --- lessons ---

    pub fn add_lesson(&mut self, module_id: Uuid, lesson: Lesson) -> DomainResult<usize> {
        self.ensure_lesson_unique(lesson.id)?;
        self.modules
            .update(module_id, |module| module.lessons.push(lesson))?
    }

    pub fn insert_lesson_at(
        &mut self,
        module_id: Uuid,
        index: usize,
        lesson: Lesson,
    ) -> DomainResult<()> {
        self.ensure_lesson_unique(lesson.id)?;
        self.modules
            .update(module_id, |module| module.lessons.insert_at(index, lesson))?
    }

    pub fn remove_lesson(&mut self, module_id: Uuid, lesson_id: Uuid) -> DomainResult<Lesson> {
        self.modules
            .update(module_id, |module| module.lessons.remove(lesson_id))?
    }

    pub fn reorder_lessons(&mut self, module_id: Uuid, lesson_ids: &[Uuid]) -> DomainResult<()> {
        self.modules
            .update(module_id, |module| module.lessons.reorder(lesson_ids))?
    }

    // --- completion requirements ---

    /// Appends a requirement for this course and returns its id.
    pub fn add_completion_requirement(
        &mut self,
        criterion: CompletionCriterion,
        required_value: u32,
        is_required: bool,
        description: impl Into<String>,
    ) -> DomainResult<Uuid> {
        let requirement =
            CompletionRequirement::new(self.id, criterion, required_value, is_required, description)?;
        let id = requirement.id();
        self.requirements.push(requirement)?;
        Ok(id)
    }

    /// Places a requirement at `index`, shifting later ones down.
    pub fn insert_completion_requirement_at(
        &mut self,
        index: usize,
        requirement: CompletionRequirement,
    ) -> DomainResult<()> {
        if requirement.course_id() != self.id {
            return Err(DomainError::invalid_operation(format!(
                "requirement {} belongs to course {}, not {}",
                requirement.id(),
                requirement.course_id(),
                self.id
            )));
        }
        self.requirements.insert_at(index, requirement)
    }

    pub fn remove_completion_requirement(
        &mut self,
        requirement_id: Uuid,
    ) -> DomainResult<CompletionRequirement> {
        self.requirements.remove(requirement_id)
    }

    pub fn reorder_completion_requirements(&mut self, requirement_ids: &[Uuid]) -> DomainResult<()> {
        self.requirements.reorder(requirement_ids)
    }

    pub fn update_completion_requirement<R>(
        &mut self,
        requirement_id: Uuid,
        f: impl FnOnce(&mut CompletionRequirement) -> R,
    ) -> DomainResult<R> {
        self.requirements.update(requirement_id, f)
    }

    // --- enrollments ---

    /// Enrolls a user, registering every current lesson as not completed.
    pub fn enroll(&self, user_id: Uuid, now: DateTime<Utc>) -> Enrollment {
        let mut enrollment = Enrollment::new(user_id, self.id, now);
        for lesson_id in self.lesson_ids() {
            enrollment.register_lesson(lesson_id);
        }
        enrollment
    }

    /// Whether the enrollment meets this course's completion rules.
    pub fn check_enrollment_completion(
        &self,
        enrollment: &Enrollment,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.ensure_enrollment(enrollment)?;
        requirements::check_enrollment_completion(enrollment, self.requirements.as_slice(), now)
    }

    /// Completes the enrollment if every required requirement is satisfied.
    ///
    /// A course without requirements only completes enrollments at 100%
    /// progress.
    pub fn try_auto_complete(
        &self,
        enrollment: &mut Enrollment,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.ensure_enrollment(enrollment)?;
        if self.requirements.is_empty()
            && enrollment.status() != EnrollmentStatus::Completed
            && enrollment.progress_percentage() < 100.0
        {
            return Ok(false);
        }
        requirements::try_auto_complete(enrollment, self.requirements.as_slice(), now)
    }

    fn ensure_enrollment(&self, enrollment: &Enrollment) -> DomainResult<()> {
        if enrollment.course_id() != self.id {
            return Err(DomainError::invalid_operation(format!(
                "enrollment {} is for course {}, not {}",
                enrollment.id(),
                enrollment.course_id(),
                self.id
            )));
        }
        Ok(())
    }

    fn ensure_lesson_unique(&self, lesson_id: Uuid) -> DomainResult<()> {
        if self.lesson_ids().contains(&lesson_id) {
            return Err(DomainError::invalid_operation(format!(
                "lesson {lesson_id} already exists in course {}",
                self.id
            )));
        }
        Ok(())
    }
}

fn ensure_title(kind: &str, title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::invalid_input(format!("{kind} title must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap()
    }

    fn course_with_lessons(per_module: &[usize]) -> Course {
        let mut course = Course::new("Rust Foundations", Uuid::new_v4()).unwrap();
        for (m, count) in per_module.iter().enumerate() {
            let module = CourseModule::new(format!("Module {m}")).unwrap();
            let module_id = module.id();
            course.add_module(module).unwrap();
            for l in 0..*count {
                let lesson = Lesson::new(format!("Lesson {m}.{l}"), LessonType::Video, 10).unwrap();
                course.add_lesson(module_id, lesson).unwrap();
            }
        }
        course
    }

    fn indices<T: Ordered>(items: &[T]) -> Vec<usize> {
        items.iter().map(Ordered::order_index).collect()
    }

    #[test]
    fn blank_titles_are_rejected() {
        assert!(Course::new("  ", Uuid::new_v4()).is_err());
        assert!(CourseModule::new("").is_err());
        assert!(Lesson::new("", LessonType::Article, 5).is_err());
    }

    #[test]
    fn modules_keep_dense_order() {
        let mut course = course_with_lessons(&[1, 1, 1]);
        let ids: Vec<Uuid> = course.modules().iter().map(CourseModule::id).collect();

        course.remove_module(ids[0]).unwrap();
        assert_eq!(indices(course.modules()), vec![0, 1]);

        let intro = CourseModule::new("Intro").unwrap();
        let intro_id = intro.id();
        course.insert_module_at(0, intro).unwrap();
        assert_eq!(indices(course.modules()), vec![0, 1, 2]);
        assert_eq!(course.modules()[0].id(), intro_id);

        course.reorder_modules(&[ids[2], intro_id, ids[1]]).unwrap();
        assert_eq!(course.modules()[0].id(), ids[2]);
        assert_eq!(indices(course.modules()), vec![0, 1, 2]);
    }

    #[test]
    fn lessons_reindex_within_module() {
        let mut course = course_with_lessons(&[3]);
        let module_id = course.modules()[0].id();
        let lesson_ids: Vec<Uuid> = course.modules()[0].lessons().iter().map(Lesson::id).collect();

        course.remove_lesson(module_id, lesson_ids[1]).unwrap();
        assert_eq!(indices(course.modules()[0].lessons()), vec![0, 1]);

        course
            .reorder_lessons(module_id, &[lesson_ids[2], lesson_ids[0]])
            .unwrap();
        assert_eq!(course.modules()[0].lessons()[0].id(), lesson_ids[2]);
        assert_eq!(course.lesson_count(), 2);
        assert_eq!(course.modules()[0].total_duration_minutes(), 20);
    }

    #[test]
    fn lesson_operations_on_unknown_module_are_not_found() {
        let mut course = course_with_lessons(&[1]);
        let lesson = Lesson::new("Orphan", LessonType::Quiz, 5).unwrap();
        let err = course.add_lesson(Uuid::new_v4(), lesson).unwrap_err();
        assert!(err.is_not_found());

        let module_id = course.modules()[0].id();
        let err = course.remove_lesson(module_id, Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn lesson_ids_are_unique_across_modules() {
        let mut course = course_with_lessons(&[1, 0]);
        let existing = course.modules()[0].lessons()[0].clone();
        let second = course.modules()[1].id();
        assert!(matches!(
            course.add_lesson(second, existing),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn requirements_reindex() {
        let mut course = course_with_lessons(&[1]);
        let a = course
            .add_completion_requirement(CompletionCriterion::PercentageComplete, 100, true, "")
            .unwrap();
        let b = course
            .add_completion_requirement(CompletionCriterion::MinimumGrade, 70, true, "")
            .unwrap();
        let c = course
            .add_completion_requirement(CompletionCriterion::TakeFinalExam, 0, false, "")
            .unwrap();

        course.remove_completion_requirement(a).unwrap();
        assert_eq!(indices(course.completion_requirements()), vec![0, 1]);

        course.reorder_completion_requirements(&[c, b]).unwrap();
        assert_eq!(course.completion_requirements()[0].id(), c);

        let err = course.remove_completion_requirement(a).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn foreign_requirement_cannot_be_inserted() {
        let mut course = course_with_lessons(&[]);
        let foreign = CompletionRequirement::new(
            Uuid::new_v4(),
            CompletionCriterion::TakeFinalExam,
            0,
            true,
            "",
        )
        .unwrap();
        assert!(matches!(
            course.insert_completion_requirement_at(0, foreign),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn enroll_registers_every_lesson() {
        let course = course_with_lessons(&[2, 3]);
        let enrollment = course.enroll(Uuid::new_v4(), now());
        assert_eq!(enrollment.lesson_completions().len(), 5);
        assert_eq!(enrollment.course_id(), course.id());
    }

    #[test]
    fn completion_without_requirements_needs_full_progress() {
        let course = course_with_lessons(&[2]);
        let mut enrollment = course.enroll(Uuid::new_v4(), now());
        let lessons = course.lesson_ids();

        enrollment.complete_lesson(lessons[0], now()).unwrap();
        assert!(!course.check_enrollment_completion(&enrollment, now()).unwrap());
        enrollment.complete_lesson(lessons[1], now()).unwrap();
        assert!(course.check_enrollment_completion(&enrollment, now()).unwrap());
    }

    #[test]
    fn auto_complete_without_requirements_waits_for_full_progress() {
        let course = course_with_lessons(&[2]);
        let mut enrollment = course.enroll(Uuid::new_v4(), now());
        let lessons = course.lesson_ids();

        enrollment.complete_lesson(lessons[0], now()).unwrap();
        assert!(!course.try_auto_complete(&mut enrollment, now()).unwrap());
        assert_eq!(enrollment.status(), EnrollmentStatus::Active);

        enrollment.complete_lesson(lessons[1], now()).unwrap();
        assert!(course.try_auto_complete(&mut enrollment, now()).unwrap());
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
    }

    #[test]
    fn enrollment_for_other_course_is_rejected() {
        let course = course_with_lessons(&[1]);
        let other = course_with_lessons(&[1]);
        let mut enrollment = other.enroll(Uuid::new_v4(), now());
        assert!(matches!(
            course.check_enrollment_completion(&enrollment, now()),
            Err(DomainError::InvalidOperation(_))
        ));
        assert!(matches!(
            course.try_auto_complete(&mut enrollment, now()),
            Err(DomainError::InvalidOperation(_))
        ));
    }

    #[test]
    fn auto_complete_through_course() {
        let mut course = course_with_lessons(&[1]);
        course
            .add_completion_requirement(CompletionCriterion::AllLessonsCompleted, 0, true, "")
            .unwrap();
        let mut enrollment = course.enroll(Uuid::new_v4(), now());

        assert!(!course.try_auto_complete(&mut enrollment, now()).unwrap());
        enrollment
            .complete_lesson(course.lesson_ids()[0], now())
            .unwrap();
        assert!(course.try_auto_complete(&mut enrollment, now()).unwrap());
        assert_eq!(enrollment.status(), EnrollmentStatus::Completed);
    }
}
