//! Completion criteria: the closed set of rule kinds a course can require.
//!
//! Each criterion is a pure predicate over an enrollment snapshot and a
//! required value, plus two display formatters used in completion reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enrollment::Enrollment;
use crate::model::normalize;

/// One testable rule type usable to gate course completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompletionCriterion {
    PercentageComplete,
    LessonsCompleted,
    MinimumGrade,
    MinimumDaysActive,
    AssignmentsCompleted,
    QuizzesCompleted,
    PassFinalExam,
    ParticipateInDiscussions,
    TakeFinalExam,
    AllLessonsCompleted,
}

impl CompletionCriterion {
    /// Every criterion, in id order.
    pub const ALL: [CompletionCriterion; 10] = [
        CompletionCriterion::PercentageComplete,
        CompletionCriterion::LessonsCompleted,
        CompletionCriterion::MinimumGrade,
        CompletionCriterion::MinimumDaysActive,
        CompletionCriterion::AssignmentsCompleted,
        CompletionCriterion::QuizzesCompleted,
        CompletionCriterion::PassFinalExam,
        CompletionCriterion::ParticipateInDiscussions,
        CompletionCriterion::TakeFinalExam,
        CompletionCriterion::AllLessonsCompleted,
    ];

    /// Stable numeric id, as stored by the persistence layer.
    pub fn id(self) -> u8 {
        match self {
            CompletionCriterion::PercentageComplete => 1,
            CompletionCriterion::LessonsCompleted => 2,
            CompletionCriterion::MinimumGrade => 3,
            CompletionCriterion::MinimumDaysActive => 4,
            CompletionCriterion::AssignmentsCompleted => 5,
            CompletionCriterion::QuizzesCompleted => 6,
            CompletionCriterion::PassFinalExam => 7,
            CompletionCriterion::ParticipateInDiscussions => 8,
            CompletionCriterion::TakeFinalExam => 9,
            CompletionCriterion::AllLessonsCompleted => 10,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|criterion| criterion.id() == id)
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            CompletionCriterion::PercentageComplete => "Percentage Complete",
            CompletionCriterion::LessonsCompleted => "Lessons Completed",
            CompletionCriterion::MinimumGrade => "Minimum Grade",
            CompletionCriterion::MinimumDaysActive => "Minimum Days Active",
            CompletionCriterion::AssignmentsCompleted => "Assignments Completed",
            CompletionCriterion::QuizzesCompleted => "Quizzes Completed",
            CompletionCriterion::PassFinalExam => "Pass Final Exam",
            CompletionCriterion::ParticipateInDiscussions => "Participate In Discussions",
            CompletionCriterion::TakeFinalExam => "Take Final Exam",
            CompletionCriterion::AllLessonsCompleted => "All Lessons Completed",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CompletionCriterion::PercentageComplete => {
                "Complete a minimum percentage of the course content"
            }
            CompletionCriterion::LessonsCompleted => "Complete a minimum number of lessons",
            CompletionCriterion::MinimumGrade => "Achieve a minimum final grade",
            CompletionCriterion::MinimumDaysActive => {
                "Stay enrolled for a minimum number of days"
            }
            CompletionCriterion::AssignmentsCompleted => {
                "Complete a minimum number of assignments"
            }
            CompletionCriterion::QuizzesCompleted => "Complete a minimum number of quizzes",
            CompletionCriterion::PassFinalExam => "Pass the final exam with a minimum score",
            CompletionCriterion::ParticipateInDiscussions => {
                "Post a minimum number of discussion messages"
            }
            CompletionCriterion::TakeFinalExam => "Take the final exam",
            CompletionCriterion::AllLessonsCompleted => "Complete every lesson in the course",
        }
    }

    /// Whether the criterion compares against a required value.
    /// `TakeFinalExam` and `AllLessonsCompleted` ignore it.
    pub fn uses_required_value(self) -> bool {
        !matches!(
            self,
            CompletionCriterion::TakeFinalExam | CompletionCriterion::AllLessonsCompleted
        )
    }

    /// Tests the enrollment against `required_value`. A missing enrollment is
    /// never satisfied.
    pub fn is_satisfied_by(
        self,
        enrollment: Option<&Enrollment>,
        required_value: u32,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(enrollment) = enrollment else {
            return false;
        };
        let required = f64::from(required_value);

        let satisfied = match self {
            CompletionCriterion::PercentageComplete => {
                enrollment.progress_percentage() >= required
            }
            CompletionCriterion::LessonsCompleted => {
                enrollment.completed_lesson_count() as u64 >= u64::from(required_value)
            }
            CompletionCriterion::MinimumGrade => enrollment
                .final_grade()
                .is_some_and(|grade| grade >= required),
            CompletionCriterion::MinimumDaysActive => {
                enrollment.days_active(now) >= i64::from(required_value)
            }
            CompletionCriterion::AssignmentsCompleted => {
                enrollment.completed_assignments() >= required_value
            }
            CompletionCriterion::QuizzesCompleted => {
                enrollment.completed_quizzes() >= required_value
            }
            CompletionCriterion::PassFinalExam => {
                enrollment.has_passed_final_exam()
                    && enrollment
                        .final_exam_score()
                        .is_some_and(|score| score >= required)
            }
            CompletionCriterion::ParticipateInDiscussions => {
                enrollment.discussion_post_count() >= required_value
            }
            CompletionCriterion::TakeFinalExam => enrollment.has_taken_final_exam(),
            // Vacuously true when no lessons are tracked.
            CompletionCriterion::AllLessonsCompleted => {
                enrollment.lesson_completions().values().all(|done| *done)
            }
        };

        tracing::debug!(
            criterion = self.name(),
            required_value,
            satisfied,
            enrollment_id = %enrollment.id(),
            "evaluated completion criterion"
        );
        satisfied
    }

    /// Human-readable statement of what the learner must do.
    pub fn requirement_description(self, required_value: u32) -> String {
        match self {
            CompletionCriterion::PercentageComplete => {
                format!("Complete at least {required_value}% of the course")
            }
            CompletionCriterion::LessonsCompleted => {
                format!("Complete at least {required_value} {}", plural(required_value, "lesson"))
            }
            CompletionCriterion::MinimumGrade => {
                format!("Achieve a final grade of at least {required_value}%")
            }
            CompletionCriterion::MinimumDaysActive => {
                format!("Stay enrolled for at least {required_value} {}", plural(required_value, "day"))
            }
            CompletionCriterion::AssignmentsCompleted => format!(
                "Complete at least {required_value} {}",
                plural(required_value, "assignment")
            ),
            CompletionCriterion::QuizzesCompleted => {
                format!("Complete at least {required_value} {}", plural(required_value, "quiz"))
            }
            CompletionCriterion::PassFinalExam => {
                format!("Pass the final exam with a score of at least {required_value}%")
            }
            CompletionCriterion::ParticipateInDiscussions => format!(
                "Post at least {required_value} discussion {}",
                plural(required_value, "message")
            ),
            CompletionCriterion::TakeFinalExam => "Take the final exam".to_string(),
            CompletionCriterion::AllLessonsCompleted => "Complete all lessons".to_string(),
        }
    }

    /// Human-readable statement of where the learner currently stands.
    pub fn progress_description(
        self,
        enrollment: Option<&Enrollment>,
        required_value: u32,
        now: DateTime<Utc>,
    ) -> String {
        let Some(enrollment) = enrollment else {
            return "Not enrolled".to_string();
        };

        match self {
            CompletionCriterion::PercentageComplete => format!(
                "{:.0}% of {required_value}% complete",
                enrollment.progress_percentage()
            ),
            CompletionCriterion::LessonsCompleted => format!(
                "{} of {required_value} lessons completed",
                enrollment.completed_lesson_count()
            ),
            CompletionCriterion::MinimumGrade => match enrollment.final_grade() {
                Some(grade) => format!("Current grade {grade:.1}% (need {required_value}%)"),
                None => "No grade yet".to_string(),
            },
            CompletionCriterion::MinimumDaysActive => format!(
                "{} of {required_value} days active",
                enrollment.days_active(now)
            ),
            CompletionCriterion::AssignmentsCompleted => format!(
                "{} of {required_value} assignments completed",
                enrollment.completed_assignments()
            ),
            CompletionCriterion::QuizzesCompleted => format!(
                "{} of {required_value} quizzes completed",
                enrollment.completed_quizzes()
            ),
            CompletionCriterion::PassFinalExam => match enrollment.final_exam_score() {
                Some(score) if enrollment.has_passed_final_exam() => {
                    format!("Passed with {score:.1}% (need {required_value}%)")
                }
                Some(score) => format!("Scored {score:.1}%, not yet passed"),
                None => "Final exam not taken".to_string(),
            },
            CompletionCriterion::ParticipateInDiscussions => format!(
                "{} of {required_value} discussion posts",
                enrollment.discussion_post_count()
            ),
            CompletionCriterion::TakeFinalExam => {
                if enrollment.has_taken_final_exam() {
                    "Final exam taken".to_string()
                } else {
                    "Final exam not taken".to_string()
                }
            }
            CompletionCriterion::AllLessonsCompleted => format!(
                "{} of {} lessons completed",
                enrollment.completed_lesson_count(),
                enrollment.lesson_completions().len()
            ),
        }
    }
}

fn plural(count: u32, noun: &str) -> String {
    match (count, noun) {
        (1, _) => noun.to_string(),
        (_, "quiz") => "quizzes".to_string(),
        _ => format!("{noun}s"),
    }
}

impl fmt::Display for CompletionCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompletionCriterion {
    type Err = String;

    /// Accepts a numeric id or any spelling of the name
    /// (`PassFinalExam`, `pass_final_exam`, `Pass Final Exam`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.trim().parse::<u8>() {
            return Self::from_id(id).ok_or_else(|| format!("unknown criterion id: {id}"));
        }
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|criterion| normalize(criterion.name()) == wanted)
            .ok_or_else(|| format!("unknown completion criterion: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn enrolled_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
    }

    fn enrollment() -> Enrollment {
        Enrollment::new(Uuid::new_v4(), Uuid::new_v4(), enrolled_at())
    }

    #[test]
    fn ids_are_stable_and_unique() {
        for (position, criterion) in CompletionCriterion::ALL.iter().enumerate() {
            assert_eq!(criterion.id() as usize, position + 1);
            assert_eq!(CompletionCriterion::from_id(criterion.id()), Some(*criterion));
        }
        assert_eq!(CompletionCriterion::from_id(0), None);
        assert_eq!(CompletionCriterion::from_id(11), None);
    }

    #[test]
    fn parse_accepts_names_and_ids() {
        assert_eq!(
            "pass_final_exam".parse::<CompletionCriterion>().unwrap(),
            CompletionCriterion::PassFinalExam
        );
        assert_eq!(
            "All Lessons Completed".parse::<CompletionCriterion>().unwrap(),
            CompletionCriterion::AllLessonsCompleted
        );
        assert_eq!(
            "4".parse::<CompletionCriterion>().unwrap(),
            CompletionCriterion::MinimumDaysActive
        );
        assert!("attendance".parse::<CompletionCriterion>().is_err());
        assert!("42".parse::<CompletionCriterion>().is_err());
    }

    #[test]
    fn missing_enrollment_is_never_satisfied() {
        for criterion in CompletionCriterion::ALL {
            assert!(!criterion.is_satisfied_by(None, 0, enrolled_at()));
        }
    }

    #[test]
    fn percentage_complete() {
        let mut e = enrollment();
        e.update_progress(80.0).unwrap();
        let c = CompletionCriterion::PercentageComplete;
        assert!(c.is_satisfied_by(Some(&e), 80, enrolled_at()));
        assert!(!c.is_satisfied_by(Some(&e), 81, enrolled_at()));
    }

    #[test]
    fn lessons_completed_counts_true_entries() {
        let mut e = enrollment();
        let lessons: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &lessons {
            e.register_lesson(*id);
        }
        e.complete_lesson(lessons[0], enrolled_at()).unwrap();
        e.complete_lesson(lessons[2], enrolled_at()).unwrap();
        let c = CompletionCriterion::LessonsCompleted;
        assert!(c.is_satisfied_by(Some(&e), 2, enrolled_at()));
        assert!(!c.is_satisfied_by(Some(&e), 3, enrolled_at()));
    }

    #[test]
    fn minimum_grade_requires_a_grade() {
        let mut e = enrollment();
        let c = CompletionCriterion::MinimumGrade;
        assert!(!c.is_satisfied_by(Some(&e), 0, enrolled_at()));
        e.set_final_grade(72.5).unwrap();
        assert!(c.is_satisfied_by(Some(&e), 72, enrolled_at()));
        assert!(!c.is_satisfied_by(Some(&e), 73, enrolled_at()));
    }

    #[test]
    fn minimum_days_active_uses_now() {
        let e = enrollment();
        let c = CompletionCriterion::MinimumDaysActive;
        assert!(!c.is_satisfied_by(Some(&e), 14, enrolled_at() + Duration::days(13)));
        assert!(c.is_satisfied_by(Some(&e), 14, enrolled_at() + Duration::days(14)));
    }

    #[test]
    fn counters() {
        let mut e = enrollment();
        for _ in 0..3 {
            e.record_assignment_completed();
            e.record_quiz_completed();
            e.record_discussion_post();
        }
        let now = enrolled_at();
        assert!(CompletionCriterion::AssignmentsCompleted.is_satisfied_by(Some(&e), 3, now));
        assert!(!CompletionCriterion::AssignmentsCompleted.is_satisfied_by(Some(&e), 4, now));
        assert!(CompletionCriterion::QuizzesCompleted.is_satisfied_by(Some(&e), 3, now));
        assert!(CompletionCriterion::ParticipateInDiscussions.is_satisfied_by(Some(&e), 3, now));
        assert!(!CompletionCriterion::ParticipateInDiscussions.is_satisfied_by(Some(&e), 4, now));
    }

    #[test]
    fn pass_final_exam_needs_pass_mark_and_required_score() {
        let mut e = enrollment();
        let c = CompletionCriterion::PassFinalExam;
        let now = enrolled_at();
        assert!(!c.is_satisfied_by(Some(&e), 60, now));

        // Above the required value but under the pass mark.
        e.record_final_exam(65.0).unwrap();
        assert!(!c.is_satisfied_by(Some(&e), 60, now));

        e.record_final_exam(85.0).unwrap();
        assert!(c.is_satisfied_by(Some(&e), 80, now));
        assert!(!c.is_satisfied_by(Some(&e), 90, now));
    }

    #[test]
    fn take_final_exam_counts_zero_score() {
        let mut e = enrollment();
        let c = CompletionCriterion::TakeFinalExam;
        assert!(!c.is_satisfied_by(Some(&e), 0, enrolled_at()));
        e.record_final_exam(0.0).unwrap();
        assert!(c.is_satisfied_by(Some(&e), 0, enrolled_at()));
    }

    #[test]
    fn all_lessons_completed_is_vacuously_true_without_lessons() {
        let e = enrollment();
        assert!(e.lesson_completions().is_empty());
        assert!(CompletionCriterion::AllLessonsCompleted.is_satisfied_by(
            Some(&e),
            0,
            enrolled_at()
        ));
    }

    #[test]
    fn all_lessons_completed_requires_every_lesson() {
        let mut e = enrollment();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        e.register_lesson(a);
        e.register_lesson(b);
        e.complete_lesson(a, enrolled_at()).unwrap();
        let c = CompletionCriterion::AllLessonsCompleted;
        assert!(!c.is_satisfied_by(Some(&e), 0, enrolled_at()));
        e.complete_lesson(b, enrolled_at()).unwrap();
        assert!(c.is_satisfied_by(Some(&e), 0, enrolled_at()));
    }

    #[test]
    fn threshold_criteria_are_monotonic() {
        let mut e = enrollment();
        e.update_progress(60.0).unwrap();
        e.set_final_grade(70.0).unwrap();
        for _ in 0..5 {
            e.record_assignment_completed();
            e.record_quiz_completed();
            e.record_discussion_post();
        }
        let lesson = Uuid::new_v4();
        e.register_lesson(lesson);
        e.complete_lesson(lesson, enrolled_at()).unwrap();
        e.update_progress(60.0).unwrap();

        let thresholds = [
            CompletionCriterion::PercentageComplete,
            CompletionCriterion::LessonsCompleted,
            CompletionCriterion::MinimumGrade,
            CompletionCriterion::AssignmentsCompleted,
            CompletionCriterion::QuizzesCompleted,
            CompletionCriterion::ParticipateInDiscussions,
        ];
        let now = enrolled_at();
        for criterion in thresholds {
            for value in 0..=120u32 {
                if criterion.is_satisfied_by(Some(&e), value, now) {
                    for lower in 0..=value {
                        assert!(
                            criterion.is_satisfied_by(Some(&e), lower, now),
                            "{criterion} satisfied at {value} but not at {lower}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn descriptions_render() {
        assert_eq!(
            CompletionCriterion::LessonsCompleted.requirement_description(1),
            "Complete at least 1 lesson"
        );
        assert_eq!(
            CompletionCriterion::QuizzesCompleted.requirement_description(3),
            "Complete at least 3 quizzes"
        );

        let mut e = enrollment();
        e.update_progress(42.0).unwrap();
        assert_eq!(
            CompletionCriterion::PercentageComplete.progress_description(Some(&e), 80, enrolled_at()),
            "42% of 80% complete"
        );
        assert_eq!(
            CompletionCriterion::TakeFinalExam.progress_description(None, 0, enrolled_at()),
            "Not enrolled"
        );
    }
}
