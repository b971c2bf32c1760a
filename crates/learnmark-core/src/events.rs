//! Domain events recorded by the aggregates.
//!
//! Mutating operations append events to an outbox owned by the aggregate.
//! The persistence layer drains it with `take_events()` after a successful
//! commit and hands the records to whatever publishes notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ProficiencyLevel;

/// Something that happened to an enrollment or an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    /// A learner finished a lesson.
    LessonCompleted {
        enrollment_id: Uuid,
        lesson_id: Uuid,
        progress_percentage: f64,
        occurred_at: DateTime<Utc>,
    },

    /// An enrollment moved to `Completed`.
    EnrollmentCompleted {
        enrollment_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
        completed_at: DateTime<Utc>,
    },

    /// A completed enrollment went back to `Active` after a lesson was undone.
    EnrollmentReactivated {
        enrollment_id: Uuid,
        progress_percentage: f64,
    },

    /// A scored attempt was stored on an assessment.
    AssessmentSubmitted {
        assessment_id: Uuid,
        result_id: Uuid,
        user_id: Uuid,
        score_percentage: f64,
        level: ProficiencyLevel,
        occurred_at: DateTime<Utc>,
    },

    /// A second party signed off on an assessment.
    AssessmentVerified {
        assessment_id: Uuid,
        verified_by: Uuid,
        verified_at: DateTime<Utc>,
    },

    /// Assessment-level verification was withdrawn.
    AssessmentVerificationRemoved { assessment_id: Uuid },

    /// A second party signed off on a single result.
    ResultVerified {
        assessment_id: Uuid,
        result_id: Uuid,
        verified_by: Uuid,
        verified_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short machine-friendly name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::LessonCompleted { .. } => "lesson_completed",
            DomainEvent::EnrollmentCompleted { .. } => "enrollment_completed",
            DomainEvent::EnrollmentReactivated { .. } => "enrollment_reactivated",
            DomainEvent::AssessmentSubmitted { .. } => "assessment_submitted",
            DomainEvent::AssessmentVerified { .. } => "assessment_verified",
            DomainEvent::AssessmentVerificationRemoved { .. } => {
                "assessment_verification_removed"
            }
            DomainEvent::ResultVerified { .. } => "result_verified",
        }
    }
}
