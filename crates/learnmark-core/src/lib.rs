//! learnmark-core — Course completion and skill assessment scoring engine.
//!
//! This crate holds the data model, ordered collections, completion
//! criteria, requirement aggregation, answer scoring and result
//! aggregation, plus the TOML scenario parser and JSON reports the CLI
//! builds on. Every operation is synchronous and takes the current time
//! explicitly.

pub mod assessment;
pub mod config;
pub mod course;
pub mod criteria;
pub mod engine;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod model;
pub mod ordering;
pub mod parser;
pub mod report;
pub mod requirements;
pub mod results;
pub mod scoring;
pub mod traits;

pub use assessment::{AssessmentQuestion, QuestionOption, SkillAssessment};
pub use course::{Course, CourseModule, Lesson};
pub use criteria::CompletionCriterion;
pub use engine::{AnswerSubmission, EngineConfig, LearningEngine};
pub use enrollment::Enrollment;
pub use error::{DomainError, DomainResult};
pub use events::DomainEvent;
pub use model::{EnrollmentStatus, LessonType, ProficiencyLevel, QuestionType};
pub use requirements::CompletionRequirement;
pub use results::AssessmentResult;
pub use scoring::{AssessmentAnswer, RoundingMode};
