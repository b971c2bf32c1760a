//! End-to-end pipeline tests over the bundled scenarios.
//!
//! These drive the library the same way the CLI does
//! (parse → validate → build → engine → report) and check the numbers the
//! scenarios are written to produce.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use learnmark_core::engine::{EngineConfig, LearningEngine};
use learnmark_core::events::DomainEvent;
use learnmark_core::model::{EnrollmentStatus, ProficiencyLevel};
use learnmark_core::parser::{self, ScenarioFile};
use learnmark_core::report::{AssessmentReport, CompletionReport};
use learnmark_core::scoring::RoundingMode;
use learnmark_core::traits::FixedClock;

const SCENARIOS: &str = "../../scenarios";

fn engine(rounding: RoundingMode) -> LearningEngine {
    let as_of = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    LearningEngine::with_clock(Arc::new(FixedClock(as_of)), EngineConfig { rounding })
}

fn scenario_path(name: &str) -> PathBuf {
    Path::new(SCENARIOS).join(name)
}

#[test]
fn e2e_bundled_scenarios_are_clean() {
    let scenarios = parser::load_scenario_directory(Path::new(SCENARIOS)).unwrap();
    assert_eq!(scenarios.len(), 3);

    for (path, file) in &scenarios {
        let warnings = match file {
            ScenarioFile::Course(s) => parser::validate_course_scenario(s),
            ScenarioFile::Attempt(a) => parser::validate_assessment_attempt(a),
        };
        assert!(warnings.is_empty(), "{}: {warnings:?}", path.display());
    }
}

#[test]
fn e2e_finished_course_completes() {
    let scenario = parser::parse_course_scenario(&scenario_path("rust-foundations.toml")).unwrap();
    let course = scenario.build_course().unwrap();
    let mut enrollment = scenario.build_enrollment(&course).unwrap();
    assert!(enrollment.take_events().is_empty());

    let report = engine(RoundingMode::HalfToEven)
        .apply_completion(&course, &mut enrollment)
        .unwrap();

    assert!(report.eligible);
    assert!(report.completed_now);
    assert_eq!(report.status, EnrollmentStatus::Completed);
    assert_eq!(report.progress_percentage, 100.0);
    assert_eq!(report.requirements.len(), 4);
    // The optional discussion requirement is unmet but does not block.
    assert_eq!(report.blocking().count(), 0);
    assert!(report
        .requirements
        .iter()
        .any(|r| !r.is_required && !r.satisfied));

    let events = enrollment.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::EnrollmentCompleted { .. })));
}

#[test]
fn e2e_in_progress_course_is_blocked() {
    let scenario =
        parser::parse_course_scenario(&scenario_path("data-modeling-in-progress.toml")).unwrap();
    let course = scenario.build_course().unwrap();
    let mut enrollment = scenario.build_enrollment(&course).unwrap();

    let report = engine(RoundingMode::HalfToEven)
        .apply_completion(&course, &mut enrollment)
        .unwrap();

    assert!(!report.eligible);
    assert!(!report.completed_now);
    assert_eq!(enrollment.status(), EnrollmentStatus::Active);
    assert_eq!(report.progress_percentage, 40.0);
    assert_eq!(report.blocking().count(), 3);
}

#[test]
fn e2e_attempt_grades_and_reviews() {
    let attempt = parser::parse_assessment_attempt(&scenario_path("rust-skills-attempt.toml")).unwrap();
    let mut assessment = attempt.build_assessment().unwrap();

    let report = engine(RoundingMode::HalfToEven)
        .grade_attempt(&mut assessment, &attempt.submissions())
        .unwrap();

    let earned: Vec<u32> = report.questions.iter().map(|q| q.earned).collect();
    assert_eq!(earned, vec![4, 3, 5, 0, 2]);
    assert_eq!(report.result.total_score(), 14);
    assert_eq!(report.result.maximum_possible_score(), 27);
    assert_eq!(report.result.assigned_level(), ProficiencyLevel::Intermediate);
    assert!(!report.result.is_verified());

    let verifier = attempt.verifier_id().unwrap();
    let review = attempt.review.as_ref().unwrap();
    assessment
        .verify_result(report.result.id(), verifier, review.notes.clone(), report.created_at)
        .unwrap();

    let stored = assessment.results().last().unwrap();
    assert!(stored.is_verified());
    assert_eq!(stored.verified_by(), Some(verifier));
    assert_eq!(assessment.current_level(), Some(ProficiencyLevel::Intermediate));

    let events = assessment.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::AssessmentSubmitted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, DomainEvent::ResultVerified { .. })));
}

#[test]
fn e2e_rounding_mode_changes_partial_credit() {
    let attempt = parser::parse_assessment_attempt(&scenario_path("rust-skills-attempt.toml")).unwrap();

    let mut even = attempt.build_assessment().unwrap();
    let even_report = engine(RoundingMode::HalfToEven)
        .grade_attempt(&mut even, &attempt.submissions())
        .unwrap();

    let mut away = attempt.build_assessment().unwrap();
    let away_report = engine(RoundingMode::HalfAwayFromZero)
        .grade_attempt(&mut away, &attempt.submissions())
        .unwrap();

    // Only the matching question lands on an exact half (2.5 of 5).
    assert_eq!(even_report.questions[4].earned, 2);
    assert_eq!(away_report.questions[4].earned, 3);
    assert_eq!(away_report.result.total_score(), 15);
}

#[test]
fn e2e_reports_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();

    let scenario = parser::parse_course_scenario(&scenario_path("rust-foundations.toml")).unwrap();
    let course = scenario.build_course().unwrap();
    let enrollment = scenario.build_enrollment(&course).unwrap();
    let completion = engine(RoundingMode::HalfToEven)
        .evaluate_completion(&course, &enrollment)
        .unwrap();

    let completion_path = dir.path().join("completion.json");
    completion.save_json(&completion_path).unwrap();
    let loaded = CompletionReport::load_json(&completion_path).unwrap();
    assert_eq!(loaded, completion);

    let attempt = parser::parse_assessment_attempt(&scenario_path("rust-skills-attempt.toml")).unwrap();
    let mut assessment = attempt.build_assessment().unwrap();
    let graded = engine(RoundingMode::HalfToEven)
        .grade_attempt(&mut assessment, &attempt.submissions())
        .unwrap();

    let graded_path = dir.path().join("nested").join("attempt.json");
    graded.save_json(&graded_path).unwrap();
    let loaded = AssessmentReport::load_json(&graded_path).unwrap();
    assert_eq!(loaded, graded);
}
