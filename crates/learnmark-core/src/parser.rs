//! TOML scenario parser.
//!
//! Two file shapes are understood: a course scenario (`[course]` plus an
//! `[enrollment]`) and an assessment attempt (`[assessment]` plus
//! `[[answers]]`). Human-readable keys in the files are mapped to stable
//! UUIDv5 identifiers so repeated runs produce the same ids.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::assessment::{AssessmentQuestion, SkillAssessment};
use crate::course::{Course, CourseModule, Lesson};
use crate::criteria::CompletionCriterion;
use crate::engine::AnswerSubmission;
use crate::enrollment::Enrollment;
use crate::error::{DomainError, DomainResult};
use crate::model::{EnrollmentStatus, LessonType, QuestionType};

// --- TOML shapes ---

#[derive(Debug, Deserialize)]
struct TomlCourseFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    as_of: Option<String>,
    course: TomlCourse,
    enrollment: TomlEnrollment,
}

#[derive(Debug, Deserialize)]
struct TomlCourse {
    key: String,
    title: String,
    #[serde(default = "default_instructor")]
    instructor: String,
    #[serde(default)]
    modules: Vec<TomlModule>,
    #[serde(default)]
    requirements: Vec<TomlRequirement>,
}

fn default_instructor() -> String {
    "instructor".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlModule {
    key: String,
    title: String,
    #[serde(default)]
    order_index: Option<i64>,
    #[serde(default)]
    lessons: Vec<TomlLesson>,
}

#[derive(Debug, Deserialize)]
struct TomlLesson {
    key: String,
    title: String,
    #[serde(default = "default_lesson_type", rename = "type")]
    lesson_type: String,
    #[serde(default)]
    duration_minutes: u32,
    #[serde(default)]
    order_index: Option<i64>,
}

fn default_lesson_type() -> String {
    "article".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlRequirement {
    criterion: String,
    #[serde(default)]
    value: u32,
    #[serde(default = "default_true")]
    required: bool,
    #[serde(default)]
    description: String,
    #[serde(default)]
    order_index: Option<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TomlEnrollment {
    user: String,
    enrolled_at: String,
    #[serde(default)]
    status: Option<EnrollmentStatus>,
    #[serde(default)]
    completed_lessons: Vec<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    final_grade: Option<f64>,
    #[serde(default)]
    final_exam_score: Option<f64>,
    #[serde(default)]
    assignments: u32,
    #[serde(default)]
    quizzes: u32,
    #[serde(default)]
    discussion_posts: u32,
    #[serde(default)]
    notes: u32,
}

#[derive(Debug, Deserialize)]
struct TomlAttemptFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    as_of: Option<String>,
    assessment: TomlAssessment,
    #[serde(default)]
    answers: Vec<TomlAnswer>,
    #[serde(default)]
    review: Option<TomlReview>,
}

#[derive(Debug, Deserialize)]
struct TomlAssessment {
    key: String,
    skill: String,
    user: String,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    key: String,
    text: String,
    #[serde(rename = "type")]
    question_type: String,
    points: u32,
    #[serde(default)]
    order_index: Option<i64>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    key: String,
    text: String,
    #[serde(default)]
    correct: bool,
    #[serde(default)]
    order_index: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TomlAnswer {
    question: String,
    #[serde(default)]
    selected: Option<Vec<String>>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TomlReview {
    verifier: String,
    #[serde(default)]
    notes: Option<String>,
}

// --- parsed scenarios ---

/// A course definition plus one learner's enrollment snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseScenario {
    pub name: String,
    /// Evaluation instant; the caller's clock is used when absent.
    pub as_of: Option<DateTime<Utc>>,
    pub course: CourseDef,
    pub enrollment: EnrollmentDef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseDef {
    pub key: String,
    pub title: String,
    pub instructor: String,
    /// Modules in their final order.
    pub modules: Vec<ModuleDef>,
    /// Requirements in their final order.
    pub requirements: Vec<RequirementDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    pub key: String,
    pub title: String,
    pub lessons: Vec<LessonDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonDef {
    pub key: String,
    pub title: String,
    pub lesson_type: LessonType,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementDef {
    pub criterion: CompletionCriterion,
    pub required_value: u32,
    pub is_required: bool,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentDef {
    pub user: String,
    pub enrolled_at: DateTime<Utc>,
    pub status: EnrollmentStatus,
    pub completed_lessons: Vec<String>,
    pub progress: Option<f64>,
    pub final_grade: Option<f64>,
    pub final_exam_score: Option<f64>,
    pub assignments: u32,
    pub quizzes: u32,
    pub discussion_posts: u32,
    pub notes: u32,
}

/// An assessment definition plus one attempt's answers.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentAttempt {
    pub name: String,
    pub as_of: Option<DateTime<Utc>>,
    pub assessment: AssessmentDef,
    pub answers: Vec<AnswerDef>,
    pub review: Option<ReviewDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentDef {
    pub key: String,
    pub skill: String,
    pub user: String,
    pub questions: Vec<QuestionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionDef {
    pub key: String,
    pub text: String,
    pub question_type: QuestionType,
    pub points: u32,
    pub options: Vec<OptionDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionDef {
    pub key: String,
    pub text: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerDef {
    Selection { question: String, options: Vec<String> },
    Text {
        question: String,
        text: String,
        score: Option<u32>,
    },
}

impl AnswerDef {
    pub fn question(&self) -> &str {
        match self {
            AnswerDef::Selection { question, .. } | AnswerDef::Text { question, .. } => question,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDef {
    pub verifier: String,
    pub notes: Option<String>,
}

/// Either kind of scenario file.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioFile {
    Course(CourseScenario),
    Attempt(AssessmentAttempt),
}

impl ScenarioFile {
    pub fn name(&self) -> &str {
        match self {
            ScenarioFile::Course(s) => &s.name,
            ScenarioFile::Attempt(a) => &a.name,
        }
    }
}

// --- identifiers ---

/// Stable id for a human key within a scope such as `"lesson"`.
pub fn key_id(scope: &str, key: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{scope}:{key}").as_bytes())
}

fn option_id(question_key: &str, option_key: &str) -> Uuid {
    key_id("option", &format!("{question_key}/{option_key}"))
}

// --- parsing ---

/// Parse a course scenario file.
pub fn parse_course_scenario(path: &Path) -> Result<CourseScenario> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
    parse_course_scenario_str(&content, path)
}

/// Parse a course scenario from a string (useful for testing).
pub fn parse_course_scenario_str(content: &str, source_path: &Path) -> Result<CourseScenario> {
    let parsed: TomlCourseFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let modules = ordered(parsed.course.modules, |m| m.order_index, "module")?
        .into_iter()
        .map(|m| {
            let lessons = ordered(m.lessons, |l| l.order_index, "lesson")?
                .into_iter()
                .map(|l| {
                    Ok(LessonDef {
                        lesson_type: l
                            .lesson_type
                            .parse()
                            .map_err(anyhow::Error::msg)
                            .with_context(|| format!("lesson '{}'", l.key))?,
                        key: l.key,
                        title: l.title,
                        duration_minutes: l.duration_minutes,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ModuleDef {
                key: m.key,
                title: m.title,
                lessons,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let requirements = ordered(parsed.course.requirements, |r| r.order_index, "requirement")?
        .into_iter()
        .map(|r| {
            Ok(RequirementDef {
                criterion: r.criterion.parse().map_err(anyhow::Error::msg)?,
                required_value: r.value,
                is_required: r.required,
                description: r.description,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let e = parsed.enrollment;
    let enrollment = EnrollmentDef {
        enrolled_at: parse_timestamp(&e.enrolled_at).context("enrollment.enrolled_at")?,
        user: e.user,
        status: e.status.unwrap_or(EnrollmentStatus::Active),
        completed_lessons: e.completed_lessons,
        progress: e.progress,
        final_grade: e.final_grade,
        final_exam_score: e.final_exam_score,
        assignments: e.assignments,
        quizzes: e.quizzes,
        discussion_posts: e.discussion_posts,
        notes: e.notes,
    };

    Ok(CourseScenario {
        name: scenario_name(parsed.name, source_path),
        as_of: parsed
            .as_of
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("as_of")?,
        course: CourseDef {
            key: parsed.course.key,
            title: parsed.course.title,
            instructor: parsed.course.instructor,
            modules,
            requirements,
        },
        enrollment,
    })
}

/// Parse an assessment attempt file.
pub fn parse_assessment_attempt(path: &Path) -> Result<AssessmentAttempt> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read attempt file: {}", path.display()))?;
    parse_assessment_attempt_str(&content, path)
}

/// Parse an assessment attempt from a string (useful for testing).
pub fn parse_assessment_attempt_str(
    content: &str,
    source_path: &Path,
) -> Result<AssessmentAttempt> {
    let parsed: TomlAttemptFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = ordered(parsed.assessment.questions, |q| q.order_index, "question")?
        .into_iter()
        .map(|q| {
            let question_type: QuestionType = q
                .question_type
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("question '{}'", q.key))?;
            let options = ordered(q.options, |o| o.order_index, "option")?
                .into_iter()
                .map(|o| OptionDef {
                    key: o.key,
                    text: o.text,
                    correct: o.correct,
                })
                .collect();
            Ok(QuestionDef {
                key: q.key,
                text: q.text,
                question_type,
                points: q.points,
                options,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let answers = parsed
        .answers
        .into_iter()
        .map(|a| match (a.selected, a.text) {
            (Some(options), None) => Ok(AnswerDef::Selection {
                question: a.question,
                options,
            }),
            (None, Some(text)) => Ok(AnswerDef::Text {
                question: a.question,
                text,
                score: a.score,
            }),
            _ => anyhow::bail!(
                "answer to '{}' needs exactly one of `selected` or `text`",
                a.question
            ),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(AssessmentAttempt {
        name: scenario_name(parsed.name, source_path),
        as_of: parsed
            .as_of
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .context("as_of")?,
        assessment: AssessmentDef {
            key: parsed.assessment.key,
            skill: parsed.assessment.skill,
            user: parsed.assessment.user,
            questions,
        },
        answers,
        review: parsed.review.map(|r| ReviewDef {
            verifier: r.verifier,
            notes: r.notes,
        }),
    })
}

/// Parse either kind of scenario, deciding by its top-level table.
pub fn parse_scenario_file(path: &Path) -> Result<ScenarioFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file: {}", path.display()))?;
    let table: toml::Table = toml::from_str(&content)
        .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

    if table.contains_key("course") {
        Ok(ScenarioFile::Course(parse_course_scenario_str(&content, path)?))
    } else if table.contains_key("assessment") {
        Ok(ScenarioFile::Attempt(parse_assessment_attempt_str(
            &content, path,
        )?))
    } else {
        anyhow::bail!(
            "{} has neither a [course] nor an [assessment] table",
            path.display()
        )
    }
}

/// Recursively load all `.toml` scenario files from a directory.
pub fn load_scenario_directory(dir: &Path) -> Result<Vec<(PathBuf, ScenarioFile)>> {
    let mut scenarios = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            scenarios.extend(load_scenario_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_scenario_file(&path) {
                Ok(scenario) => scenarios.push((path, scenario)),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(scenarios)
}

fn scenario_name(name: Option<String>, path: &Path) -> String {
    name.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scenario".to_string())
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid RFC 3339 timestamp: {s}"))?
        .with_timezone(&Utc))
}

/// Sorts items by their optional `order_index`, falling back to file
/// position. Negative indices are rejected.
fn ordered<T>(items: Vec<T>, index_of: impl Fn(&T) -> Option<i64>, what: &str) -> Result<Vec<T>> {
    let mut keyed = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let index = match index_of(&item) {
            Some(i) if i < 0 => anyhow::bail!("{what} has negative order_index {i}"),
            Some(i) => i,
            None => position as i64,
        };
        keyed.push((index, position, item));
    }
    keyed.sort_by_key(|(index, position, _)| (*index, *position));
    Ok(keyed.into_iter().map(|(_, _, item)| item).collect())
}

// --- building domain objects ---

impl CourseScenario {
    /// Builds the course aggregate with key-derived ids.
    pub fn build_course(&self) -> DomainResult<Course> {
        let c = &self.course;
        let mut course = Course::with_id(
            key_id("course", &c.key),
            &c.title,
            key_id("user", &c.instructor),
        )?;
        for m in &c.modules {
            let module_id = key_id("module", &m.key);
            course.add_module(CourseModule::with_id(module_id, &m.title)?)?;
            for l in &m.lessons {
                let lesson = Lesson::with_id(
                    key_id("lesson", &l.key),
                    &l.title,
                    l.lesson_type,
                    l.duration_minutes,
                )?;
                course.add_lesson(module_id, lesson)?;
            }
        }
        for r in &c.requirements {
            course.add_completion_requirement(
                r.criterion,
                r.required_value,
                r.is_required,
                r.description.clone(),
            )?;
        }
        Ok(course)
    }

    /// Replays the enrollment snapshot against `course`.
    pub fn build_enrollment(&self, course: &Course) -> DomainResult<Enrollment> {
        let e = &self.enrollment;
        let at = self.as_of.unwrap_or(e.enrolled_at);
        let mut enrollment = course.enroll(key_id("user", &e.user), e.enrolled_at);

        for key in &e.completed_lessons {
            enrollment.complete_lesson(key_id("lesson", key), at)?;
        }
        if let Some(progress) = e.progress {
            enrollment.update_progress(progress)?;
        }
        if let Some(grade) = e.final_grade {
            enrollment.set_final_grade(grade)?;
        }
        if let Some(score) = e.final_exam_score {
            enrollment.record_final_exam(score)?;
        }
        for _ in 0..e.assignments {
            enrollment.record_assignment_completed();
        }
        for _ in 0..e.quizzes {
            enrollment.record_quiz_completed();
        }
        for _ in 0..e.discussion_posts {
            enrollment.record_discussion_post();
        }
        for _ in 0..e.notes {
            enrollment.record_note();
        }

        match e.status {
            EnrollmentStatus::Active => {}
            EnrollmentStatus::Completed => {
                enrollment.complete(at)?;
            }
            EnrollmentStatus::Dropped => enrollment.drop_out()?,
            EnrollmentStatus::OnHold => enrollment.put_on_hold()?,
            EnrollmentStatus::Expired => enrollment.expire()?,
            EnrollmentStatus::Pending => {
                return Err(DomainError::invalid_input(
                    "a scenario enrollment cannot start as pending",
                ))
            }
        }
        // Replaying the snapshot is not news.
        enrollment.take_events();
        Ok(enrollment)
    }
}

impl AssessmentAttempt {
    /// Builds the assessment aggregate with key-derived ids.
    pub fn build_assessment(&self) -> DomainResult<SkillAssessment> {
        let a = &self.assessment;
        let created_at = self.as_of.unwrap_or_else(Utc::now);
        let assessment_id = key_id("assessment", &a.key);
        let mut assessment = SkillAssessment::with_id(
            assessment_id,
            key_id("user", &a.user),
            &a.skill,
            created_at,
        )?;
        for q in &a.questions {
            let mut question = AssessmentQuestion::with_id(
                key_id("question", &q.key),
                assessment_id,
                &q.text,
                q.question_type,
                q.points,
            )?;
            for o in &q.options {
                question.add_option_with_id(option_id(&q.key, &o.key), &o.text, o.correct)?;
            }
            assessment.push_question(question)?;
        }
        Ok(assessment)
    }

    /// The answers as engine submissions. Unknown keys map to ids the
    /// assessment does not contain and are rejected when graded.
    pub fn submissions(&self) -> Vec<AnswerSubmission> {
        self.answers
            .iter()
            .map(|answer| match answer {
                AnswerDef::Selection { question, options } => AnswerSubmission::Selection {
                    question: key_id("question", question),
                    options: options.iter().map(|o| option_id(question, o)).collect(),
                },
                AnswerDef::Text {
                    question,
                    text,
                    score,
                } => AnswerSubmission::Text {
                    question: key_id("question", question),
                    text: text.clone(),
                    score: *score,
                },
            })
            .collect()
    }

    pub fn verifier_id(&self) -> Option<Uuid> {
        self.review.as_ref().map(|r| key_id("user", &r.verifier))
    }
}

// --- validation ---

/// A warning from scenario validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The key the warning is about (if applicable).
    pub key: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn new(key: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            key: key.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Validate a course scenario for common issues.
pub fn validate_course_scenario(scenario: &CourseScenario) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let course = &scenario.course;

    let mut seen_modules = HashSet::new();
    for module in &course.modules {
        if !seen_modules.insert(module.key.as_str()) {
            warnings.push(ValidationWarning::new(
                Some(module.key.as_str()),
                format!("duplicate module key: {}", module.key),
            ));
        }
    }

    let mut lesson_keys = HashSet::new();
    for lesson in course.modules.iter().flat_map(|m| &m.lessons) {
        if !lesson_keys.insert(lesson.key.as_str()) {
            warnings.push(ValidationWarning::new(
                Some(lesson.key.as_str()),
                format!("duplicate lesson key: {}", lesson.key),
            ));
        }
    }

    if !course.requirements.is_empty() && course.requirements.iter().all(|r| !r.is_required) {
        warnings.push(ValidationWarning::new(
            None,
            "every requirement is optional; any enrollment satisfies the course",
        ));
    }

    if lesson_keys.is_empty()
        && course
            .requirements
            .iter()
            .any(|r| r.criterion == CompletionCriterion::AllLessonsCompleted)
    {
        warnings.push(ValidationWarning::new(
            None,
            "AllLessonsCompleted on a course with no lessons is always satisfied",
        ));
    }

    for r in &course.requirements {
        if r.criterion.uses_required_value() && r.required_value == 0 {
            warnings.push(ValidationWarning::new(
                None,
                format!("{} has no required value", r.criterion),
            ));
        }
    }

    for key in &scenario.enrollment.completed_lessons {
        if !lesson_keys.contains(key.as_str()) {
            warnings.push(ValidationWarning::new(
                Some(key.as_str()),
                format!("completed lesson '{key}' is not part of the course"),
            ));
        }
    }

    warnings
}

/// Validate an assessment attempt for common issues.
pub fn validate_assessment_attempt(attempt: &AssessmentAttempt) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let questions = &attempt.assessment.questions;

    let mut question_keys = HashSet::new();
    for q in questions {
        if !question_keys.insert(q.key.as_str()) {
            warnings.push(ValidationWarning::new(
                Some(q.key.as_str()),
                format!("duplicate question key: {}", q.key),
            ));
        }

        let mut option_keys = HashSet::new();
        for o in &q.options {
            if !option_keys.insert(o.key.as_str()) {
                warnings.push(ValidationWarning::new(
                    Some(q.key.as_str()),
                    format!("duplicate option key '{}' in question {}", o.key, q.key),
                ));
            }
        }

        if !q.question_type.is_manually_graded() && q.options.iter().all(|o| !o.correct) {
            warnings.push(ValidationWarning::new(
                Some(q.key.as_str()),
                format!("{} question has no correct option and always scores 0", q.question_type),
            ));
        }
    }

    let mut answered = HashSet::new();
    for answer in &attempt.answers {
        let key = answer.question();
        if !question_keys.contains(key) {
            warnings.push(ValidationWarning::new(
                Some(key),
                format!("answer refers to unknown question '{key}'"),
            ));
        }
        if !answered.insert(key) {
            warnings.push(ValidationWarning::new(
                Some(key),
                format!("question '{key}' is answered more than once"),
            ));
        }
    }

    for q in questions {
        if !answered.contains(q.key.as_str()) {
            warnings.push(ValidationWarning::new(
                Some(q.key.as_str()),
                "question is unanswered and scores 0",
            ));
        }
    }

    warnings
}
