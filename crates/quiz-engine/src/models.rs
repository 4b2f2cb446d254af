//! Data models exchanged with the study-quiz backend.

use crate::error::ValidationError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a quiz as issued by the server.
pub type QuizId = String;
/// Identifier of a study material.
pub type MaterialId = String;

/// Kind of a quiz question.
///
/// Unrecognized kinds are kept verbatim so newer servers can introduce
/// question types without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Unknown(String),
}

impl QuestionKind {
    /// The kinds the generator accepts.
    pub const GENERATABLE: [QuestionKind; 3] = [
        QuestionKind::MultipleChoice,
        QuestionKind::TrueFalse,
        QuestionKind::ShortAnswer,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::ShortAnswer => "short_answer",
            Self::Unknown(kind) => kind,
        }
    }

    /// Label shown in the generation form.
    pub fn label(&self) -> &str {
        match self {
            Self::MultipleChoice => "Multiple Choice",
            Self::TrueFalse => "True/False",
            Self::ShortAnswer => "Short Answer",
            Self::Unknown(kind) => kind,
        }
    }
}

impl From<String> for QuestionKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "multiple_choice" => Self::MultipleChoice,
            "true_false" => Self::TrueFalse,
            "short_answer" => Self::ShortAnswer,
            _ => Self::Unknown(s),
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A single question. Carries no answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Prompt text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// Options, only meaningful for multiple choice.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Vec<String>,
}

/// A quiz as returned by `GET /quizzes/{id}`.
///
/// Questions are addressed by position for the lifetime of a session, so a
/// fetched quiz is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(alias = "_id")]
    pub id: QuizId,
    pub title: String,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub material_id: Option<MaterialId>,
    #[serde(default)]
    pub material_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempt_count: u32,
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// A captured answer. Booleans for true/false, text for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Text(String),
}

impl Answer {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Answer {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Answer {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Answer {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Answers keyed by question position. A missing key means unanswered.
///
/// Serializes as `{"0": ..., "2": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<usize, Answer>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an answer, replacing any previous one at `index`.
    pub fn insert(&mut self, index: usize, answer: Answer) -> Option<Answer> {
        self.0.insert(index, answer)
    }

    pub fn get(&self, index: usize) -> Option<&Answer> {
        self.0.get(&index)
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.0.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Answer)> {
        self.0.iter().map(|(i, a)| (*i, a))
    }
}

/// Per-question outcome in a scoring response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub correct: bool,
    pub correct_answer: Answer,
    #[serde(default)]
    pub explanation: String,
}

/// Scoring response from `POST /quizzes/{id}/attempt`.
///
/// `results` is positionally aligned with the quiz's questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub results: Vec<QuestionOutcome>,
}

impl AttemptResult {
    /// Whether this response lines up with a quiz of `question_count` questions.
    pub fn is_aligned_with(&self, question_count: usize) -> bool {
        self.results.len() == question_count && self.total_questions as usize == question_count
    }
}

/// A row in the quiz list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    #[serde(alias = "_id")]
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub material_title: Option<String>,
    #[serde(default)]
    pub num_questions: u32,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A row in the dashboard attempt table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    #[serde(alias = "_id")]
    pub id: String,
    pub quiz_id: QuizId,
    #[serde(default)]
    pub quiz_title: Option<String>,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A study material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(alias = "_id")]
    pub id: MaterialId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Aggregate numbers shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_materials: u32,
    #[serde(default)]
    pub total_quizzes: u32,
    #[serde(default)]
    pub total_attempts: u32,
    #[serde(default)]
    pub average_score: f64,
}

/// Response of `GET /quizzes/dashboard`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub stats: DashboardStats,
    #[serde(default, rename = "recentQuizzes", alias = "recent_quizzes")]
    pub recent_quizzes: Vec<QuizSummary>,
    /// Absent on older servers. The dashboard then shows the first few
    /// entries of `GET /materials` instead.
    #[serde(default, rename = "recentMaterials", alias = "recent_materials")]
    pub recent_materials: Option<Vec<Material>>,
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub pages: u32,
    pub total: u32,
}

/// One page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: u32,
    pub pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self {
            items,
            total: pagination.total,
            pages: pagination.pages,
        }
    }

    /// Slice a full in-memory collection into the requested page.
    pub fn from_full(all: Vec<T>, page: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let total = all.len() as u32;
        let pages = total.div_ceil(limit);
        let start = (page.max(1) - 1).saturating_mul(limit) as usize;
        let items = all.into_iter().skip(start).take(limit as usize).collect();
        Self {
            items,
            total,
            pages,
        }
    }

    /// Highest page a query may ask for.
    pub fn last_page(&self) -> u32 {
        self.pages.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Wire shape of `GET /quizzes`.
#[derive(Debug, Deserialize)]
pub(crate) struct QuizPage {
    pub quizzes: Vec<QuizSummary>,
    pub pagination: Pagination,
}

/// Wire shape of `GET /quizzes/attempts`.
#[derive(Debug, Deserialize)]
pub(crate) struct AttemptPage {
    pub attempts: Vec<AttemptSummary>,
    pub pagination: Pagination,
}

/// Lower and upper bound for generated question counts.
pub const MIN_QUESTIONS: u8 = 1;
pub const MAX_QUESTIONS: u8 = 10;

/// Body of `POST /quizzes/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateQuizRequest {
    pub material_id: MaterialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub num_questions: u8,
    pub question_types: Vec<QuestionKind>,
}

impl GenerateQuizRequest {
    /// Build a request, rejecting it locally when it cannot succeed.
    pub fn new(
        material_id: impl Into<MaterialId>,
        title: &str,
        num_questions: u8,
        question_types: Vec<QuestionKind>,
    ) -> Result<Self, ValidationError> {
        let material_id = material_id.into();
        if material_id.trim().is_empty() {
            return Err(ValidationError::MissingMaterial);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&num_questions) {
            return Err(ValidationError::QuestionCountOutOfRange(num_questions));
        }
        if question_types.is_empty() {
            return Err(ValidationError::NoQuestionTypes);
        }
        let title = title.trim();
        Ok(Self {
            material_id,
            title: (!title.is_empty()).then(|| title.to_string()),
            num_questions,
            question_types,
        })
    }
}

/// Response of `POST /quizzes/generate`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedQuiz {
    pub quiz_id: QuizId,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

/// Accept RFC 3339 as well as naive ISO timestamps (treated as UTC).
/// Anything else becomes `None` rather than failing the whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_timestamp))
}

/// `null` reads as an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%a, %d %b %Y %H:%M:%S GMT"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
