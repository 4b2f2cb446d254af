//! Quiz-taking session state machine.
//!
//! ```text
//! Loading ──► Failed
//!    │
//!    ▼
//!  Ready ──► InProgress ◄──► Submitting ──► Finished
//! ```
//!
//! A session covers one pass through one quiz. Retaking a quiz starts a new
//! session. Like [`crate::list::ListController`], the session performs no I/O:
//! network steps are split into a ticket and a `finish_*` call so an event
//! loop can run the request elsewhere. [`QuizSession::load`] and
//! [`QuizSession::submit`] chain both halves for callers that can await.

use crate::api::QuizApi;
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::models::{Answer, AnswerMap, AttemptResult, Question, Quiz, QuizId};
use crate::results::{self, ResultRow};
use std::sync::Arc;
use thiserror::Error;

/// Why a quiz could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    NotFound,
    Unauthorized,
    Network,
    Unexpected(Option<String>),
}

impl LoadError {
    pub fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::NotFound(_) => Self::NotFound,
            ApiError::Unauthorized(_) => Self::Unauthorized,
            ApiError::Network(_) => Self::Network,
            ApiError::Server { message, .. } => Self::Unexpected(message.clone()),
            ApiError::Decode(_) => Self::Unexpected(None),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::NotFound => {
                "Quiz not found. It may have been deleted or you do not have access to it."
                    .to_string()
            }
            Self::Unauthorized => "Authentication error. Please login again.".to_string(),
            Self::Network => "Network error. Please check your connection and try again.".to_string(),
            Self::Unexpected(message) => message
                .clone()
                .unwrap_or_else(|| "Failed to fetch quiz. Please try again later.".to_string()),
        }
    }
}

/// Why a submission did not produce results. Answers are kept either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitFailure {
    /// No response; retrying may help.
    Network,
    /// The credential was rejected.
    Unauthorized,
    /// The server answered but refused or garbled the attempt.
    Rejected(String),
}

impl SubmitFailure {
    pub fn from_api(err: &ApiError) -> Self {
        match err {
            ApiError::Network(_) => Self::Network,
            ApiError::Unauthorized(_) => Self::Unauthorized,
            ApiError::NotFound(message) => Self::Rejected(
                message
                    .clone()
                    .unwrap_or_else(|| "Quiz not found.".to_string()),
            ),
            ApiError::Server { status, message } => Self::Rejected(
                message
                    .clone()
                    .unwrap_or_else(|| format!("Server error: {}", status)),
            ),
            ApiError::Decode(_) => {
                Self::Rejected("The server sent an unreadable response.".to_string())
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Network => "Network error. Please check your connection.".to_string(),
            Self::Unauthorized => "Authentication error. Please login again.".to_string(),
            Self::Rejected(message) => message.clone(),
        }
    }
}

/// A submit request refused locally, before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("{}", ValidationError::NoAnswers)]
    NoAnswers,
    #[error("Are you sure you want to submit this quiz? You cannot change your answers after submission.")]
    NeedsConfirmation,
    /// A submission is already in flight; the duplicate is ignored.
    #[error("Submission already in progress")]
    AlreadySubmitting,
    #[error("The quiz is not in progress")]
    NotInProgress,
}

/// Misuse of an answer or navigation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("The quiz is not in progress")]
    NotInProgress,
    #[error("Question {index} does not exist (quiz has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    Failed(LoadError),
    /// Quiz loaded, not yet started.
    Ready,
    InProgress,
    Submitting,
    /// Scored. Terminal for this session.
    Finished,
}

/// A scored attempt together with the answers that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub result: AttemptResult,
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
}

/// An accepted submission: the caller posts `answers` for `quiz_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTicket {
    seq: u64,
    pub quiz_id: QuizId,
    pub answers: AnswerMap,
}

/// One user's pass through one quiz.
#[derive(Debug)]
pub struct QuizSession {
    quiz_id: QuizId,
    state: SessionState,
    /// Shared read-only; question positions are stable for the session.
    quiz: Option<Arc<Quiz>>,
    current: usize,
    answers: AnswerMap,
    outcome: Option<Outcome>,
    /// Last submission failure, shown while back in progress.
    failure: Option<SubmitFailure>,
    seq: u64,
}

impl QuizSession {
    pub fn new(quiz_id: impl Into<QuizId>) -> Self {
        Self {
            quiz_id: quiz_id.into(),
            state: SessionState::Loading,
            quiz: None,
            current: 0,
            answers: AnswerMap::new(),
            outcome: None,
            failure: None,
            seq: 0,
        }
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_deref()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.as_ref()?.questions.get(self.current)
    }

    pub fn question_count(&self) -> usize {
        self.quiz.as_ref().map(|q| q.question_count()).unwrap_or(0)
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers.get(self.current)
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.question_count()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn failure(&self) -> Option<&SubmitFailure> {
        self.failure.as_ref()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::InProgress
    }

    /// Start (or restart) fetching the quiz definition.
    pub fn load_ticket(&mut self) -> LoadTicket {
        self.seq += 1;
        self.state = SessionState::Loading;
        LoadTicket { seq: self.seq }
    }

    /// Apply the quiz fetch. Returns false if the response was stale.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: ApiResult<Quiz>) -> bool {
        if ticket.seq != self.seq || self.state != SessionState::Loading {
            tracing::debug!(quiz_id = %self.quiz_id, "ignoring stale quiz load");
            return false;
        }

        self.state = match result {
            Ok(quiz) if quiz.questions.is_empty() => {
                tracing::warn!(quiz_id = %self.quiz_id, "quiz has no questions");
                SessionState::Failed(LoadError::Unexpected(Some(
                    "This quiz has no questions.".to_string(),
                )))
            }
            Ok(quiz) => {
                tracing::debug!(quiz_id = %self.quiz_id, questions = quiz.questions.len(), "quiz loaded");
                self.quiz = Some(Arc::new(quiz));
                SessionState::Ready
            }
            Err(err) => {
                tracing::warn!(quiz_id = %self.quiz_id, error = %err, "quiz load failed");
                SessionState::Failed(LoadError::from_api(&err))
            }
        };
        true
    }

    /// Ready → InProgress.
    pub fn begin(&mut self) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        self.state = SessionState::InProgress;
        true
    }

    /// Capture an answer, replacing any earlier one. Does not move the
    /// pointer and does not check the value against the question kind.
    pub fn answer(&mut self, index: usize, value: impl Into<Answer>) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.check_index(index)?;
        self.answers.insert(index, value.into());
        Ok(())
    }

    pub fn answer_current(&mut self, value: impl Into<Answer>) -> Result<(), SessionError> {
        self.answer(self.current, value)
    }

    /// Move to any question, keeping every captured answer.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        self.check_index(index)?;
        self.current = index;
        Ok(())
    }

    /// Advance one question. A no-op on the last question.
    pub fn next(&mut self) -> bool {
        if !self.is_in_progress() || self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Go back one question. A no-op on the first question.
    pub fn previous(&mut self) -> bool {
        if !self.is_in_progress() || self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Validate a submission. On success the session is `Submitting` and
    /// further calls are rejected until [`finish_submit`](Self::finish_submit).
    pub fn begin_submit(&mut self, confirmed: bool) -> Result<SubmitTicket, SubmitRejection> {
        match self.state {
            SessionState::Submitting => return Err(SubmitRejection::AlreadySubmitting),
            SessionState::InProgress => {}
            _ => return Err(SubmitRejection::NotInProgress),
        }
        if self.answers.is_empty() {
            return Err(SubmitRejection::NoAnswers);
        }
        if !confirmed {
            return Err(SubmitRejection::NeedsConfirmation);
        }

        self.seq += 1;
        self.state = SessionState::Submitting;
        self.failure = None;
        tracing::info!(quiz_id = %self.quiz_id, answered = self.answers.len(), "submitting attempt");

        Ok(SubmitTicket {
            seq: self.seq,
            quiz_id: self.quiz_id.clone(),
            answers: self.answers.clone(),
        })
    }

    /// Apply the scoring response. Failures return to `InProgress` with
    /// every answer intact. Returns false if the response was stale.
    pub fn finish_submit(&mut self, ticket: SubmitTicket, result: ApiResult<AttemptResult>) -> bool {
        if ticket.seq != self.seq || self.state != SessionState::Submitting {
            tracing::debug!(quiz_id = %self.quiz_id, "ignoring stale submission result");
            return false;
        }

        match result {
            Ok(result) if result.is_aligned_with(self.question_count()) => {
                tracing::info!(
                    quiz_id = %self.quiz_id,
                    score = result.score,
                    total = result.total_questions,
                    "attempt scored"
                );
                self.outcome = Some(Outcome {
                    result,
                    answers: ticket.answers,
                });
                self.state = SessionState::Finished;
            }
            Ok(result) => {
                tracing::warn!(
                    quiz_id = %self.quiz_id,
                    results = result.results.len(),
                    total = result.total_questions,
                    questions = self.question_count(),
                    "scoring response does not match quiz"
                );
                self.fail_submit(SubmitFailure::Rejected(
                    "The server returned results that do not match this quiz.".to_string(),
                ));
            }
            Err(err) => {
                tracing::warn!(quiz_id = %self.quiz_id, error = %err, "submission failed");
                self.fail_submit(SubmitFailure::from_api(&err));
            }
        }
        true
    }

    /// Results rows once finished.
    pub fn result_rows(&self) -> Option<Vec<ResultRow>> {
        let quiz = self.quiz.as_ref()?;
        let outcome = self.outcome.as_ref()?;
        Some(results::render(quiz, &outcome.answers, &outcome.result))
    }

    /// Fetch the quiz and begin once it is ready.
    pub async fn load(&mut self, api: &dyn QuizApi) {
        let ticket = self.load_ticket();
        let result = api.get_quiz(&self.quiz_id).await;
        self.finish_load(ticket, result);
    }

    /// Validate, post and apply a submission in one go.
    pub async fn submit(&mut self, api: &dyn QuizApi, confirmed: bool) -> Result<(), SubmitRejection> {
        let ticket = self.begin_submit(confirmed)?;
        let result = api.submit_attempt(&ticket.quiz_id, &ticket.answers).await;
        self.finish_submit(ticket, result);
        Ok(())
    }

    fn fail_submit(&mut self, failure: SubmitFailure) {
        self.failure = Some(failure);
        self.state = SessionState::InProgress;
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(SessionError::NotInProgress)
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        let len = self.question_count();
        if index < len {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange { index, len })
        }
    }
}
