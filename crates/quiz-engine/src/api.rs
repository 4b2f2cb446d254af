//! The backend operations the client consumes.

use crate::error::ApiResult;
use crate::models::{
    AnswerMap, AttemptResult, AttemptSummary, Dashboard, GenerateQuizRequest, GeneratedQuiz,
    LoginResponse, Material, PagedResult, Quiz, QuizSummary, RegisterRequest,
};
use crate::query::CollectionQuery;
use async_trait::async_trait;

/// Every call the engine and the views make against the backend.
///
/// [`crate::http::HttpApi`] is the production implementation; tests
/// substitute in-memory fakes.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    /// `POST /auth/register`
    async fn register(&self, request: &RegisterRequest) -> ApiResult<()>;

    /// `GET /materials`
    async fn list_materials(&self) -> ApiResult<Vec<Material>>;

    /// `DELETE /materials/{id}`
    async fn delete_material(&self, id: &str) -> ApiResult<()>;

    /// `POST /quizzes/generate`
    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ApiResult<GeneratedQuiz>;

    /// `GET /quizzes?page&limit&search&material`
    async fn list_quizzes(&self, query: &CollectionQuery) -> ApiResult<PagedResult<QuizSummary>>;

    /// `GET /quizzes/{id}`
    async fn get_quiz(&self, id: &str) -> ApiResult<Quiz>;

    /// `POST /quizzes/{id}/attempt`
    async fn submit_attempt(&self, id: &str, answers: &AnswerMap) -> ApiResult<AttemptResult>;

    /// `DELETE /quizzes/{id}`
    async fn delete_quiz(&self, id: &str) -> ApiResult<()>;

    /// `GET /quizzes/dashboard`
    async fn dashboard(&self) -> ApiResult<Dashboard>;

    /// `GET /quizzes/attempts?page&limit&search&start_date&end_date`
    async fn list_attempts(
        &self,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<AttemptSummary>>;
}
