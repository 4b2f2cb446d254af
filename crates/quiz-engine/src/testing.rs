//! In-memory [`QuizApi`] used by the engine's tests.

use crate::api::QuizApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AnswerMap, AttemptResult, AttemptSummary, Dashboard, GenerateQuizRequest, GeneratedQuiz,
    LoginResponse, Material, PagedResult, Question, QuestionKind, Quiz, QuizSummary,
    RegisterRequest,
};
use crate::query::CollectionQuery;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeApi {
    pub quizzes: Mutex<Vec<QuizSummary>>,
    pub materials: Mutex<Vec<Material>>,
    pub quiz: Mutex<Option<ApiResult<Quiz>>>,
    pub attempt: Mutex<Option<ApiResult<AttemptResult>>>,
    pub list_error: Mutex<Option<ApiError>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn with_quizzes(n: usize) -> Self {
        let api = Self::default();
        *api.quizzes.lock().unwrap() = (1..=n).map(|i| summary(&format!("q{}", i))).collect();
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn summary(id: &str) -> QuizSummary {
    QuizSummary {
        id: id.to_string(),
        title: format!("Quiz {}", id),
        description: None,
        material_title: None,
        num_questions: 3,
        attempt_count: 0,
        created_at: None,
    }
}

pub fn material(id: &str, title: &str) -> Material {
    Material {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        tags: Vec::new(),
        created_at: None,
    }
}

pub fn quiz(id: &str, kinds: &[QuestionKind]) -> Quiz {
    Quiz {
        id: id.to_string(),
        title: format!("Quiz {}", id),
        questions: kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| Question {
                kind: kind.clone(),
                prompt: format!("Question {}?", i + 1),
                options: match kind {
                    QuestionKind::MultipleChoice => vec!["Alpha".into(), "Beta".into(), "Gamma".into()],
                    _ => Vec::new(),
                },
            })
            .collect(),
        material_id: None,
        material_title: None,
        created_at: None,
        attempt_count: 0,
    }
}

#[async_trait]
impl QuizApi for FakeApi {
    async fn login(&self, email: &str, _password: &str) -> ApiResult<LoginResponse> {
        self.record(format!("login {}", email));
        Err(ApiError::Unauthorized(Some("Invalid credentials".to_string())))
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
        self.record(format!("register {}", request.email));
        Ok(())
    }

    async fn list_materials(&self) -> ApiResult<Vec<Material>> {
        self.record("list_materials".to_string());
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.materials.lock().unwrap().clone())
    }

    async fn delete_material(&self, id: &str) -> ApiResult<()> {
        self.record(format!("delete_material {}", id));
        self.materials.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ApiResult<GeneratedQuiz> {
        self.record(format!("generate {}", request.material_id));
        Ok(GeneratedQuiz {
            quiz_id: "generated".to_string(),
        })
    }

    async fn list_quizzes(&self, query: &CollectionQuery) -> ApiResult<PagedResult<QuizSummary>> {
        self.record(format!(
            "list_quizzes page={} search={} material={}",
            query.page,
            query.search,
            query.filters.material.as_deref().unwrap_or("")
        ));
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        let matching: Vec<_> = self
            .quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.title.contains(&query.search))
            .cloned()
            .collect();
        Ok(PagedResult::from_full(matching, query.page, query.limit))
    }

    async fn get_quiz(&self, id: &str) -> ApiResult<Quiz> {
        self.record(format!("get_quiz {}", id));
        self.quiz
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::NotFound(None)))
    }

    async fn submit_attempt(&self, id: &str, answers: &AnswerMap) -> ApiResult<AttemptResult> {
        self.record(format!("submit {} answers={}", id, answers.len()));
        self.attempt
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::Network("unreachable".to_string())))
    }

    async fn delete_quiz(&self, id: &str) -> ApiResult<()> {
        self.record(format!("delete_quiz {}", id));
        self.quizzes.lock().unwrap().retain(|q| q.id != id);
        Ok(())
    }

    async fn dashboard(&self) -> ApiResult<Dashboard> {
        self.record("dashboard".to_string());
        Ok(Dashboard::default())
    }

    async fn list_attempts(
        &self,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<AttemptSummary>> {
        self.record(format!("list_attempts page={}", query.page));
        Ok(PagedResult::from_full(Vec::new(), query.page, query.limit))
    }
}
