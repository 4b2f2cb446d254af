//! HTTP implementation of [`QuizApi`].

use crate::api::QuizApi;
use crate::auth::Credentials;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    AnswerMap, AttemptPage, AttemptResult, AttemptSummary, Dashboard, GenerateQuizRequest,
    GeneratedQuiz, LoginRequest, LoginResponse, Material, PagedResult, Quiz, QuizPage,
    QuizSummary, RegisterRequest,
};
use crate::query::CollectionQuery;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Default backend location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Connection settings for [`HttpApi`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// REST adapter: attaches the bearer token and normalizes failures.
pub struct HttpApi {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpApi {
    pub fn new(config: &ClientConfig, credentials: Credentials) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "request");
        let builder = self.client.request(method, self.url(path));
        match self.credentials.token() {
            Some(token) => builder.bearer_auth(token),
            None => {
                tracing::debug!(path, "no credential, sending unauthenticated");
                builder
            }
        }
    }

    async fn dispatch(&self, builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(path, error = %e, "no response");
            if e.is_timeout() {
                ApiError::Network("request timed out".to_string())
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body);
        tracing::warn!(path, status = status.as_u16(), "request failed");

        if err.is_unauthorized() {
            self.credentials.sign_out();
        }
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, builder: RequestBuilder, path: &str) -> ApiResult<T> {
        let response = self.dispatch(builder, path).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(path, error = %e, "undecodable response");
            ApiError::Decode(e.to_string())
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.json(self.request(Method::GET, path), path).await
    }

    async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &CollectionQuery,
    ) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).query(&query.to_params());
        self.json(builder, path).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.json(self.request(Method::POST, path).json(body), path)
            .await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.dispatch(self.request(Method::DELETE, path), path)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl QuizApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/auth/login", &body).await
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
        let path = "/auth/register";
        self.dispatch(self.request(Method::POST, path).json(request), path)
            .await
            .map(|_| ())
    }

    async fn list_materials(&self) -> ApiResult<Vec<Material>> {
        self.get("/materials").await
    }

    async fn delete_material(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/materials/{}", encode_segment(id))).await
    }

    async fn generate_quiz(&self, request: &GenerateQuizRequest) -> ApiResult<GeneratedQuiz> {
        self.post("/quizzes/generate", request).await
    }

    async fn list_quizzes(&self, query: &CollectionQuery) -> ApiResult<PagedResult<QuizSummary>> {
        let page: QuizPage = self.get_query("/quizzes", query).await?;
        Ok(PagedResult::new(page.quizzes, page.pagination))
    }

    async fn get_quiz(&self, id: &str) -> ApiResult<Quiz> {
        self.get(&format!("/quizzes/{}", encode_segment(id))).await
    }

    async fn submit_attempt(&self, id: &str, answers: &AnswerMap) -> ApiResult<AttemptResult> {
        #[derive(Serialize)]
        struct AttemptRequest<'a> {
            answers: &'a AnswerMap,
        }

        self.post(
            &format!("/quizzes/{}/attempt", encode_segment(id)),
            &AttemptRequest { answers },
        )
        .await
    }

    async fn delete_quiz(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("/quizzes/{}", encode_segment(id))).await
    }

    async fn dashboard(&self) -> ApiResult<Dashboard> {
        self.get("/quizzes/dashboard").await
    }

    async fn list_attempts(
        &self,
        query: &CollectionQuery,
    ) -> ApiResult<PagedResult<AttemptSummary>> {
        let page: AttemptPage = self.get_query("/quizzes/attempts", query).await?;
        Ok(PagedResult::new(page.attempts, page.pagination))
    }
}

/// Percent-encode a path segment.
fn encode_segment(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char)
            }
            _ => result.push_str(&format!("%{:02X}", byte)),
        }
    }
    result
}
