//! Error types for the quiz engine.

use thiserror::Error;

/// Failures reported by the API boundary.
///
/// Every transport or server failure is normalized into one of these shapes
/// so views can decide how to present it without inspecting HTTP details.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The credential was missing, expired or rejected (HTTP 401).
    #[error("Not authorized{}", suffix(.0))]
    Unauthorized(Option<String>),

    /// The target resource does not exist or is not accessible (HTTP 404).
    #[error("Not found{}", suffix(.0))]
    NotFound(Option<String>),

    /// No response was received, including timeouts.
    #[error("Network error: {0}")]
    Network(String),

    /// A response was received with a failing status.
    #[error("Server error {status}{}", suffix(.message))]
    Server { status: u16, message: Option<String> },

    /// A successful response carried a body we could not decode.
    #[error("Invalid response: {0}")]
    Decode(String),
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl ApiError {
    /// Human-readable message extracted from the response body, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(m) | Self::NotFound(m) => m.as_deref(),
            Self::Server { message, .. } => message.as_deref(),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// True when no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// True for a 401 response.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Build the error for a failing status code and its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            401 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            _ => Self::Server { status, message },
        }
    }
}

/// Longest raw (non-JSON) body we are willing to show to the user.
const MAX_RAW_MESSAGE: usize = 200;

/// Pull a user-facing message out of an error body.
///
/// Accepts `{"error": "..."}` or `{"message": "..."}`, falling back to a
/// short plain-text body.
pub fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["error", "message", "msg"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .map(str::to_string);
    }

    if body.len() <= MAX_RAW_MESSAGE && !body.starts_with('<') {
        Some(body.to_string())
    } else {
        None
    }
}

/// Local validation failures. These block an action before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please answer at least one question before submitting.")]
    NoAnswers,

    #[error("Please select at least one question type")]
    NoQuestionTypes,

    #[error("Number of questions must be between 1 and 10 (got {0})")]
    QuestionCountOutOfRange(u8),

    #[error("Please select a study material")]
    MissingMaterial,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
