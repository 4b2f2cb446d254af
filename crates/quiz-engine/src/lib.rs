//! Client-side engine for the study-quiz terminal app.
//!
//! This crate holds everything about studying with generated quizzes that
//! does not depend on a terminal: the wire models, an HTTP client for the
//! quiz service, the paged/searchable collection protocol and the
//! quiz-taking session state machine.
//!
//! # Features
//!
//! - **Sessions**: Load a quiz, capture answers, navigate, submit and review
//! - **Collections**: Paged lists with debounced search and filters
//! - **Auth**: Shared bearer credential cleared on 401
//! - **HTTP**: `reqwest` implementation of [`QuizApi`]
//!
//! Controllers never block on I/O. Each network step hands out a ticket
//! that the caller runs wherever it likes and feeds back; responses for
//! superseded tickets are dropped.

pub mod api;
pub mod auth;
pub mod debounce;
pub mod error;
pub mod http;
pub mod list;
pub mod models;
pub mod query;
pub mod question;
pub mod results;
pub mod session;

#[cfg(test)]
mod testing;

// Re-exports
pub use api::QuizApi;
pub use auth::{AuthSession, Credentials};
pub use debounce::Debouncer;
pub use error::{ApiError, ApiResult, ValidationError};
pub use http::{ClientConfig, HttpApi};
pub use list::{Attempts, Collection, FetchTicket, ListController, Materials, Quizzes};
pub use query::{CollectionQuery, Filter, FilterKey, Filters};
pub use session::{
    LoadError, QuizSession, SessionError, SessionState, SubmitFailure, SubmitRejection,
    SubmitTicket,
};
