pub mod client;

pub use client::*;

use thiserror::Error;

/// Failure of a single generative-model call.
///
/// Transient failures (rate limits, timeouts, 5xx) are retried by the
/// role recognizer with exponential backoff; fatal failures are not.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transient model failure: {0}")]
    Transient(String),
    #[error("model call failed: {0}")]
    Fatal(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transient(_))
    }
}

/// The generative-model collaborator: a bounded prompt in, structured
/// text out. The production implementation is [`GeminiClient`]; tests
/// substitute counting/scripted mocks.
pub trait GenerativeModel: Send + Sync {
    fn generate(
        &self,
        system: &str,
        user: &str,
    ) -> impl std::future::Future<Output = Result<String, ModelError>> + Send;
}
