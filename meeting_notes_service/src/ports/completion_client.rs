use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::extraction_prompt::ExtractionPrompt;

/// A large-language-model completion API, sending one prompt and returning the textual reply.
///
/// Implementations: `GeminiCompletionRepository`. Tests inject fakes.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the prompt and waits for the whole reply: exactly one request, never retried
    async fn complete(&self, prompt: &ExtractionPrompt) -> Result<String, CompletionClientError>;

    /// Whether a credential is available. Checked before any network call.
    fn is_configured(&self) -> bool;

    /// For logs
    fn provider_name(&self) -> &str;
}

#[derive(thiserror::Error)]
pub enum CompletionClientError {
    #[error("No API key configured for the completion API")]
    MissingCredential,
    #[error("The completion API rejected the API key: {0}")]
    InvalidCredential(String),
    #[error("The completion API quota is exhausted: {0}")]
    QuotaExceeded(String),
    #[error("The completion API returned no text")]
    EmptyReply,
    #[error("{0}")]
    Unclassified(String),
}

impl std::fmt::Debug for CompletionClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl CompletionClientError {
    /// Classifies a failed call from what the API told us.
    ///
    /// The HTTP status (and Google's `status` string, like `RESOURCE_EXHAUSTED`) is used first.
    /// Some failures only show in the message (an invalid key is a plain 400 for Gemini),
    /// so the message is matched as a fallback.
    ///
    /// # Parameters
    /// - `http_status`: status code of the response, `None` if no response was received
    /// - `message`: error message, from the response body or the transport error
    pub fn classify(http_status: Option<u16>, message: &str) -> Self {
        let lowercase_message = message.to_lowercase();

        let is_credential_error = matches!(http_status, Some(401) | Some(403))
            || lowercase_message.contains("api key")
            || lowercase_message.contains("api_key")
            || lowercase_message.contains("unauthenticated")
            || lowercase_message.contains("permission_denied");

        let is_quota_error = http_status == Some(429)
            || lowercase_message.contains("quota")
            || lowercase_message.contains("resource_exhausted")
            || lowercase_message.contains("rate limit");

        if is_quota_error {
            Self::QuotaExceeded(message.to_string())
        } else if is_credential_error {
            Self::InvalidCredential(message.to_string())
        } else {
            Self::Unclassified(message.to_string())
        }
    }
}
