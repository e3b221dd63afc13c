use common::helper::error_chain_fmt;
use tracing::{error, info, warn};

use crate::{
    domain::entities::{extraction_prompt::ExtractionPrompt, extraction_result::ExtractionResult},
    ports::completion_client::{CompletionClient, CompletionClientError},
};

/// Extracts a summary, decisions and action items from meeting notes
///
/// The credential is checked first, then the prompt is sent in a single completion call.
/// The reply is parsed once its code fence is removed. Nothing is retried.
///
/// # Parameters
/// - `completion_client`: the completion API to call
/// - `meeting_text`: the non-empty meeting notes, embedded verbatim in the prompt
#[tracing::instrument(
    name = "Extracting meeting notes",
    skip(completion_client, meeting_text),
    fields(provider = completion_client.provider_name(), meeting_text_length = meeting_text.len())
)]
pub async fn extract_meeting_notes(
    completion_client: &dyn CompletionClient,
    meeting_text: &str,
) -> Result<ExtractionResult, ExtractionError> {
    if !completion_client.is_configured() {
        error!("No API key configured, the completion API is not called");
        return Err(ExtractionError::MissingCredential);
    }

    let prompt = ExtractionPrompt::build(meeting_text);

    let reply = completion_client.complete(&prompt).await?;

    let result = ExtractionResult::from_reply(&reply).map_err(|error| {
        warn!(?error, raw = %reply, "Model reply is not a valid extraction result");
        ExtractionError::UnparsableModelOutput {
            parse_error: error.to_string(),
            raw: reply.clone(),
        }
    })?;

    info!(
        decisions = result.decisions.len(),
        action_items = result.action_items.len(),
        "Meeting notes extracted"
    );
    Ok(result)
}

#[derive(thiserror::Error)]
pub enum ExtractionError {
    #[error("API key is not configured")]
    MissingCredential,
    #[error("Invalid API key: {0}")]
    InvalidCredential(String),
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Invalid JSON")]
    UnparsableModelOutput { raw: String, parse_error: String },
    #[error("{0}")]
    Unclassified(String),
}

impl From<CompletionClientError> for ExtractionError {
    fn from(error: CompletionClientError) -> Self {
        match error {
            CompletionClientError::MissingCredential => ExtractionError::MissingCredential,
            CompletionClientError::InvalidCredential(message) => {
                ExtractionError::InvalidCredential(message)
            }
            CompletionClientError::QuotaExceeded(message) => ExtractionError::QuotaExceeded(message),
            CompletionClientError::EmptyReply => {
                ExtractionError::Unclassified(CompletionClientError::EmptyReply.to_string())
            }
            CompletionClientError::Unclassified(message) => ExtractionError::Unclassified(message),
        }
    }
}

impl std::fmt::Debug for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
