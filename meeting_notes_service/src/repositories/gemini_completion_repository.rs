use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    configuration::GeminiSettings,
    domain::entities::extraction_prompt::ExtractionPrompt,
    ports::completion_client::{CompletionClient, CompletionClientError},
};

/// Client of Google's Gemini `generateContent` API
///
/// Built once at startup and shared by every worker: `reqwest::Client` already pools
/// its connections and is cheap to clone.
#[derive(Clone)]
pub struct GeminiCompletionRepository {
    client: Client,
    api_key: Option<Secret<String>>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Body of a failed Google API call
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
    status: Option<String>,
}

impl GeminiCompletionRepository {
    pub fn new(settings: &GeminiSettings) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key(),
            model: settings.model.clone(),
            base_url: settings.base_url.clone(),
        }
    }

    /// For ex: `https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent`
    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);

        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Turns a non-success response into a classified error
    async fn error_from_response(response: reqwest::Response) -> CompletionClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Google wraps errors as `{"error": {"code": 429, "message": "...", "status": "RESOURCE_EXHAUSTED"}}`
        let message = match serde_json::from_str::<GoogleErrorResponse>(&body) {
            Ok(GoogleErrorResponse {
                error:
                    GoogleError {
                        message,
                        status: Some(google_status),
                    },
            }) => format!("{}: {}", google_status, message),
            Ok(GoogleErrorResponse { error }) => error.message,
            Err(_) if body.is_empty() => status.to_string(),
            Err(_) => body,
        };

        CompletionClientError::classify(Some(status.as_u16()), &message)
    }
}

#[async_trait]
impl CompletionClient for GeminiCompletionRepository {
    #[tracing::instrument(name = "Gemini generateContent", skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &ExtractionPrompt) -> Result<String, CompletionClientError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(CompletionClientError::MissingCredential)?;

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.as_ref(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&request_body)
            .send()
            .await
            .map_err(|error| {
                error!(?error, "Request to the completion API failed");
                CompletionClientError::classify(
                    error.status().map(|status| status.as_u16()),
                    &error.to_string(),
                )
            })?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            error!(?error, "Completion API returned an error");
            return Err(error);
        }

        let response: GenerateContentResponse = response.json().await.map_err(|error| {
            CompletionClientError::Unclassified(format!(
                "Failed to parse the completion API response: {}",
                error
            ))
        })?;

        // The reply may be split over several parts of the first candidate
        let reply: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(CompletionClientError::EmptyReply);
        }

        info!(reply_length = reply.len(), "Completion received");
        Ok(reply)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
