use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::http::header::{self, ContentType};
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use anyhow::anyhow;
use common::helper::error_chain_fmt;
use futures::{FutureExt, TryStreamExt};
use std::panic::AssertUnwindSafe;
use tracing::{error, info, warn};

use crate::{
    configuration::ApplicationSettings,
    domain::entities::meeting_input::{MeetingInput, MeetingInputError, UploadedMeetingFile},
    ports::completion_client::CompletionClient,
    routes::error_payload::ErrorPayload,
    use_cases::extract_meeting_notes::{extract_meeting_notes, ExtractionError},
};

/// Multipart field carrying the uploaded notes
const FILE_FIELD: &str = "file";
/// Multipart, form or JSON field carrying inline notes
const TEXT_FIELD: &str = "text";

const ACCEPTED_MEDIA_TYPE: &str = "text/plain";
const ACCEPTED_EXTENSIONS: [&str; 2] = [".txt", ".text"];

/// Inline notes sent as JSON or as an url-encoded form
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct InlineTextBody {
    #[serde(default)]
    pub text: Option<String>,
}

/// Process meeting notes handler
///
/// Accepts the notes as a `file` multipart field (plain text only), or inline in a `text` field
/// (multipart, url-encoded form or JSON body). Responds with the extracted summary, decisions
/// and action items.
///
/// An uploaded file only lives for the duration of the request: it is deleted once the
/// extraction is over, whatever its outcome.
///
/// A panic while processing the request is turned into a 500 response.
#[tracing::instrument(
    name = "Process meeting handler",
    skip(request, payload, completion_client, settings)
)]
pub async fn process_meeting(
    request: HttpRequest,
    payload: web::Payload,
    completion_client: web::Data<dyn CompletionClient>,
    settings: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, ProcessMeetingError> {
    AssertUnwindSafe(handle_process_meeting(
        &request,
        payload,
        completion_client.get_ref(),
        settings.get_ref(),
    ))
    .catch_unwind()
    .await
    .map_err(|_| {
        error!("Panic while processing meeting notes");
        ProcessMeetingError::InternalError(anyhow!("Meeting notes processing panicked"))
    })?
}

async fn handle_process_meeting(
    request: &HttpRequest,
    payload: web::Payload,
    completion_client: &dyn CompletionClient,
    settings: &ApplicationSettings,
) -> Result<HttpResponse, ProcessMeetingError> {
    // Fails before reading anything from the request
    if !completion_client.is_configured() {
        return Err(ExtractionError::MissingCredential.into());
    }

    // Owns the uploaded file, if any, until the end of this function
    let input = read_meeting_input(request, payload, settings).await?;

    let meeting_text = input.text().await?;
    if meeting_text.trim().is_empty() {
        return Err(ProcessMeetingError::MissingInput);
    }

    match &input {
        MeetingInput::File(file) => info!(
            file_name = ?file.file_name(),
            size = file.size(),
            "Processing uploaded meeting notes"
        ),
        MeetingInput::Text(text) => info!(length = text.len(), "Processing inline meeting notes"),
    }

    let result = extract_meeting_notes(completion_client, &meeting_text).await?;

    Ok(HttpResponse::Ok().json(result))
}

/// Reads the notes from the request, the way they were sent
async fn read_meeting_input(
    request: &HttpRequest,
    payload: web::Payload,
    settings: &ApplicationSettings,
) -> Result<MeetingInput, ProcessMeetingError> {
    let mut payload = payload.into_inner();

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::new(request.headers(), payload);
        return read_multipart(multipart, settings).await;
    }

    let body = if content_type.starts_with("application/json") {
        web::Json::<InlineTextBody>::from_request(request, &mut payload)
            .await
            .map_err(|error| ProcessMeetingError::InvalidInput(error.to_string()))?
            .into_inner()
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        web::Form::<InlineTextBody>::from_request(request, &mut payload)
            .await
            .map_err(|error| ProcessMeetingError::InvalidInput(error.to_string()))?
            .into_inner()
    } else {
        InlineTextBody { text: None }
    };

    Ok(MeetingInput::Text(body.text.unwrap_or_default()))
}

/// Reads a `multipart/form-data` body
///
/// Only the first `file` field and the `text` field are used, other fields are skipped.
/// An empty uploaded file is treated as if no file was sent.
async fn read_multipart(
    mut multipart: Multipart,
    settings: &ApplicationSettings,
) -> Result<MeetingInput, ProcessMeetingError> {
    let mut uploaded_file: Option<UploadedMeetingFile> = None;
    let mut text = String::new();

    while let Some(mut field) = multipart.try_next().await? {
        let content_disposition = field.content_disposition();
        let field_name = content_disposition.get_name().unwrap_or_default().to_string();
        let file_name = content_disposition.get_filename().map(str::to_string);

        match field_name.as_str() {
            FILE_FIELD => {
                if uploaded_file.is_some() {
                    return Err(ProcessMeetingError::UnexpectedField(field_name));
                }

                // Parts without a content type are plain text by default (RFC 7578)
                let content_type = field
                    .content_type()
                    .map(|mime| mime.essence_str().to_string())
                    .unwrap_or_else(|| ACCEPTED_MEDIA_TYPE.to_string());

                // Checked before reading any byte of the file
                check_uploaded_file_type(&content_type, file_name.as_deref())?;

                let mut file = UploadedMeetingFile::create_in(
                    &settings.upload_directory,
                    file_name,
                    content_type,
                )?;

                while let Some(chunk) = field.try_next().await? {
                    if file.size() + chunk.len() > settings.max_upload_bytes {
                        return Err(ProcessMeetingError::PayloadTooLarge(
                            settings.max_upload_bytes,
                        ));
                    }
                    file.append(chunk).await?;
                }

                uploaded_file = Some(file);
            }
            TEXT_FIELD => {
                let bytes = read_field(&mut field, settings.max_upload_bytes).await?;
                text = String::from_utf8(bytes).map_err(|_| {
                    ProcessMeetingError::InvalidInput("`text` is not valid UTF-8".to_string())
                })?;
            }
            _ => {
                warn!(field_name, "Skipping unknown multipart field");
                while field.try_next().await?.is_some() {}
            }
        }
    }

    match uploaded_file {
        Some(file) if file.size() > 0 => Ok(MeetingInput::File(file)),
        _ => Ok(MeetingInput::Text(text)),
    }
}

async fn read_field(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>, ProcessMeetingError> {
    let mut bytes = Vec::new();

    while let Some(chunk) = field.try_next().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(ProcessMeetingError::PayloadTooLarge(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Only plain text files are accepted, with a `.txt`-like name when a name is given
fn check_uploaded_file_type(
    content_type: &str,
    file_name: Option<&str>,
) -> Result<(), ProcessMeetingError> {
    let is_plain_text = content_type.eq_ignore_ascii_case(ACCEPTED_MEDIA_TYPE);
    let has_text_extension = file_name.map_or(true, |name| {
        let name = name.to_lowercase();
        ACCEPTED_EXTENSIONS
            .iter()
            .any(|extension| name.ends_with(extension))
    });

    if is_plain_text && has_text_extension {
        return Ok(());
    }

    Err(ProcessMeetingError::UnsupportedFileType {
        content_type: content_type.to_string(),
        file_name: file_name.map(str::to_string),
    })
}

#[derive(thiserror::Error)]
pub enum ProcessMeetingError {
    #[error("No input provided.")]
    MissingInput,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid multipart payload: {0}")]
    InvalidMultipart(#[from] MultipartError),
    #[error("Unexpected field `{0}`: only one file can be uploaded")]
    UnexpectedField(String),
    #[error("Only plain text (.txt) files are accepted, got `{content_type}`")]
    UnsupportedFileType {
        content_type: String,
        file_name: Option<String>,
    },
    #[error("Upload is larger than {0} bytes")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    ExtractionError(#[from] ExtractionError),
    #[error(transparent)]
    MeetingInputError(#[from] MeetingInputError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ProcessMeetingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ProcessMeetingError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProcessMeetingError::MissingInput
            | ProcessMeetingError::InvalidInput(_)
            | ProcessMeetingError::InvalidMultipart(_)
            | ProcessMeetingError::UnexpectedField(_)
            | ProcessMeetingError::MeetingInputError(MeetingInputError::NotUtf8(_)) => {
                StatusCode::BAD_REQUEST
            }
            ProcessMeetingError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ProcessMeetingError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProcessMeetingError::ExtractionError(ExtractionError::InvalidCredential(_)) => {
                StatusCode::UNAUTHORIZED
            }
            ProcessMeetingError::ExtractionError(ExtractionError::QuotaExceeded(_)) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ProcessMeetingError::ExtractionError(ExtractionError::MissingCredential)
            | ProcessMeetingError::ExtractionError(ExtractionError::UnparsableModelOutput {
                ..
            })
            | ProcessMeetingError::ExtractionError(ExtractionError::Unclassified(_))
            | ProcessMeetingError::MeetingInputError(_)
            | ProcessMeetingError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from process_meeting controller", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "Failed to process meeting notes");
        } else {
            warn!(error = %self, "Rejected meeting notes request");
        }

        let payload = match self {
            ProcessMeetingError::ExtractionError(ExtractionError::UnparsableModelOutput {
                raw,
                parse_error,
            }) => ErrorPayload::unparsable_model_output(raw, parse_error),
            _ => ErrorPayload::new(self.to_string()),
        };

        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .json(payload)
    }
}
