use actix_web::{
    body::EitherBody,
    dev::ServiceResponse,
    http::header,
    middleware::ErrorHandlerResponse,
    HttpResponse,
};
use serde::{Deserialize, Serialize};

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: String,
    /// Raw reply of the model, when it could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            raw: None,
            parse_error: None,
        }
    }

    pub fn unparsable_model_output(raw: &str, parse_error: &str) -> Self {
        Self {
            error: "Invalid JSON".to_string(),
            raw: Some(raw.to_string()),
            parse_error: Some(parse_error.to_string()),
        }
    }
}

/// Rewrites error responses produced by actix-web itself (404, 405, rejected bodies...)
/// into an `ErrorPayload`.
///
/// Responses that already carry a JSON body come from our own `ResponseError`s
/// and are kept untouched.
pub fn render_json_error<B>(
    response: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.starts_with("application/json"));

    if is_json {
        return Ok(ErrorHandlerResponse::Response(
            response.map_into_left_body(),
        ));
    }

    let status = response.status();
    let message = response
        .response()
        .error()
        .map(|error| error.to_string())
        .filter(|message| !message.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "Unexpected error".to_string());

    let (request, _) = response.into_parts();
    let json_response = HttpResponse::build(status).json(ErrorPayload::new(message));
    let response: ServiceResponse<EitherBody<B>> =
        ServiceResponse::new(request, json_response).map_into_right_body();

    Ok(ErrorHandlerResponse::Response(response))
}
