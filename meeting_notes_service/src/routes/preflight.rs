use actix_web::{http::Method, HttpRequest, HttpResponse};

/// Answers `OPTIONS` requests that the CORS middleware did not handle,
/// for ex without an `Access-Control-Request-Method` header
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Fallback for unknown paths: `OPTIONS` still succeeds, anything else is a 404
pub async fn fallback(request: HttpRequest) -> HttpResponse {
    if request.method() == Method::OPTIONS {
        return preflight().await;
    }

    HttpResponse::NotFound().finish()
}
