use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str, description: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            description: description.to_string(),
        }
    }
}

/// Health and info handler: what the service is and which endpoints it serves
#[tracing::instrument(name = "Service info handler")]
pub async fn service_info() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "ok".to_string(),
        description: "Extracts a summary, decisions and action items from meeting notes"
            .to_string(),
        endpoints: vec![
            EndpointInfo::new("GET", "/", "This service description"),
            EndpointInfo::new(
                "POST",
                "/process-meeting",
                "Meeting notes as a plain text `file` upload or a `text` field",
            ),
        ],
    })
}
