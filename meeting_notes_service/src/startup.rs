use actix_cors::Cors;
use actix_web::{
    dev::Server,
    http::{Method, StatusCode},
    middleware::ErrorHandlers,
    web::{self, Data},
    App, HttpServer,
};
use common::helper::error_chain_fmt;
use std::{net::TcpListener, sync::Arc};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::Settings,
    ports::completion_client::CompletionClient,
    repositories::gemini_completion_repository::GeminiCompletionRepository,
    routes::{fallback, preflight, process_meeting, render_json_error, service_info},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl std::fmt::Debug for ApplicationBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl Application {
    /// Builds the application with a Gemini completion client
    ///
    /// A missing API key does not prevent the server from starting:
    /// requests are rejected until one is configured.
    ///
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let completion_client = GeminiCompletionRepository::new(&settings.gemini);

        if !completion_client.is_configured() {
            warn!("No Gemini API key configured: meeting notes will be rejected until GEMINI_API_KEY is set");
        }

        Self::build_with_client(settings, nb_workers, Arc::new(completion_client)).await
    }

    /// Builds the application with any completion client, for ex a fake one in tests
    pub async fn build_with_client(
        settings: Settings,
        nb_workers: Option<usize>,
        completion_client: Arc<dyn CompletionClient>,
    ) -> Result<Self, ApplicationBuildError> {
        std::fs::create_dir_all(&settings.application.upload_directory)?;

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, settings, nb_workers, completion_client)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!(port = self.port, "Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// Middlewares, from the outside in:
/// - TracingLogger: generates a unique `request_id` for each incoming request
/// - Cors: answers preflight requests and adds permissive cross-origin headers
///   (other `OPTIONS` requests are answered by the `preflight` route)
/// - ErrorHandlers: turns actix-web's own error responses into JSON error payloads
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    settings: Settings,
    nb_workers: Option<usize>,
    completion_client: Arc<dyn CompletionClient>,
) -> Result<Server, std::io::Error> {
    // Shared among all workers: the client is stateless
    let completion_client: Data<dyn CompletionClient> = Data::from(completion_client);
    let application_settings = Data::new(settings.application.clone());
    let max_body_bytes = settings.application.max_upload_bytes;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(json_error_handlers())
            .wrap(cors())
            .wrap(TracingLogger::default())
            .service(
                web::resource("/")
                    .route(web::get().to(service_info))
                    .route(web::method(Method::OPTIONS).to(preflight)),
            )
            .service(
                web::resource("/process-meeting")
                    .route(web::post().to(process_meeting))
                    .route(web::method(Method::OPTIONS).to(preflight)),
            )
            .default_service(web::to(fallback))
            .app_data(completion_client.clone())
            .app_data(application_settings.clone())
            .app_data(web::JsonConfig::default().limit(max_body_bytes))
            .app_data(web::FormConfig::default().limit(max_body_bytes))
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

/// Any origin, any method, any header
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

fn json_error_handlers<B: 'static>() -> ErrorHandlers<B> {
    [
        StatusCode::BAD_REQUEST,
        StatusCode::NOT_FOUND,
        StatusCode::METHOD_NOT_ALLOWED,
        StatusCode::PAYLOAD_TOO_LARGE,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StatusCode::INTERNAL_SERVER_ERROR,
    ]
    .into_iter()
    .fold(ErrorHandlers::new(), |handlers, status| {
        handlers.handler(status, render_json_error)
    })
}
