use tokio::task::JoinHandle;
use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Builds the `tracing` Subscriber shared by the binary and the tests.
///
/// Layers, from the inside out:
/// - `EnvFilter`: reads `RUST_LOG`, or falls back to `fallback_env_filter`
/// - `JsonStorageLayer`: keeps span fields so children can see their parents' context
/// - `BunyanFormattingLayer`: writes every record as a bunyan JSON line into `sink`
///
/// # Arguments
/// - `name`: name of the app, written in each record
/// - `fallback_env_filter`: filter used when `RUST_LOG` is not set, for ex `"info"`
/// - `sink`: where the records are written (`std::io::stdout`, `std::io::sink` in tests)
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The sink must be able to hand out a writer for any lifetime
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` as the process-wide default and redirects `log` records to it.
///
/// Must only be called once: a second call panics.
pub fn init_tracing_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");

    set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Runs a blocking closure on tokio's blocking pool, inside the caller's current span.
///
/// Without it, records emitted from the closure lose the request context (request id, etc.).
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}
