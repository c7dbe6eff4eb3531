//! # intake: request-payload ingestion helpers
//!
//! `intake` handles the two kinds of untrusted payload most HTTP services accept: multipart file
//! uploads and JSON request bodies. Both arrive size-bounded at best and malformed at worst, and
//! both need their low-level parse and transport failures turned into errors a handler can act on.
//!
//! ## Uploads
//!
//! [`upload::ingest`] reads a `multipart/form-data` request under a combined size ceiling, sniffs
//! each file part's content type from its leading bytes (declared part headers are never
//! trusted), checks it against an allow-list, picks a stored name (random by default, keeping the
//! extension) and streams the part into a target directory. The result is one
//! [`upload::UploadedFile`] per file, or an [`upload::IngestFailure`] carrying the error and the
//! records of files already written.
//!
//! ## JSON
//!
//! [`json::decode_body`] and the [`json::StrictJson`] extractor bound the body size, reject fields
//! the target type does not declare (unless the policy allows them), and refuse bodies carrying
//! more than one value. Failures are classified (malformed, type mismatch naming the field,
//! unknown key, empty body, ...). On the way out, [`json::encode`] and [`json::encode_error`]
//! write payloads and the standard [`json::Envelope`].
//!
//! ## Server
//!
//! The `intake` binary mounts the helpers on a few routes (see [`api`]) so they can be used and
//! tested end to end. Configuration is loaded by [`config::Config::load`].
//!
//! ```ignore
//! let config = Config::load(&Args::parse())?;
//! Application::new(config).await?.serve(shutdown_signal()).await?;
//! ```

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};

pub mod api;
pub mod config;
pub mod download;
pub mod errors;
pub mod json;
pub mod naming;
pub mod telemetry;
pub mod upload;

#[cfg(test)]
mod test;

pub use config::Config;
pub use errors::{Error, ErrorKind, Result};

use json::JsonCodecPolicy;

/// Allowance on top of `uploads.max_total_bytes` for multipart boundaries and part headers,
/// which the form ceiling does not count.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
}

impl FromRef<AppState> for JsonCodecPolicy {
    fn from_ref(state: &AppState) -> Self {
        state.config.json.clone()
    }
}

/// Build the application router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.uploads.max_total_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/files", post(api::handlers::files::upload_files))
        .route("/files/one", post(api::handlers::files::upload_one))
        .route("/files/{name}", get(api::handlers::files::download_file))
        .route("/slugs", post(api::handlers::slugs::create_slug))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The `intake` server.
///
/// 1. **Create**: [`Application::new`] ensures the upload directory exists and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting intake with configuration: {:#?}", config);

        upload::ensure_dir(&config.upload_dir).await?;

        let app_state = AppState::builder().config(config.clone()).build();
        let router = build_router(app_state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "intake listening on http://{}, storing uploads in {}",
            bind_addr,
            self.config.upload_dir.display()
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}
