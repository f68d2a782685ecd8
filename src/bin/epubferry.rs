//! Server binary for epubferry.
//!
//! A thin axum shim over the library crate: one route to kick off a
//! conversion job, one long-lived SSE route to watch its progress, and
//! static hosting for the bundled web UI. All pipeline behaviour lives in
//! the library.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use epubferry::{
    CommandConverter, FerryConfig, FerryError, FerryService, HttpFetcher, WebDavStore,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Convert EPUB documents to PDF and ferry them to WebDAV.
#[derive(Debug, Parser)]
#[command(name = "epubferry", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "FERRY_BIND", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Directory for per-job scratch files.
    #[arg(long, env = "FERRY_SCRATCH_DIR", default_value = "./temp")]
    scratch_dir: PathBuf,

    /// External converter program.
    #[arg(long, env = "FERRY_CONVERTER", default_value = "ebook-convert")]
    converter: PathBuf,

    /// Directory served under /static.
    #[arg(long, env = "FERRY_STATIC_DIR", default_value = "./public")]
    static_dir: PathBuf,

    /// Base URL of the WebDAV share.
    #[arg(long, env = "WEBDAV_URL")]
    webdav_url: String,

    /// WebDAV username.
    #[arg(long, env = "WEBDAV_USERNAME")]
    webdav_username: String,

    /// WebDAV password.
    #[arg(long, env = "WEBDAV_PASSWORD", hide_env_values = true)]
    webdav_password: String,

    /// Download timeout in seconds.
    #[arg(long, env = "FERRY_FETCH_TIMEOUT", default_value_t = 120)]
    fetch_timeout: u64,

    /// Converter timeout in seconds.
    #[arg(long, env = "FERRY_CONVERT_TIMEOUT", default_value_t = 300)]
    convert_timeout: u64,

    /// Upload timeout in seconds.
    #[arg(long, env = "FERRY_UPLOAD_TIMEOUT", default_value_t = 120)]
    upload_timeout: u64,
}

#[derive(Debug, Deserialize)]
struct ConvertRequest {
    #[serde(rename = "epubUrl")]
    epub_url: String,
}

#[derive(Debug, Serialize)]
struct ConvertError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = FerryConfig::builder()
        .scratch_root(&args.scratch_dir)
        .fetch_timeout_secs(args.fetch_timeout)
        .convert_timeout_secs(args.convert_timeout)
        .build()?;

    tracing::info!(
        webdav = %args.webdav_url,
        scratch = %args.scratch_dir.display(),
        converter = %args.converter.display(),
        "Initialising service"
    );

    let service = Arc::new(FerryService::new(
        config,
        Arc::new(HttpFetcher::new(args.fetch_timeout)?),
        Arc::new(CommandConverter::new(&args.converter, args.convert_timeout)),
        Arc::new(WebDavStore::new(
            &args.webdav_url,
            &args.webdav_username,
            &args.webdav_password,
            args.upload_timeout,
        )?),
    )?);

    let app = Router::new()
        .route("/convert", post(convert_handler))
        .route("/status", get(status_handler))
        .nest_service("/static", ServeDir::new(&args.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("cannot bind {}", args.bind))?;
    tracing::info!("Server listening on {}", args.bind);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// POST /convert — run one conversion job to completion.
///
/// The response is sent only after the pipeline finishes (or fails);
/// progress streams out-of-band via GET /status in the meantime.
async fn convert_handler(
    State(service): State<Arc<FerryService>>,
    Json(req): Json<ConvertRequest>,
) -> Response {
    tracing::info!(url = %req.epub_url, "Conversion request received");

    match service.run(&req.epub_url).await {
        Ok(report) => {
            tracing::info!(
                job_id = %report.job_id,
                remote = %report.remote_path,
                "Conversion request succeeded"
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({ "status": "success" })),
            )
                .into_response()
        }
        Err(e) => {
            let status = match &e {
                FerryError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
                FerryError::Busy => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = ConvertError {
                error: e.to_string(),
                stage: e.stage().map(|s| s.label()),
            };
            tracing::warn!(status = %status, error = %body.error, "Conversion request failed");
            (status, Json(body)).into_response()
        }
    }
}

/// GET /status — long-lived SSE stream of progress events.
///
/// The listener registers on connect and is reclaimed automatically when
/// the client goes away (dropping the stream unregisters it). Late joiners
/// see only events published after they connected.
async fn status_handler(
    State(service): State<Arc<FerryService>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("SSE listener connected");

    let stream = service
        .subscribe()
        .map(|event| Ok(Event::default().data(event.to_wire())));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
