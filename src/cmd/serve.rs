//! The `serve` subcommand: the pipeline as a session-scoped HTTP API.
//!
//! Each session key owns an independent [`ExtractionSession`] plus the
//! uploaded image it works on. A per-session lock serializes pipeline runs
//! within one session; sessions never share state with each other.

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path as UrlPath, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    confidence::Band,
    engine::{OcrEngine, engine_for_name},
    error::ExtractError,
    imageio::{self, RawImage},
    pipeline,
    prelude::*,
    preprocess::{self, PreprocessConfig},
    session::{ExtractionSession, SessionState},
};

/// Options for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeOpts {
    /// Address to listen on.
    #[clap(long, default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// The OCR engine to use.
    #[clap(long, default_value = "tesseract")]
    pub engine: String,
}

/// Shared application state.
struct AppState {
    /// The OCR engine all sessions share. Engines are stateless.
    engine: Arc<dyn OcrEngine>,

    /// Live sessions, by key. Each entry carries its own lock so one
    /// session's (slow) pipeline run never blocks another session.
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<SessionEntry>>>>,
}

/// Everything one session owns.
#[derive(Default)]
struct SessionEntry {
    image: Option<RawImage>,
    session: ExtractionSession,
}

/// Errors surfaced by the HTTP API.
enum ApiError {
    Extract(ExtractError),
    UnknownSession(Uuid),
    NoImage,
    NoPdf,
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        ApiError::Extract(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Extract(err) => (err.status_code(), err.to_string()),
            ApiError::UnknownSession(id) => {
                (StatusCode::NOT_FOUND, format!("unknown session {id}"))
            }
            ApiError::NoImage => (
                StatusCode::CONFLICT,
                "no image has been uploaded to this session".to_owned(),
            ),
            ApiError::NoPdf => (
                StatusCode::NOT_FOUND,
                "no extraction has succeeded yet, so there is no PDF".to_owned(),
            ),
        };
        error!(status = %status, message = %message, "Request failed");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// The `serve` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_serve(opts: &ServeOpts) -> Result<()> {
    let engine = engine_for_name(&opts.engine)?;
    let state = Arc::new(AppState {
        engine,
        sessions: Mutex::new(HashMap::new()),
    });

    let app = Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(session_status))
        .route("/sessions/:id/image", post(upload_image))
        .route("/sessions/:id/preview", get(preview))
        .route("/sessions/:id/extract", post(extract))
        .route("/sessions/:id/text", get(download_text).put(edit_text))
        .route("/sessions/:id/pdf", get(download_pdf))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(opts.listen)
        .await
        .with_context(|| format!("cannot listen on {}", opts.listen))?;
    info!(listen = %opts.listen, "Serving extraction API");
    axum::serve(listener, app)
        .await
        .context("server terminated unexpectedly")?;
    Ok(())
}

/// Look up a session by key.
async fn entry(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<Mutex<SessionEntry>>, ApiError> {
    state
        .sessions
        .lock()
        .await
        .get(&id)
        .cloned()
        .ok_or(ApiError::UnknownSession(id))
}

#[derive(Serialize)]
struct CreatedSession {
    session_id: Uuid,
}

/// `POST /sessions`: start a fresh session.
#[instrument(level = "debug", skip_all)]
async fn create_session(State(state): State<Arc<AppState>>) -> Json<CreatedSession> {
    let session_id = Uuid::new_v4();
    state
        .sessions
        .lock()
        .await
        .insert(session_id, Arc::new(Mutex::new(SessionEntry::default())));
    info!(session_id = %session_id, "Created session");
    Json(CreatedSession { session_id })
}

#[derive(Serialize)]
struct UploadedImage {
    mime_type: String,
    width: u32,
    height: u32,
}

/// `POST /sessions/{id}/image`: upload the image to extract from.
///
/// Rejects anything that is not a decodable PNG or JPEG up front, before any
/// extraction can be requested.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn upload_image(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
    body: Bytes,
) -> Result<Json<UploadedImage>, ApiError> {
    let entry = entry(&state, id).await?;
    let image = RawImage::from_bytes(&body)?;
    let response = UploadedImage {
        mime_type: image.mime_type().to_owned(),
        width: image.bitmap().width(),
        height: image.bitmap().height(),
    };
    entry.lock().await.image = Some(image);
    Ok(Json(response))
}

/// `GET /sessions/{id}/preview`: the image as the engine would see it.
///
/// Returns the preprocessed image when any transform is active, otherwise
/// the original, always re-encoded as PNG.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn preview(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
    Query(config): Query<PreprocessConfig>,
) -> Result<Response, ApiError> {
    let entry = entry(&state, id).await?;
    let guard = entry.lock().await;
    let image = guard.image.as_ref().ok_or(ApiError::NoImage)?;
    let bitmap = if config.wants_preview() {
        preprocess::process(image.bitmap(), &config)
    } else {
        image.bitmap().clone()
    };
    let png = imageio::encode_png(&bitmap).map_err(ExtractError::from)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[derive(Serialize)]
struct ExtractResponse {
    state: SessionState,
    text: String,
    average_confidence: f64,
    band: Band,
    color: &'static str,
    token_count: usize,
}

/// `POST /sessions/{id}/extract`: run the full pipeline.
///
/// The per-session lock is held across the run, so one session executes at
/// most one pipeline at a time. A failed run answers with an explicit error
/// and leaves the session state untouched.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn extract(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
    config: Option<Json<PreprocessConfig>>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let config = config.map(|Json(config)| config).unwrap_or_default();
    let entry = entry(&state, id).await?;
    let mut guard = entry.lock().await;
    let image = guard.image.clone().ok_or(ApiError::NoImage)?;
    let report =
        pipeline::run(&mut guard.session, &image, &config, state.engine.as_ref())
            .await?;
    Ok(Json(ExtractResponse {
        state: guard.session.state(),
        text: guard.session.extracted_text().to_owned(),
        average_confidence: report.average_confidence,
        band: report.band,
        color: report.band.color(),
        token_count: report.token_count,
    }))
}

#[derive(Deserialize)]
struct EditRequest {
    text: String,
}

#[derive(Serialize)]
struct EditResponse {
    state: SessionState,
    text: String,
}

/// `PUT /sessions/{id}/text`: reconcile a user-edited text value.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn edit_text(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditResponse>, ApiError> {
    let entry = entry(&state, id).await?;
    let mut guard = entry.lock().await;
    guard.session.reconcile_edit(&request.text);
    Ok(Json(EditResponse {
        state: guard.session.state(),
        text: guard.session.extracted_text().to_owned(),
    }))
}

/// `GET /sessions/{id}/text`: download the current text, edits included.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn download_text(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Result<Response, ApiError> {
    let entry = entry(&state, id).await?;
    let guard = entry.lock().await;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"extracted_text.txt\"",
            ),
        ],
        guard.session.extracted_text().to_owned(),
    )
        .into_response())
}

/// `GET /sessions/{id}/pdf`: download the PDF from the last successful
/// extraction.
///
/// The PDF is never regenerated from edited text; after an edit it still
/// embeds what the engine recognized. 404 until the first successful run.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn download_pdf(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Result<Response, ApiError> {
    let entry = entry(&state, id).await?;
    let guard = entry.lock().await;
    let pdf = guard.session.pdf_bytes().ok_or(ApiError::NoPdf)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"extracted_document.pdf\"",
            ),
        ],
        pdf.to_vec(),
    )
        .into_response())
}

#[derive(Serialize)]
struct SessionStatus {
    state: SessionState,
    has_image: bool,
    average_confidence: Option<f64>,
    band: Option<Band>,
}

/// `GET /sessions/{id}`: session state at a glance.
#[instrument(level = "debug", skip_all, fields(session_id = %id))]
async fn session_status(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Result<Json<SessionStatus>, ApiError> {
    let entry = entry(&state, id).await?;
    let guard = entry.lock().await;
    Ok(Json(SessionStatus {
        state: guard.session.state(),
        has_image: guard.image.is_some(),
        average_confidence: guard.session.average_confidence(),
        band: guard.session.average_confidence().map(Band::of),
    }))
}
