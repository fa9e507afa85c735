use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::pipeline::{Pipeline, RunPaths};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub struct AppState {
    pipeline: Mutex<Pipeline>,
    work_root: PathBuf,
    requests: AtomicU64,
}

impl AppState {
    pub fn new(pipeline: Pipeline, work_root: &Path) -> Self {
        Self {
            pipeline: Mutex::new(pipeline),
            work_root: work_root.to_owned(),
            requests: AtomicU64::new(0),
        }
    }

    /// Runs the pipeline on `pdf` in a scratch directory and returns the
    /// bytes of the first episode, if any was produced.
    async fn generate(&self, pdf: &[u8]) -> Result<Option<Vec<u8>>> {
        let pipeline = self.pipeline.lock().await;

        let request = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        let work_dir = self
            .work_root
            .join(format!("request_{}_{request}", std::process::id()));
        tokio::fs::create_dir_all(&work_dir)
            .await
            .context("Failed to create working directory")?;

        let result = Self::run_in(&pipeline, &work_dir, pdf).await;

        if let Err(error) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!(
                directory = %work_dir.display(),
                "Failed to remove working directory: {error}"
            );
        }
        result
    }

    async fn run_in(pipeline: &Pipeline, work_dir: &Path, pdf: &[u8]) -> Result<Option<Vec<u8>>> {
        let pdf_path = work_dir.join("input.pdf");
        tokio::fs::write(&pdf_path, pdf)
            .await
            .context("Failed to store uploaded PDF")?;

        let episodes = pipeline.run(&pdf_path, &RunPaths::under(work_dir)).await?;
        let Some(first) = episodes.first() else {
            return Ok(None);
        };

        let audio = tokio::fs::read(first)
            .await
            .with_context(|| format!("Failed to read episode {}", first.display()))?;
        Ok(Some(audio))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate-podcast", post(generate_podcast))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, create_router(state))
        .await
        .context("Server error")
}

async fn health() -> Json<HealthResponse> {
    tracing::debug!("Health check");
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

async fn generate_podcast(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest(
            "Request body must contain a PDF file".to_string(),
        ));
    }

    tracing::info!(bytes = body.len(), "Received PDF");

    match state.generate(&body).await {
        Ok(Some(audio)) => Ok(([(header::CONTENT_TYPE, "audio/wav")], audio).into_response()),
        Ok(None) => Err(AppError::Internal(
            "No podcast episodes were generated".to_string(),
        )),
        Err(error) => {
            tracing::error!("Podcast generation failed: {error:#}");
            Err(AppError::Internal(format!("{error:#}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ConversationCache, ConversationCacheKey};
    use crate::conversation::fake::ScriptedBackend;
    use crate::conversation::{ChatBackend, LlmBackend};
    use crate::synth::fake::FakeSynthesizer;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    const UPLOAD: &[u8] = b"%PDF-1.4 cached upload";

    /// Work directories go under `root/work`; conversations for `UPLOAD`
    /// are served from a cache under `root/cache`.
    async fn state(root: &Path) -> Arc<AppState> {
        let config = toml::from_str(
            r#"
            [voices]
            host = "rachel"
            expert = "kevin"

            [audio]
            request_delay_ms = 0
            retry_delay_ms = 0
            "#,
        )
        .unwrap();

        let cache = ConversationCache::with_directory(&root.join("cache"))
            .await
            .unwrap();
        cache
            .insert(
                &ConversationCacheKey::new(UPLOAD, LlmBackend::Groq, "scripted"),
                &["Host: Welcome to the show.\nExpert: Glad to be here.".to_owned()],
            )
            .await;

        let pipeline = Pipeline::with_backends(
            config,
            LlmBackend::Groq,
            Box::new(|| {
                Ok::<Box<dyn ChatBackend>, anyhow::Error>(Box::new(ScriptedBackend::default()))
            }),
            Arc::new(FakeSynthesizer::new(10)),
            Some(cache),
        );
        Arc::new(AppState::new(pipeline, &root.join("work")))
    }

    async fn upload(state: Arc<AppState>, body: &'static [u8]) -> Response {
        create_router(state)
            .oneshot(
                Request::post("/generate-podcast")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    fn work_entries(root: &Path) -> usize {
        std::fs::read_dir(root.join("work")).unwrap().count()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let root = tempfile::tempdir().unwrap();
        let response = create_router(state(root.path()).await)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "healthy"})
        );
    }

    #[tokio::test]
    async fn first_episode_is_returned_as_wav() {
        let root = tempfile::tempdir().unwrap();
        let response = upload(state(root.path()).await, UPLOAD).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        let audio = body_bytes(response).await;
        assert_eq!(&audio[..4], b"RIFF");
        assert_eq!(work_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let response = upload(state(root.path()).await, b"").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Request body must contain a PDF file"
        );
    }

    #[tokio::test]
    async fn failed_run_returns_error_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let response = upload(state(root.path()).await, b"this is not a pdf").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(response).await["error"].is_string());
        assert_eq!(work_entries(root.path()), 0);
    }
}
