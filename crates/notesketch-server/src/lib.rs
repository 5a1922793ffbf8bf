//! NoteSketch Media Server
//!
//! Receives images uploaded to notes and keeps the per-note media lists.
//!
//! ## Routes
//!
//! ```text
//! POST /note/{id}/add_media              multipart, field "file"
//! POST /media/{note_id}/{media_id}/delete
//! GET  /note/{id}/media
//! GET  /health
//! GET  /static/uploads/{name}
//! ```
//!
//! Upload answers are JSON:
//! ```json
//! { "status": "success", "media": { "id": "...", "type": "image", "url": "/static/uploads/..." } }
//! { "status": "error" }
//! ```

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use dashmap::DashMap;
use notesketch_core::{MediaItem, MediaKind, MediaResponse, NoteId};
use std::{
    net::{AddrParseError, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// File extensions accepted by `add_media`.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif"];

/// URL prefix uploaded files are served under.
pub const UPLOADS_URL: &str = "/static/uploads";

const DEFAULT_ADDR: &str = "0.0.0.0:3030";
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Addr(#[from] AddrParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
}

impl ServerConfig {
    /// Read `NOTESKETCH_ADDR` and `NOTESKETCH_UPLOAD_DIR`, falling back to
    /// `0.0.0.0:3030` and `./uploads`.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_vars(
            std::env::var("NOTESKETCH_ADDR").ok(),
            std::env::var("NOTESKETCH_UPLOAD_DIR").ok(),
        )
    }

    fn from_vars(addr: Option<String>, upload_dir: Option<String>) -> Result<Self, ServerError> {
        let addr = addr.as_deref().unwrap_or(DEFAULT_ADDR).parse()?;
        let upload_dir = PathBuf::from(upload_dir.as_deref().unwrap_or(DEFAULT_UPLOAD_DIR));
        Ok(Self { addr, upload_dir })
    }
}

/// Shared server state.
pub struct AppState {
    /// Media attached to each note.
    media: DashMap<NoteId, Vec<MediaItem>>,
    upload_dir: PathBuf,
}

impl AppState {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            media: DashMap::new(),
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        &self.upload_dir
    }

    /// Media attached to a note, oldest first.
    pub fn media_for(&self, note_id: NoteId) -> Vec<MediaItem> {
        self.media
            .get(&note_id)
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    fn attach(&self, note_id: NoteId, item: MediaItem) {
        self.media.entry(note_id).or_default().push(item);
    }

    /// Remove a media item. Returns whether it was attached.
    fn detach(&self, note_id: NoteId, media_id: &str) -> bool {
        match self.media.get_mut(&note_id) {
            Some(mut items) => {
                let before = items.len();
                items.retain(|m| m.id != media_id);
                items.len() != before
            }
            None => false,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(state.upload_dir.clone());

    Router::new()
        .route("/note/{id}/add_media", post(add_media))
        .route("/note/{id}/media", get(list_media))
        .route("/media/{note_id}/{media_id}/delete", post(delete_media))
        .route("/health", get(health))
        .nest_service(UPLOADS_URL, uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Whether `filename` has an accepted image extension.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Reduce a client-supplied filename to a safe ASCII basename.
///
/// Directory components are dropped, whitespace runs become `_`, anything
/// other than ASCII alphanumerics and `._-` is removed, and leading or
/// trailing dots and underscores are trimmed.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(['.', '_']).to_string()
}

type MediaReply = (StatusCode, Json<MediaResponse>);

fn reject(status: StatusCode) -> MediaReply {
    (status, Json(MediaResponse::error()))
}

/// Accept one uploaded image for a note.
async fn add_media(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<NoteId>,
    mut multipart: Multipart,
) -> MediaReply {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(data) => upload = Some((filename, data)),
                    Err(e) => {
                        warn!("Reading upload for note {} failed: {}", note_id, e);
                        return reject(e.status());
                    }
                }
                break;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed upload for note {}: {}", note_id, e);
                return reject(e.status());
            }
        }
    }

    let Some((filename, data)) = upload else {
        return reject(StatusCode::BAD_REQUEST);
    };
    if filename.is_empty() || !allowed_file(&filename) {
        warn!("Rejected upload {:?} for note {}", filename, note_id);
        return reject(StatusCode::BAD_REQUEST);
    }
    let safe = sanitize_filename(&filename);
    if safe.is_empty() {
        return reject(StatusCode::BAD_REQUEST);
    }

    let unique_name = format!("{}_{}", Uuid::new_v4().simple(), safe);
    let path = state.upload_dir.join(&unique_name);
    if let Err(e) = tokio::fs::create_dir_all(&state.upload_dir).await {
        warn!("Cannot create upload dir {}: {}", state.upload_dir.display(), e);
        return reject(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if let Err(e) = tokio::fs::write(&path, &data).await {
        warn!("Cannot write {}: {}", path.display(), e);
        return reject(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let item = MediaItem {
        id: Uuid::new_v4().to_string(),
        kind: MediaKind::Image,
        url: format!("{}/{}", UPLOADS_URL, unique_name),
    };
    state.attach(note_id, item.clone());
    info!("Note {} gained media {} ({} bytes)", note_id, item.url, data.len());

    (StatusCode::OK, Json(MediaResponse::success(Some(item))))
}

/// Detach a media item from a note. Unknown ids still succeed.
async fn delete_media(
    State(state): State<Arc<AppState>>,
    Path((note_id, media_id)): Path<(NoteId, String)>,
) -> Json<MediaResponse> {
    if state.detach(note_id, &media_id) {
        info!("Note {} lost media {}", note_id, media_id);
    }
    Json(MediaResponse::success(None))
}

async fn list_media(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<NoteId>,
) -> Json<Vec<MediaItem>> {
    Json(state.media_for(note_id))
}

/// Health check
async fn health() -> &'static str {
    "ok"
}
