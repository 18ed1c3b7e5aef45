use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use mynotes_core::models::{
    DeleteAck, Folder, FolderDraft, FolderId, FolderPatch, Note, NoteDraft, NoteId, NotePatch,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::AppError;
use crate::store::NotesStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    store: Arc<Mutex<NotesStore>>,
}

impl AppState {
    pub fn from_config(config: Arc<ApiConfig>) -> Self {
        let store = if config.seed_default_folders {
            NotesStore::with_default_folders()
        } else {
            NotesStore::default()
        };
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/folders", get(list_folders).post(create_folder))
        .route(
            "/folders/{id}",
            get(get_folder).put(update_folder).delete(delete_folder),
        )
        .route("/notes", get(list_notes).post(create_note))
        .route("/notes/sync", post(sync_notes))
        .route(
            "/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "MyNotes API is running",
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

async fn list_folders(State(state): State<AppState>) -> Json<Vec<Folder>> {
    Json(state.store.lock().await.list_folders())
}

async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Folder>, AppError> {
    Ok(Json(state.store.lock().await.get_folder(FolderId(id))?))
}

async fn create_folder(
    State(state): State<AppState>,
    Json(draft): Json<FolderDraft>,
) -> Result<Json<Folder>, AppError> {
    Ok(Json(state.store.lock().await.create_folder(&draft)?))
}

async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<FolderPatch>,
) -> Result<Json<Folder>, AppError> {
    Ok(Json(
        state.store.lock().await.update_folder(FolderId(id), &patch)?,
    ))
}

async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteAck>, AppError> {
    state.store.lock().await.delete_folder(FolderId(id))?;
    Ok(Json(DeleteAck::folder_deleted()))
}

#[derive(Debug, Deserialize)]
struct NotesQuery {
    folder_id: Option<i64>,
}

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<NotesQuery>,
) -> Json<Vec<Note>> {
    Json(
        state
            .store
            .lock()
            .await
            .list_notes(query.folder_id.map(FolderId)),
    )
}

async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.store.lock().await.get_note(NoteId(id))?))
}

async fn create_note(
    State(state): State<AppState>,
    Json(draft): Json<NoteDraft>,
) -> Json<Note> {
    Json(state.store.lock().await.create_note(&draft))
}

async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<NotePatch>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(state.store.lock().await.update_note(NoteId(id), &patch)?))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteAck>, AppError> {
    state.store.lock().await.delete_note(NoteId(id))?;
    Ok(Json(DeleteAck::note_deleted()))
}

async fn sync_notes(
    State(state): State<AppState>,
    Json(drafts): Json<Vec<NoteDraft>>,
) -> Json<Vec<Note>> {
    let synced = state.store.lock().await.sync_notes(&drafts);
    tracing::info!("Synced {} note(s) in bulk", synced.len());
    Json(synced)
}
