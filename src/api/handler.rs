//! JSON API handlers.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::types::{
    CreateFolderRequest, MoveRequest, NameRequest, SearchHit, SearchResponse, SuggestionQuery,
    UploadQuery,
};
use crate::config::UploadPolicy;
use crate::error::{AppError, Result};
use crate::search::{get_search_suggestions, highlight_text, SearchEngine, SearchFilters};
use crate::store::DataRoomStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DataRoomStore>,
    pub engine: SearchEngine,
    pub upload_policy: UploadPolicy,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Data rooms
        .route("/rooms", get(list_data_rooms).post(create_data_room))
        .route(
            "/rooms/:id",
            get(get_data_room)
                .patch(rename_data_room)
                .delete(delete_data_room),
        )
        .route("/rooms/:id/tree", get(get_data_room_tree))
        .route("/rooms/:id/search", post(search_data_room))
        .route("/rooms/:id/suggestions", get(get_suggestions))
        // Folders
        .route("/folders", get(list_folders).post(create_folder))
        .route(
            "/folders/:id",
            get(get_folder).patch(rename_folder).delete(delete_folder),
        )
        .route("/folders/:id/move", post(move_folder))
        .route("/folders/:id/files", get(list_folder_files).post(upload_file))
        // Files
        .route(
            "/files/:id",
            get(download_file).patch(rename_file).delete(delete_file),
        )
        .route("/files/:id/metadata", get(get_file_metadata))
        .route("/files/:id/move", post(move_file))
        // Search history
        .route("/history", get(get_history).delete(clear_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn require_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be empty".to_string()));
    }
    Ok(name)
}

// ============================================================================
// Data Rooms
// ============================================================================

/// GET /rooms - List data rooms.
async fn list_data_rooms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.get_all_data_rooms())
}

/// POST /rooms - Create a data room.
async fn create_data_room(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NameRequest>,
) -> Result<impl IntoResponse> {
    let name = require_name(&request.name)?;
    let room = state.store.create_data_room(name).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// GET /rooms/{id} - Get one data room.
async fn get_data_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .store
        .get_data_room(&id)
        .ok_or_else(|| AppError::NotFound(format!("data room {}", id)))?;
    Ok(Json(room))
}

/// PATCH /rooms/{id} - Rename a data room.
async fn rename_data_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<NameRequest>,
) -> Result<impl IntoResponse> {
    let name = require_name(&request.name)?;
    let room = state
        .store
        .update_data_room_name(&id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("data room {}", id)))?;
    Ok(Json(room))
}

/// DELETE /rooms/{id} - Delete a data room and its whole tree.
async fn delete_data_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .store
        .delete_data_room(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("data room {}", id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /rooms/{id}/tree - Fully expanded folder tree of a data room.
async fn get_data_room_tree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let room = state
        .store
        .get_data_room(&id)
        .ok_or_else(|| AppError::NotFound(format!("data room {}", id)))?;
    let tree = state
        .store
        .get_folder_structure(&room.root_folder_id)
        .ok_or_else(|| AppError::NotFound(format!("root folder of {}", id)))?;
    Ok(Json(tree))
}

/// POST /rooms/{id}/search - Search names and PDF content of a data room.
async fn search_data_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(filters): Json<SearchFilters>,
) -> Result<impl IntoResponse> {
    let snapshot = state
        .store
        .room_snapshot(&id)
        .ok_or_else(|| AppError::NotFound(format!("data room {}", id)))?;

    let results = state.engine.perform_search(&filters, &snapshot).await;
    if let Err(e) = state.store.save_search_term(filters.query.trim()).await {
        tracing::warn!("Failed to save search term: {}", e);
    }

    let hits = results
        .into_iter()
        .map(|result| SearchHit {
            highlighted_name: highlight_text(&result.file_name, &filters.query),
            highlighted_text: result
                .matched_text
                .as_deref()
                .map(|text| highlight_text(text, &filters.query)),
            result,
        })
        .collect();

    Ok(Json(SearchResponse {
        query: filters.query,
        results: hits,
    }))
}

/// GET /rooms/{id}/suggestions?q= - Autocomplete from history and file names.
async fn get_suggestions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<SuggestionQuery>,
) -> Result<impl IntoResponse> {
    if state.store.get_data_room(&id).is_none() {
        return Err(AppError::NotFound(format!("data room {}", id)));
    }

    let file_names: Vec<String> = state
        .store
        .get_files_from_data_room(&id)
        .into_iter()
        .map(|file| file.record.name)
        .collect();
    let history = state.store.get_search_history();

    Ok(Json(get_search_suggestions(&query.q, &history, &file_names)))
}

// ============================================================================
// Folders
// ============================================================================

/// GET /folders - List all folders (shallow).
async fn list_folders(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.get_all_folders())
}

/// POST /folders - Create a folder.
async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse> {
    let name = require_name(&request.name)?;
    if state.store.get_folder(&request.parent_folder_id).is_none() {
        return Err(AppError::NotFound(format!(
            "folder {}",
            request.parent_folder_id
        )));
    }

    let folder = state
        .store
        .create_folder(&request.parent_folder_id, name)
        .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// GET /folders/{id} - Fully expanded folder.
async fn get_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let tree = state
        .store
        .get_folder_structure(&id)
        .ok_or_else(|| AppError::NotFound(format!("folder {}", id)))?;
    Ok(Json(tree))
}

/// PATCH /folders/{id} - Rename a folder.
async fn rename_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<NameRequest>,
) -> Result<impl IntoResponse> {
    let name = require_name(&request.name)?;
    let folder = state
        .store
        .update_folder_name(&id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("folder {}", id)))?;
    Ok(Json(folder))
}

/// DELETE /folders/{id} - Delete a folder with everything below it.
async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let folder = state
        .store
        .get_folder(&id)
        .ok_or_else(|| AppError::NotFound(format!("folder {}", id)))?;
    if folder.is_root() {
        return Err(AppError::BadRequest(
            "Root folders are deleted with their data room".to_string(),
        ));
    }

    let deleted = state
        .store
        .delete_folder_recursive(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("folder {}", id)))?;
    Ok(Json(deleted))
}

/// POST /folders/{id}/move - Move a folder under another folder.
async fn move_folder(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<impl IntoResponse> {
    let folder = state
        .store
        .move_folder(&id, &request.new_parent_folder_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "folder {} or {}",
                id, request.new_parent_folder_id
            ))
        })?;
    Ok(Json(folder))
}

/// GET /folders/{id}/files - Names of the files directly in a folder.
async fn list_folder_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    if state.store.get_folder(&id).is_none() {
        return Err(AppError::NotFound(format!("folder {}", id)));
    }
    Ok(Json(state.store.get_files_in_folder(&id)))
}

/// POST /folders/{id}/files?name=&type= - Upload a file from the raw body.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Body,
) -> Result<impl IntoResponse> {
    let name = require_name(&query.name)?;
    let mime_type = query.mime_type.as_deref().unwrap_or("application/octet-stream");
    if state.store.get_folder(&id).is_none() {
        return Err(AppError::NotFound(format!("folder {}", id)));
    }

    // Read one byte past the limit so oversized bodies reach the policy check.
    let limit = usize::try_from(state.upload_policy.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(1);
    let data = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    state
        .upload_policy
        .check(name, mime_type, data.len() as u64)?;

    let unique_name = state.store.unique_file_name(&id, name);
    tracing::info!("Uploading {} into folder {} ({} bytes)", unique_name, id, data.len());

    let file = state
        .store
        .upload_file(&id, &unique_name, data, mime_type)
        .await?;
    Ok((StatusCode::CREATED, Json(file.record)))
}

// ============================================================================
// Files
// ============================================================================

/// GET /files/{id} - Download the file payload.
async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let file = state
        .store
        .get_file(&id)
        .ok_or_else(|| AppError::NotFound(format!("file {}", id)))?;
    let data = file.data.unwrap_or_else(Bytes::new);

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, file.record.mime_type)],
        data,
    ))
}

/// GET /files/{id}/metadata - File record without payload.
async fn get_file_metadata(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let file = state
        .store
        .get_file(&id)
        .ok_or_else(|| AppError::NotFound(format!("file {}", id)))?;
    Ok(Json(file.record))
}

/// PATCH /files/{id} - Rename a file.
async fn rename_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<NameRequest>,
) -> Result<impl IntoResponse> {
    let name = require_name(&request.name)?;
    let record = state
        .store
        .update_file_name(&id, name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("file {}", id)))?;
    Ok(Json(record))
}

/// DELETE /files/{id} - Delete a file.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::info!("Deleting file {}", id);
    state
        .store
        .delete_file(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("file {}", id)))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /files/{id}/move - Move a file into another folder.
async fn move_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<MoveRequest>,
) -> Result<impl IntoResponse> {
    let record = state
        .store
        .move_file(&id, &request.new_parent_folder_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "file {} or folder {}",
                id, request.new_parent_folder_id
            ))
        })?;
    Ok(Json(record))
}

// ============================================================================
// Search History
// ============================================================================

/// GET /history - Recent search terms, newest first.
async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.get_search_history())
}

/// DELETE /history - Forget all recent search terms.
async fn clear_history(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    state.store.clear_search_history().await?;
    Ok(StatusCode::NO_CONTENT)
}
