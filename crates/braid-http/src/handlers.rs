//! File API request handlers.

use axum::Extension;
use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Query, State};
use axum::http::{Response, StatusCode, header};
use braid_types::{FileSummary, OwnerId};
use serde::Deserialize;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

/// Query parameters shared by retrieval and deletion.
#[derive(Deserialize)]
pub(crate) struct FileQuery {
    filename: String,
}

// -----------------------------------------------------------------------
// POST /file — upload
// -----------------------------------------------------------------------

/// Upload a file from the multipart form field `file`. The part's
/// filename becomes the stored name.
pub(crate) async fn upload_file(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    mut multipart: Multipart,
) -> Result<Response<Body>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file part has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file part: {e}")))?;

        state.engine.upload(owner, &filename, data).await?;
        info!(%owner, file = %filename, "file_uploaded");

        return Ok(text_response(
            StatusCode::OK,
            "File successfully encoded and stored",
        ));
    }

    Err(ApiError::BadRequest(
        "multipart form field `file` missing".to_string(),
    ))
}

// -----------------------------------------------------------------------
// GET /file?filename=<name> — retrieval
// -----------------------------------------------------------------------

/// Download the reconstructed file as an attachment.
pub(crate) async fn retrieve_file(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Query(query): Query<FileQuery>,
) -> Result<Response<Body>, ApiError> {
    let data = state.engine.retrieve(owner, &query.filename).await?;
    info!(%owner, file = %query.filename, size = data.len(), "file_retrieved");

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", query.filename),
        )
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .expect("static response"))
}

// -----------------------------------------------------------------------
// GET /file/list — listing
// -----------------------------------------------------------------------

/// List the caller's files with per-file shard availability.
pub(crate) async fn list_files(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<Vec<FileSummary>>, ApiError> {
    let listing = state.engine.list(owner).await?;
    Ok(Json(listing))
}

// -----------------------------------------------------------------------
// DELETE /file?filename=<name> — deletion
// -----------------------------------------------------------------------

/// Delete a file.
pub(crate) async fn delete_file(
    State(state): State<AppState>,
    Extension(owner): Extension<OwnerId>,
    Query(query): Query<FileQuery>,
) -> Result<Response<Body>, ApiError> {
    state.engine.delete(owner, &query.filename).await?;
    info!(%owner, file = %query.filename, "file_deleted");
    Ok(text_response(StatusCode::OK, "File deleted successfully"))
}

fn text_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(message.to_string()))
        .expect("static response")
}
