use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    records::{NewWork, UploadedFile, WorkRecord},
    spotify::SpotifyError,
    state::AppState,
    storage::{MAX_UPLOAD_SIZE, UPLOADS_URL_PREFIX},
};

const DEFAULT_MIME: &str = "application/octet-stream";

#[derive(Deserialize)]
pub struct WorksQuery {
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub work: WorkRecord,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is running" }))
}

pub async fn list_works(
    State(state): State<AppState>,
    Query(query): Query<WorksQuery>,
) -> ApiResult<Json<Vec<WorkRecord>>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let works = state.catalog.list_works(category).await?;
    Ok(Json(works))
}

pub async fn upload_work(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    info!("Received upload request");

    let mut fields = NewWork::default();
    let mut upload: Option<UploadedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or_default().to_string();
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .or_else(|| mime_guess::from_path(&original_name).first_raw().map(str::to_string))
                    .unwrap_or_else(|| DEFAULT_MIME.to_string());

                let mut content = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(multipart_error)?
                {
                    if content.len() + chunk.len() > MAX_UPLOAD_SIZE {
                        return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_SIZE));
                    }
                    content.extend_from_slice(&chunk);
                }

                upload = Some(UploadedFile {
                    content,
                    original_name,
                    mime_type,
                });
            }
            "title" | "category" | "description" => {
                let value = field
                    .text()
                    .await
                    .map_err(multipart_error)?;
                match name.as_str() {
                    "title" => fields.title = value,
                    "category" => fields.category = value,
                    _ => fields.description = value,
                }
            }
            _ => {}
        }
    }

    let Some(upload) = upload else {
        error!("No file in request");
        return Err(ApiError::BadRequest("No file uploaded.".to_string()));
    };

    let work = state.catalog.create_work(fields, upload).await?;
    Ok(Json(UploadResponse {
        message: "Upload successful!",
        work,
    }))
}

pub async fn delete_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.catalog.delete_work(&id).await?;
    Ok(Json(MessageResponse {
        message: "Work deleted successfully",
    }))
}

/// Pass-through of the currently-playing payload.
pub async fn spotify_currently_playing(State(state): State<AppState>) -> Response {
    let Some(spotify) = state.spotify.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Spotify credentials not configured. Please check your .env file."
            })),
        )
            .into_response();
    };

    let token = match spotify.access_token().await {
        Ok(token) => token,
        Err(err @ SpotifyError::TokenRefresh { .. }) => {
            error!("Token refresh error: {}", err);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Failed to refresh access token. Please check your refresh token."
                })),
            )
                .into_response();
        }
        Err(err) => return internal_error(err),
    };

    match spotify.currently_playing_raw(&token).await {
        Ok(Some(data)) => Json(data).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(SpotifyError::Api { status, details }) => {
            error!("Spotify API error ({}): {}", status, details);
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(json!({
                    "error": "Failed to fetch currently playing track",
                    "details": details,
                })),
            )
                .into_response()
        }
        Err(err) => internal_error(err),
    }
}

fn internal_error(err: SpotifyError) -> Response {
    error!("Error in /api/spotify: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error", "message": err.to_string() })),
    )
        .into_response()
}

/// Shaped now-playing answer with a recently-played fallback.
pub async fn spotify_now_playing(State(state): State<AppState>) -> Response {
    let result = match state.spotify.as_ref() {
        Some(spotify) => spotify.now_playing().await.map_err(|e| e.to_string()),
        None => Err("Spotify credentials not configured".to_string()),
    };

    match result {
        Ok(now_playing) => Json(now_playing).into_response(),
        Err(err) => {
            error!("Error in /api/spotify/now-playing: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch Spotify data" })),
            )
                .into_response()
        }
    }
}

pub async fn serve_upload(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path().strip_prefix(UPLOADS_URL_PREFIX).unwrap_or_default();
    state.uploads.serve(path).await
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(MAX_UPLOAD_SIZE)
    } else {
        ApiError::BadRequest(err.to_string())
    }
}

pub async fn serve_site(State(state): State<AppState>, uri: Uri) -> Response {
    state.site.serve(uri.path()).await
}
