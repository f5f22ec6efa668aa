//! Handler for `POST /uploads`: forwards a file to the media store.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use servicedesk_core::chat::attachment_type_for_mime;

use crate::error::{AppError, AppResult};
use crate::media::MediaError;
use crate::middleware::rbac::RequireApproved;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response of a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    /// `image`, `video` or `document`.
    pub attachment_type: &'static str,
}

/// POST /api/v1/uploads
///
/// Accepts a multipart form with a required `file` field. The file is read
/// in chunks and rejected as soon as it exceeds the configured limit.
pub async fn upload_file(
    RequireApproved(auth): RequireApproved,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    if !state.media.is_configured() {
        return Err(AppError::BadRequest(MediaError::NotConfigured.to_string()));
    }
    let max_bytes = state.media.max_upload_bytes();

    let mut file: Option<(String, String, Vec<u8>)> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue; // ignore unknown fields
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            if data.len() + chunk.len() > max_bytes {
                return Err(AppError::BadRequest(format!(
                    "File exceeds the {max_bytes} byte upload limit"
                )));
            }
            data.extend_from_slice(&chunk);
        }
        file = Some((file_name, content_type, data));
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    let size = data.len();
    let url = state
        .media
        .upload(file_name, &content_type, data)
        .await
        .map_err(|e| match e {
            MediaError::NotConfigured => AppError::BadRequest(e.to_string()),
            other => AppError::InternalError(format!("Media upload failed: {other}")),
        })?;

    let attachment_type = attachment_type_for_mime(&content_type);
    tracing::info!(user_id = auth.user_id, size, attachment_type, "File uploaded");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResponse {
                url,
                attachment_type,
            },
        }),
    ))
}
