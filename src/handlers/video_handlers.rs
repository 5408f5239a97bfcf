//! HTTP handlers for `/api/v1/videos`.
//! Request parsing and response shaping only; the workflows live in
//! `VideoService`.

use crate::{
    errors::AppError,
    models::video::{CreatedVideo, VideoRecord, VideoSummary},
    services::video_service::{IngestRequest, VideoError, VideoService},
};
use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State, multipart::MultipartError, rejection::JsonRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Descriptive fields may arrive as query parameters instead of form fields.
#[derive(Debug, Default, Deserialize)]
pub struct CreateVideoQuery {
    #[serde(rename = "nombreVideo", alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "anomalia", alias = "flagged")]
    pub flagged: Option<String>,
}

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

/// `GET /api/v1/videos`
pub async fn list_videos(
    State(service): State<VideoService>,
) -> Result<Json<Vec<VideoSummary>>, AppError> {
    Ok(Json(service.list().await?))
}

/// `POST /api/v1/videos`: multipart with `file`, `nombreVideo`, `anomalia`.
pub async fn create_video(
    State(service): State<VideoService>,
    Query(query): Query<CreateVideoQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatedVideo>), AppError> {
    let mut display_name = query.display_name;
    let mut flagged = query.flagged;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "nombreVideo" | "displayName" => {
                display_name = Some(field.text().await.map_err(multipart_error)?);
            }
            "anomalia" | "flagged" => {
                flagged = Some(field.text().await.map_err(multipart_error)?);
            }
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let content = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    content,
                });
            }
            other => tracing::debug!(field = %other, "ignoring unexpected multipart field"),
        }
    }

    let file = file.ok_or_else(|| invalid("the `file` part is required"))?;
    let display_name = display_name.ok_or_else(|| invalid("nombreVideo is required"))?;
    let flagged = flagged.ok_or_else(|| invalid("anomalia is required"))?;
    let flagged = parse_flag(&flagged)
        .ok_or_else(|| invalid(format!("anomalia must be a boolean, got `{}`", flagged)))?;

    let created = service
        .ingest(IngestRequest {
            display_name,
            flagged,
            filename: file.filename,
            content_type: file.content_type,
            content: file.content,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/v1/videos/{id}`
pub async fn get_video(
    State(service): State<VideoService>,
    Path(id): Path<String>,
) -> Result<Json<VideoRecord>, AppError> {
    Ok(Json(service.get(&id).await?))
}

/// `PUT /api/v1/videos/{id}`. Protected fields in the body are ignored.
pub async fn update_video(
    State(service): State<VideoService>,
    Path(id): Path<String>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|rejection| invalid(rejection.body_text()))?;
    service.update(&id, body).await?;
    Ok(Json(json!({ "mensaje": "Video actualizado correctamente" })))
}

/// `DELETE /api/v1/videos/{id}` removes the binary, then the record.
pub async fn delete_video(
    State(service): State<VideoService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.delete(&id).await?;
    Ok(Json(json!({ "message": "Video eliminado correctamente" })))
}

/// `POST /api/v1/videos/prueba-s3`: object store connectivity check.
pub async fn probe_storage(
    State(service): State<VideoService>,
) -> Result<impl IntoResponse, AppError> {
    service.probe_storage().await?;
    Ok(Json(json!({
        "status": "success",
        "message": format!("Conexión al bucket {} exitosa", service.bucket()),
    })))
}

fn invalid(msg: impl Into<String>) -> AppError {
    VideoError::InvalidRequest(msg.into()).into()
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

/// Accepts the usual spellings of a boolean form value.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        for raw in ["true", "TRUE", " 1 ", "yes", "on"] {
            assert_eq!(parse_flag(raw), Some(true), "{raw}");
        }
        for raw in ["false", "0", "No", "off"] {
            assert_eq!(parse_flag(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }
}
