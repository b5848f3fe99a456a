use axum::{
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppQuery;
use crate::features::auth::AuthenticatedUser;
use crate::features::media::dtos::{
    DeleteMediaQuery, DeleteMediaResponseDto, GetMediaQuery, MediaErrorContextDto,
    MediaErrorResponseDto, StreamUploadQuery, UploadFileDto, UploadFileResultDto,
};
use crate::features::media::services::{FileUpload, MediaService};
use crate::shared::types::ApiResponse;

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `publicVisible`: "true" to make the file readable by anyone (optional, defaults to false)
/// - `companyGuid`: Company that owns the file (optional, personal file when omitted)
#[utoipa::path(
    post,
    path = "/media",
    tag = "media",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional publicVisible and companyGuid fields",
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadFileResultDto),
        (status = 400, description = "Missing or empty file"),
        (status = 401, description = "Personal upload without authentication"),
        (status = 409, description = "File already exists"),
        (status = 413, description = "File too large")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<MediaService>>,
    mut multipart: Multipart,
) -> Result<Json<UploadFileResultDto>, AppError> {
    let mut upload: Option<FileUpload> = None;
    let mut public_visible = false;
    let mut company_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let original_file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                upload = Some(FileUpload {
                    original_file_name,
                    data,
                });
            }
            "publicVisible" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read publicVisible field: {}", e))
                })?;
                public_visible = text.trim().eq_ignore_ascii_case("true");
            }
            "companyGuid" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read companyGuid field: {}", e))
                })?;
                let text = text.trim();
                if !text.is_empty() {
                    company_id = Some(Uuid::parse_str(text).map_err(|_| {
                        AppError::BadRequest(format!("Invalid companyGuid: {}", text))
                    })?);
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("File is not selected".to_string()))?;

    let result = service
        .upload_file(user.as_ref(), upload, public_visible, company_id)
        .await?;

    Ok(Json(result))
}

/// Upload a file from the raw request body
///
/// The body is written to disk as it arrives. If the client goes away before
/// the body is complete the partial upload is removed.
#[utoipa::path(
    post,
    path = "/media/stream",
    tag = "media",
    params(StreamUploadQuery),
    request_body(
        content = String,
        content_type = "application/octet-stream",
        description = "Raw file content",
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadFileResultDto),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Personal upload without authentication"),
        (status = 409, description = "File already exists"),
        (status = 413, description = "Body larger than the upload limit"),
        (status = 499, description = "Upload cancelled by the client")
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn upload_stream(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<MediaService>>,
    AppQuery(query): AppQuery<StreamUploadQuery>,
    body: Body,
) -> Result<Json<UploadFileResultDto>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // Dropping this future (client disconnect) cancels the upload task
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let task = tokio::spawn(async move {
        let mut reader = StreamReader::new(body.into_data_stream().map_err(io::Error::other));
        service
            .save_from_stream(
                user.as_ref(),
                query.company_guid,
                &mut reader,
                &query.file_name,
                cancel,
                query.public_visible,
            )
            .await
    });

    let result = task.await.map_err(|e| {
        error!("Stream upload task failed: {}", e);
        AppError::Internal(format!("Stream upload task failed: {}", e))
    });
    guard.disarm();

    Ok(Json(result??))
}

/// Get a stored file
///
/// Returns the file bytes when the caller may read the file. Public files
/// need no authentication.
#[utoipa::path(
    get,
    path = "/media",
    tag = "media",
    params(GetMediaQuery),
    responses(
        (status = 200, description = "File content, Content-Type guessed from the extension"),
        (status = 400, description = "Access could not be resolved", body = MediaErrorResponseDto),
        (status = 401, description = "Authentication required", body = MediaErrorResponseDto),
        (status = 403, description = "Not allowed to read this file", body = MediaErrorResponseDto),
        (status = 404, description = "File not found", body = MediaErrorResponseDto)
    ),
    security(
        (),
        ("bearer_auth" = [])
    )
)]
pub async fn get_media(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<MediaService>>,
    AppQuery(query): AppQuery<GetMediaQuery>,
) -> Response {
    if query.max_resolution_with > 0 || query.max_resolution_height > 0 {
        debug!(
            "Ignoring resize hint {}x{}",
            query.max_resolution_with, query.max_resolution_height
        );
    }

    match open_media(&service, user.as_ref(), query.image_name.as_deref()).await {
        Ok(response) => response,
        Err(e) => media_error(e, query.image_name),
    }
}

async fn open_media(
    service: &MediaService,
    user: Option<&AuthenticatedUser>,
    image_name: Option<&str>,
) -> Result<Response, AppError> {
    let expected_format = image_name.and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext));
    let path = service
        .resolve_file_path(user, image_name, expected_format)
        .await?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            error!("Media file record points to missing file {}", path.display());
            AppError::NotFound("File not exists".to_string())
        }
        _ => AppError::Storage(e),
    })?;

    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Ok((
        [(header::CONTENT_TYPE, content_type.to_string())],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

fn media_error(err: AppError, image_name: Option<String>) -> Response {
    let status = err.status_code();
    let body = MediaErrorResponseDto {
        message: err.public_message(),
        context: MediaErrorContextDto { image_name },
    };

    (status, Json(body)).into_response()
}

/// Delete a stored file
///
/// Operators may delete any file, company files need company write access
/// and personal files may only be deleted by their creator.
#[utoipa::path(
    delete,
    path = "/media",
    tag = "media",
    params(DeleteMediaQuery),
    responses(
        (status = 200, description = "File deleted successfully", body = ApiResponse<DeleteMediaResponseDto>),
        (status = 400, description = "Missing fileUrl"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not authorized to delete this file"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_media(
    user: AuthenticatedUser,
    State(service): State<Arc<MediaService>>,
    AppQuery(query): AppQuery<DeleteMediaQuery>,
) -> Result<Json<ApiResponse<DeleteMediaResponseDto>>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    service.delete_file(Some(&user), &query.file_url, false).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteMediaResponseDto { deleted: true }),
        Some("File deleted successfully".to_string()),
        None,
    )))
}
