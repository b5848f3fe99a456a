use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
#[schema(rename_all = "camelCase")]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Whether anyone may read the file, defaults to false
    #[schema(example = "true")]
    pub public_visible: Option<bool>,
    /// Company that owns the file; omitted for personal files
    pub company_guid: Option<Uuid>,
}

/// Result of a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResultDto {
    /// URL the file can be fetched from
    pub file_url: String,
    /// Number of bytes stored
    pub size: i64,
    pub success: bool,
    pub public_visible: bool,
}

/// Query for `GET /media`
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct GetMediaQuery {
    /// Stored filename, e.g. `3f0c8a4e-....png`
    pub image_name: Option<String>,
    /// Resize hint, currently ignored
    #[serde(default)]
    pub max_resolution_with: u32,
    /// Resize hint, currently ignored
    #[serde(default)]
    pub max_resolution_height: u32,
}

/// Query for `POST /media/stream`; the request body is the raw file content
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct StreamUploadQuery {
    /// Original filename, used for the stored extension
    #[validate(length(min = 1, max = 255, message = "fileName must be 1-255 characters"))]
    pub file_name: String,
    #[serde(default)]
    pub public_visible: bool,
    pub company_guid: Option<Uuid>,
}

/// Query for `DELETE /media`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct DeleteMediaQuery {
    /// File URL as returned by the upload, or a bare stored filename
    #[validate(length(min = 1, message = "fileUrl is required"))]
    pub file_url: String,
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteMediaResponseDto {
    /// Confirmation that the file was deleted
    pub deleted: bool,
}

/// Error body returned by `GET /media`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MediaErrorResponseDto {
    pub message: String,
    pub context: MediaErrorContextDto,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaErrorContextDto {
    pub image_name: Option<String>,
}
