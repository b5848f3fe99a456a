use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::media::{dtos as media_dtos, handlers as media_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        media_handlers::upload_file,
        media_handlers::upload_stream,
        media_handlers::get_media,
        media_handlers::delete_media,
    ),
    components(
        schemas(
            Meta,
            media_dtos::UploadFileDto,
            media_dtos::UploadFileResultDto,
            media_dtos::DeleteMediaResponseDto,
            media_dtos::MediaErrorResponseDto,
            media_dtos::MediaErrorContextDto,
            ApiResponse<media_dtos::DeleteMediaResponseDto>,
        )
    ),
    tags(
        (name = "media", description = "Media upload, retrieval and deletion"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Mediastore API",
        version = "0.1.0",
        description = "API documentation for Mediastore",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
