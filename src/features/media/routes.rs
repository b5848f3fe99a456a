use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::middleware::optional_auth_middleware;
use crate::features::auth::JwtValidator;
use crate::features::media::handlers::{delete_media, get_media, upload_file, upload_stream};
use crate::features::media::services::MediaService;
use crate::shared::constants::MEDIA_ROUTE;

/// Create routes for the media feature
///
/// Every route accepts anonymous callers; a bearer token, when sent, must be
/// valid. Handlers decide whether an identity is required.
pub fn routes(media_service: Arc<MediaService>, jwt_validator: Arc<JwtValidator>) -> Router {
    media_router(media_service).route_layer(from_fn_with_state(
        jwt_validator,
        optional_auth_middleware,
    ))
}

pub(crate) fn media_router(media_service: Arc<MediaService>) -> Router {
    // Allow body size up to the upload limit + buffer for multipart overhead
    let upload_limit = media_service.max_upload_size() + 1024 * 1024;

    Router::new()
        .route(
            MEDIA_ROUTE,
            get(get_media)
                .post(upload_file)
                .layer(DefaultBodyLimit::max(upload_limit))
                .delete(delete_media),
        )
        .route(
            &format!("{}/stream", MEDIA_ROUTE),
            // Size is enforced while the body is copied to disk
            post(upload_stream).layer(DefaultBodyLimit::disable()),
        )
        .with_state(media_service)
}
