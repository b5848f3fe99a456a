/// Platform operator role - read access to every stored file
pub const ROLE_PLATFORM_OPERATOR: &str = "platform_operator";

// =============================================================================
// MEDIA STORAGE
// =============================================================================

/// Subfolder holding publicly visible files inside an owner folder
pub const PUBLIC_FOLDER_NAME: &str = "public";

/// Extension used when the original filename has none (or an unusable one)
pub const DEFAULT_FILE_EXTENSION: &str = "bin";

/// Buffer size for streamed uploads
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Route serving stored files; also the prefix of generated file URLs
pub const MEDIA_ROUTE: &str = "/media";

/// Query parameter carrying the stored filename on `GET /media`
pub const IMAGE_NAME_PARAM: &str = "imageName";
