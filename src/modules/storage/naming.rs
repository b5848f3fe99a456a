//! Stored filenames are `{file_id}.{extension}`; the id doubles as the
//! metadata key, so a resource name or file URL is enough to find the record.

use uuid::Uuid;

use crate::shared::constants::{DEFAULT_FILE_EXTENSION, IMAGE_NAME_PARAM};

/// Lower-cased extension of `file_name`, `bin` when absent or unusable
pub fn file_extension(file_name: &str) -> String {
    let Some((_, ext)) = file_name.rsplit_once('.') else {
        return DEFAULT_FILE_EXTENSION.to_string();
    };

    let ext = ext.trim();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return DEFAULT_FILE_EXTENSION.to_string();
    }

    ext.to_ascii_lowercase()
}

pub fn stored_file_name(file_id: Uuid, extension: &str) -> String {
    format!("{}.{}", file_id, extension)
}

/// File id from a resource name such as `3f0c...e1.png` (text before the first `.`)
pub fn parse_resource_id(resource_name: &str) -> Option<Uuid> {
    let id = resource_name.split('.').next().unwrap_or(resource_name);
    Uuid::parse_str(id.trim()).ok()
}

/// File id from a full file URL (`.../media?imageName={file_name}`) or a bare
/// resource name
pub fn resource_id_from_url(url: &str) -> Option<Uuid> {
    let marker = format!("{}=", IMAGE_NAME_PARAM);
    let resource_name = match url.split_once(marker.as_str()) {
        Some((_, rest)) => rest.split('&').next().unwrap_or(rest),
        None => url.rsplit('/').next().unwrap_or(url),
    };

    parse_resource_id(resource_name)
}
