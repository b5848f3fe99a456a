use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::path::PathBuf;
use uuid::Uuid;

use crate::modules::storage::OwnerScope;

/// Database model for stored media files
#[derive(Debug, Clone, FromRow)]
pub struct MediaFile {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub original_file_name: String,
    /// `{id}.{file_extension}`
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_extension: String,
    pub public_visible: bool,
    pub is_active: bool,
    pub media_type: String,
    pub created_at: DateTime<Utc>,
}

impl MediaFile {
    /// Owner the file's folder belongs to; `None` only for anonymous
    /// uploads that had no company either, which the path builder rejects.
    pub fn owner(&self) -> Option<OwnerScope> {
        match (self.company_id, self.created_by) {
            (Some(company_id), _) => Some(OwnerScope::Company(company_id)),
            (None, Some(user_id)) => Some(OwnerScope::Individual(user_id)),
            (None, None) => None,
        }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file_path)
    }
}

/// Data for creating a new media file record
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub original_file_name: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_extension: String,
    pub public_visible: bool,
}
