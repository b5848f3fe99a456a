use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::media::models::{MediaFile, NewMediaFile};

use super::MediaFileRepository;

/// In-process repository used by tests
#[derive(Default)]
pub struct InMemoryMediaFileRepository {
    files: RwLock<HashMap<Uuid, MediaFile>>,
}

impl InMemoryMediaFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a record in place as-is, e.g. an inactive or ownerless one
    pub async fn seed(&self, file: MediaFile) {
        self.files.write().await.insert(file.id, file);
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl MediaFileRepository for InMemoryMediaFileRepository {
    async fn insert(&self, file: NewMediaFile) -> Result<MediaFile> {
        let mut files = self.files.write().await;
        if files.contains_key(&file.id) {
            return Err(AppError::Conflict(format!("Media file {} already exists", file.id)));
        }

        let record = MediaFile {
            id: file.id,
            company_id: file.company_id,
            created_by: file.created_by,
            original_file_name: file.original_file_name,
            file_name: file.file_name,
            file_path: file.file_path,
            file_size: file.file_size,
            file_extension: file.file_extension,
            public_visible: file.public_visible,
            is_active: true,
            media_type: String::new(),
            created_at: Utc::now(),
        };
        files.insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaFile>> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn update_size(&self, id: Uuid, file_size: i64) -> Result<()> {
        if let Some(file) = self.files.write().await.get_mut(&id) {
            file.file_size = file_size;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.files.write().await.remove(&id).is_some())
    }
}
