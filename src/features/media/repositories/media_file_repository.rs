use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::media::models::{MediaFile, NewMediaFile};

/// Metadata store for media file records.
///
/// Every operation touches a single row and is expected to be atomic.
#[async_trait]
pub trait MediaFileRepository: Send + Sync {
    async fn insert(&self, file: NewMediaFile) -> Result<MediaFile>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaFile>>;

    async fn update_size(&self, id: Uuid, file_size: i64) -> Result<()>;

    /// Returns `false` when no row matched
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Postgres-backed repository over the `media_files` table
pub struct PgMediaFileRepository {
    pool: PgPool,
}

impl PgMediaFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaFileRepository for PgMediaFileRepository {
    async fn insert(&self, file: NewMediaFile) -> Result<MediaFile> {
        let record = sqlx::query_as::<_, MediaFile>(
            r#"
            INSERT INTO media_files (
                id, company_id, created_by, original_file_name, file_name, file_path,
                file_size, file_extension, public_visible, is_active, media_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, '')
            RETURNING *
            "#,
        )
        .bind(file.id)
        .bind(file.company_id)
        .bind(file.created_by)
        .bind(&file.original_file_name)
        .bind(&file.file_name)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(&file.file_extension)
        .bind(file.public_visible)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaFile>> {
        let record = sqlx::query_as::<_, MediaFile>("SELECT * FROM media_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn update_size(&self, id: Uuid, file_size: i64) -> Result<()> {
        sqlx::query("UPDATE media_files SET file_size = $2 WHERE id = $1")
            .bind(id)
            .bind(file_size)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
