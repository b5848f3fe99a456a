use axum::body::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::config::MediaConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::{AuthenticatedUser, CompanyOperation};
use crate::features::media::dtos::UploadFileResultDto;
use crate::features::media::models::{MediaFile, NewMediaFile};
use crate::features::media::repositories::MediaFileRepository;
use crate::modules::storage::{
    build_target_folder, copy_stream, create_new_file, file_extension, parse_resource_id,
    remove_file_if_exists, resource_id_from_url, stored_file_name, write_payload, OwnerScope,
};
use crate::shared::constants::{IMAGE_NAME_PARAM, MEDIA_ROUTE};

use super::access::{decide_access, AccessDecision, Denial};

/// A file received in one piece, e.g. a multipart field
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub original_file_name: String,
    pub data: Bytes,
}

/// Service for media upload, retrieval and deletion
pub struct MediaService {
    repository: Arc<dyn MediaFileRepository>,
    config: MediaConfig,
}

impl MediaService {
    pub fn new(repository: Arc<dyn MediaFileRepository>, config: MediaConfig) -> Self {
        Self { repository, config }
    }

    pub fn max_upload_size(&self) -> usize {
        self.config.max_upload_size
    }

    /// Store a file whose full content is already in memory.
    ///
    /// The metadata row is written first; if the physical write fails the row
    /// and any partial file are removed again before the error is returned.
    pub async fn upload_file(
        &self,
        caller: Option<&AuthenticatedUser>,
        upload: FileUpload,
        public_visible: bool,
        company_id: Option<Uuid>,
    ) -> Result<UploadFileResultDto> {
        self.store_payload(Uuid::new_v4(), caller, upload, public_visible, company_id)
            .await
    }

    /// Store a file of unknown length from `reader`.
    ///
    /// The recorded size starts at 0 and is updated once the stream is drained.
    /// Cancelling `cancel` stops the copy and rolls the upload back.
    pub async fn save_from_stream<R>(
        &self,
        caller: Option<&AuthenticatedUser>,
        company_id: Option<Uuid>,
        reader: &mut R,
        original_file_name: &str,
        cancel: CancellationToken,
        public_visible: bool,
    ) -> Result<UploadFileResultDto>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        self.store_stream(
            Uuid::new_v4(),
            caller,
            company_id,
            reader,
            original_file_name,
            &cancel,
            public_visible,
        )
        .await
    }

    /// Map a resource name (`{id}.{ext}`) to the stored file path if the
    /// caller may read it.
    pub async fn resolve_file_path(
        &self,
        caller: Option<&AuthenticatedUser>,
        resource_name: Option<&str>,
        expected_format: Option<&str>,
    ) -> Result<PathBuf> {
        let resource_name = resource_name.unwrap_or_default();
        let file = match parse_resource_id(resource_name) {
            Some(id) => self.repository.find_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::NotFound("File not exists".to_string()))?;

        debug!(
            file_id = %file.id,
            stored_extension = %file.file_extension,
            expected_format = expected_format.unwrap_or("-"),
            "Resolving media file"
        );

        match decide_access(&file, caller) {
            AccessDecision::Allow => Ok(file.path()),
            AccessDecision::NotFound => Err(AppError::NotFound("File not exists".to_string())),
            AccessDecision::Unauthorized(Denial::Anonymous) => Err(AppError::Unauthenticated(
                "Authentication required to access this file".to_string(),
            )),
            AccessDecision::Unauthorized(Denial::NotOwner) => Err(AppError::Unauthorized(
                "You do not have permission to access this file".to_string(),
            )),
            AccessDecision::DelegateToCompany(company_id) => {
                let caller = caller.ok_or_else(|| {
                    AppError::Unauthenticated(
                        "Authentication required to access this file".to_string(),
                    )
                })?;
                caller.ensure_company_access(CompanyOperation::Read, company_id)?;
                Ok(file.path())
            }
            AccessDecision::Unresolvable => Err(AppError::BadRequest(format!(
                "Could not get access to resource {}",
                resource_name
            ))),
        }
    }

    /// Remove a file's metadata row and its bytes.
    ///
    /// `file_url` is the URL returned by the upload (a bare stored filename
    /// works too). Internal callers may skip the permission check.
    pub async fn delete_file(
        &self,
        caller: Option<&AuthenticatedUser>,
        file_url: &str,
        skip_permission_check: bool,
    ) -> Result<()> {
        let file = match resource_id_from_url(file_url) {
            Some(id) => self.repository.find_by_id(id).await?,
            None => None,
        }
        .ok_or_else(|| AppError::NotFound("File not exists".to_string()))?;

        if !skip_permission_check {
            Self::ensure_can_delete(&file, caller)?;
        }

        self.repository.delete(file.id).await?;

        // Record is already gone; a failed unlink only leaves orphaned bytes
        match remove_file_if_exists(&file.path()).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "Media file {} had no bytes on disk at {}",
                file.id, file.file_path
            ),
            Err(e) => error!(
                "Orphaned media file left at {} after deleting record {}: {}",
                file.file_path, file.id, e
            ),
        }

        info!("Media file deleted: id={}, path={}", file.id, file.file_path);

        Ok(())
    }

    fn ensure_can_delete(file: &MediaFile, caller: Option<&AuthenticatedUser>) -> Result<()> {
        let caller = caller.ok_or_else(|| {
            AppError::Unauthenticated("Authentication required to delete files".to_string())
        })?;

        if caller.is_operator() {
            return Ok(());
        }

        match file.owner() {
            Some(OwnerScope::Company(company_id)) => {
                caller.ensure_company_access(CompanyOperation::Write, company_id)
            }
            Some(OwnerScope::Individual(user_id)) if user_id == caller.user_id => Ok(()),
            _ => Err(AppError::Unauthorized(
                "You do not have permission to delete this file".to_string(),
            )),
        }
    }

    async fn store_payload(
        &self,
        file_id: Uuid,
        caller: Option<&AuthenticatedUser>,
        upload: FileUpload,
        public_visible: bool,
        company_id: Option<Uuid>,
    ) -> Result<UploadFileResultDto> {
        if upload.data.is_empty() {
            return Err(AppError::Validation("File is not selected".to_string()));
        }

        if upload.data.len() > self.config.max_upload_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {} bytes",
                self.config.max_upload_size
            )));
        }

        let record = self
            .insert_record(
                file_id,
                caller.map(|c| c.user_id),
                company_id,
                &upload.original_file_name,
                public_visible,
                upload.data.len() as i64,
            )
            .await?;

        let mut target = self.open_target(&record).await?;
        let written = self
            .write_or_roll_back(&record, &mut target, &upload.data)
            .await?;

        Ok(self.upload_result(&record, written as i64))
    }

    async fn write_or_roll_back<W>(
        &self,
        record: &MediaFile,
        target: &mut W,
        data: &[u8],
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        match write_payload(target, data).await {
            Ok(written) => Ok(written),
            Err(e) => {
                self.roll_back(record, &e).await;
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn store_stream<R>(
        &self,
        file_id: Uuid,
        caller: Option<&AuthenticatedUser>,
        company_id: Option<Uuid>,
        reader: &mut R,
        original_file_name: &str,
        cancel: &CancellationToken,
        public_visible: bool,
    ) -> Result<UploadFileResultDto>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let record = self
            .insert_record(
                file_id,
                caller.map(|c| c.user_id),
                company_id,
                original_file_name,
                public_visible,
                0,
            )
            .await?;

        let mut target = self.open_target(&record).await?;
        let copied = copy_stream(
            reader,
            &mut target,
            self.config.max_upload_size as u64,
            cancel,
        )
        .await;
        drop(target);

        let written = match copied {
            Ok(written) => written as i64,
            Err(e) => {
                self.roll_back(&record, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.repository.update_size(record.id, written).await {
            self.roll_back(&record, &e).await;
            return Err(e);
        }

        Ok(self.upload_result(&record, written))
    }

    async fn insert_record(
        &self,
        file_id: Uuid,
        caller_id: Option<Uuid>,
        company_id: Option<Uuid>,
        original_file_name: &str,
        public_visible: bool,
        file_size: i64,
    ) -> Result<MediaFile> {
        let folder =
            build_target_folder(&self.config.root_folder, public_visible, caller_id, company_id)
                .await?;

        let extension = file_extension(original_file_name);
        let file_name = stored_file_name(file_id, &extension);
        let file_path = folder.join(&file_name);

        let record = self
            .repository
            .insert(NewMediaFile {
                id: file_id,
                company_id,
                created_by: caller_id,
                original_file_name: original_file_name.to_string(),
                file_name,
                file_path: file_path.to_string_lossy().into_owned(),
                file_size,
                file_extension: extension,
                public_visible,
            })
            .await?;

        debug!(
            "Media file record created: id={}, path={}, public={}",
            record.id, record.file_path, record.public_visible
        );

        Ok(record)
    }

    /// Create the target file, refusing to touch anything already at the path.
    /// On refusal only the metadata row is removed; the existing file is not ours.
    async fn open_target(&self, record: &MediaFile) -> Result<File> {
        let path = record.path();
        let opened = match tokio::fs::try_exists(&path).await {
            Ok(true) => Err(AppError::Conflict(
                "File with this name already exists".to_string(),
            )),
            Ok(false) => create_new_file(&path).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = &opened {
            error!("Media service error: {}", e);
            self.discard_record(record.id).await;
        }

        opened
    }

    /// Undo a failed upload: drop the metadata row and whatever was written.
    /// Cleanup problems are logged and never replace `cause`.
    async fn roll_back(&self, record: &MediaFile, cause: &AppError) {
        match cause {
            AppError::Cancelled(_) => warn!("Upload of media file {} cancelled", record.id),
            _ => error!("Media service error for file {}: {}", record.id, cause),
        }

        self.discard_record(record.id).await;

        if let Err(e) = remove_file_if_exists(&record.path()).await {
            warn!("Could not delete partial file {}: {}", record.file_path, e);
        }
    }

    async fn discard_record(&self, file_id: Uuid) {
        if let Err(e) = self.repository.delete(file_id).await {
            error!(
                "Could not remove metadata for failed upload {}: {}",
                file_id, e
            );
        }
    }

    fn upload_result(&self, record: &MediaFile, size: i64) -> UploadFileResultDto {
        info!(
            "Media file stored: id={}, size={}, public={}",
            record.id, size, record.public_visible
        );

        UploadFileResultDto {
            file_url: format!(
                "{}{}?{}={}",
                self.config.public_api_url, MEDIA_ROUTE, IMAGE_NAME_PARAM, record.file_name
            ),
            size,
            success: true,
            public_visible: record.public_visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::media::repositories::InMemoryMediaFileRepository;
    use crate::shared::test_helpers::{
        create_company_member, create_operator_user, create_user, media_config,
    };
    use chrono::Utc;
    use std::io;
    use std::path::Path;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::{AsyncWriteExt, ReadBuf};

    fn setup() -> (TempDir, Arc<InMemoryMediaFileRepository>, MediaService) {
        let temp_dir = TempDir::new().unwrap();
        let repository = Arc::new(InMemoryMediaFileRepository::new());
        let service = MediaService::new(repository.clone(), media_config(temp_dir.path()));
        (temp_dir, repository, service)
    }

    fn upload(name: &str, data: &[u8]) -> FileUpload {
        FileUpload {
            original_file_name: name.to_string(),
            data: Bytes::copy_from_slice(data),
        }
    }

    fn image_name(result: &UploadFileResultDto) -> &str {
        result.file_url.rsplit("imageName=").next().unwrap()
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .map(|entries| entries.flatten().filter(|e| e.path().is_file()).count())
            .unwrap_or(0)
    }

    /// Yields one chunk, then fails like a dropped connection
    struct FailingReader {
        served: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.served {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset",
                )));
            }
            self.served = true;
            buf.put_slice(b"partial content");
            Poll::Ready(Ok(()))
        }
    }

    /// Rejects every write like a full disk
    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "no space left on device",
            )))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Delegates to the in-memory store but cannot record final sizes
    struct SizeUpdateFailingRepository {
        inner: Arc<InMemoryMediaFileRepository>,
    }

    #[async_trait::async_trait]
    impl MediaFileRepository for SizeUpdateFailingRepository {
        async fn insert(&self, file: NewMediaFile) -> Result<MediaFile> {
            self.inner.insert(file).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaFile>> {
            self.inner.find_by_id(id).await
        }

        async fn update_size(&self, _id: Uuid, _file_size: i64) -> Result<()> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn delete(&self, id: Uuid) -> Result<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_upload_file_stores_bytes_and_metadata() {
        let (temp_dir, repository, service) = setup();
        let user = create_user();

        let result = service
            .upload_file(Some(&user), upload("Photo.PNG", b"Hello, World!"), false, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.size, 13);
        assert!(!result.public_visible);
        assert!(result
            .file_url
            .starts_with("https://api.example.com/media?imageName="));

        let stored_name = image_name(&result);
        let id = parse_resource_id(stored_name).unwrap();
        let record = repository.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(record.file_name, stored_name);
        assert_eq!(record.file_name, format!("{}.png", record.id));
        assert_eq!(record.created_by, Some(user.user_id));
        assert_eq!(record.company_id, None);
        assert_eq!(record.original_file_name, "Photo.PNG");
        assert_eq!(record.file_size, 13);
        assert!(record.is_active);
        assert_eq!(
            record.path(),
            temp_dir
                .path()
                .join(user.user_id.to_string())
                .join(&record.file_name)
        );
        assert_eq!(std::fs::read(record.path()).unwrap(), b"Hello, World!");
    }

    #[tokio::test]
    async fn test_upload_file_into_public_company_folder() {
        let (temp_dir, repository, service) = setup();
        let company = Uuid::new_v4();

        // company uploads do not need a caller identity
        let result = service
            .upload_file(None, upload("logo.svg", b"<svg/>"), true, Some(company))
            .await
            .unwrap();

        let id = parse_resource_id(image_name(&result)).unwrap();
        let record = repository.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(record.company_id, Some(company));
        assert_eq!(record.created_by, None);
        assert_eq!(
            record.path().parent().unwrap(),
            temp_dir.path().join(company.to_string()).join("public")
        );
    }

    #[tokio::test]
    async fn test_upload_empty_file_is_rejected() {
        let (_temp_dir, repository, service) = setup();

        let result = service
            .upload_file(Some(&create_user()), upload("empty.txt", b""), false, None)
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_anonymous_personal_upload_is_rejected() {
        let (temp_dir, repository, service) = setup();

        let result = service
            .upload_file(None, upload("a.txt", b"data"), true, None)
            .await;

        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
        assert_eq!(repository.len().await, 0);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_conflict_keeps_existing_file() {
        let (temp_dir, repository, service) = setup();
        let user = create_user();
        let file_id = Uuid::new_v4();
        let folder = temp_dir.path().join(user.user_id.to_string());
        std::fs::create_dir_all(&folder).unwrap();
        let existing = folder.join(format!("{}.txt", file_id));
        std::fs::write(&existing, b"first").unwrap();

        let result = service
            .store_payload(file_id, Some(&user), upload("b.txt", b"second"), false, None)
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(std::fs::read(&existing).unwrap(), b"first");
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_then_resolve_round_trip() {
        let (_temp_dir, repository, service) = setup();
        let owner = create_user();

        let result = service
            .upload_file(Some(&owner), upload("notes.md", b"# notes"), false, None)
            .await
            .unwrap();
        let stored_name = image_name(&result);

        let path = service
            .resolve_file_path(Some(&owner), Some(stored_name), Some("md"))
            .await
            .unwrap();

        let record = repository
            .find_by_id(parse_resource_id(stored_name).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path, record.path());
        assert_eq!(std::fs::read(&path).unwrap(), b"# notes");
    }

    #[tokio::test]
    async fn test_public_file_resolves_for_anonymous_caller() {
        let (_temp_dir, _repository, service) = setup();

        let result = service
            .upload_file(Some(&create_user()), upload("cat.jpg", b"jpeg"), true, None)
            .await
            .unwrap();

        let path = service
            .resolve_file_path(None, Some(image_name(&result)), Some("jpg"))
            .await
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_private_file_owner_and_stranger() {
        let (_temp_dir, _repository, service) = setup();
        let owner = create_user();

        let result = service
            .upload_file(Some(&owner), upload("secret.pdf", b"%PDF"), false, None)
            .await
            .unwrap();
        let name = image_name(&result);

        assert!(service
            .resolve_file_path(Some(&owner), Some(name), None)
            .await
            .is_ok());
        assert!(matches!(
            service
                .resolve_file_path(Some(&create_user()), Some(name), None)
                .await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            service.resolve_file_path(None, Some(name), None).await,
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn test_private_company_file_requires_company_read() {
        let (_temp_dir, _repository, service) = setup();
        let company = Uuid::new_v4();
        let uploader = create_company_member(company, "write");

        let result = service
            .upload_file(Some(&uploader), upload("plan.xlsx", b"cells"), false, Some(company))
            .await
            .unwrap();
        let name = image_name(&result);

        let outsider = create_company_member(Uuid::new_v4(), "read");
        assert!(matches!(
            service.resolve_file_path(Some(&outsider), Some(name), None).await,
            Err(AppError::Unauthorized(_))
        ));

        let reader = create_company_member(company, "read");
        assert!(service
            .resolve_file_path(Some(&reader), Some(name), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_inactive_file_visible_to_operators_only() {
        let (temp_dir, repository, service) = setup();
        let owner = create_user();
        let id = Uuid::new_v4();
        repository
            .seed(MediaFile {
                id,
                company_id: None,
                created_by: Some(owner.user_id),
                original_file_name: "old.png".to_string(),
                file_name: format!("{}.png", id),
                file_path: temp_dir
                    .path()
                    .join(format!("{}.png", id))
                    .to_string_lossy()
                    .into_owned(),
                file_size: 3,
                file_extension: "png".to_string(),
                public_visible: true,
                is_active: false,
                media_type: String::new(),
                created_at: Utc::now(),
            })
            .await;
        let name = format!("{}.png", id);

        assert!(matches!(
            service.resolve_file_path(None, Some(&name), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.resolve_file_path(Some(&owner), Some(&name), None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service
            .resolve_file_path(Some(&create_operator_user()), Some(&name), None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_resolve_unknown_or_malformed_resource() {
        let (_temp_dir, _repository, service) = setup();

        for name in [None, Some(""), Some("not-a-uuid.png")] {
            assert!(matches!(
                service.resolve_file_path(None, name, None).await,
                Err(AppError::NotFound(_))
            ));
        }

        let missing = format!("{}.png", Uuid::new_v4());
        assert!(matches!(
            service
                .resolve_file_path(Some(&create_operator_user()), Some(&missing), None)
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_from_stream_updates_size() {
        let (_temp_dir, repository, service) = setup();
        let user = create_user();
        let content = vec![7u8; 200 * 1024];
        let mut reader = content.as_slice();

        let result = service
            .save_from_stream(
                Some(&user),
                None,
                &mut reader,
                "video.mp4",
                CancellationToken::new(),
                false,
            )
            .await
            .unwrap();

        assert_eq!(result.size, content.len() as i64);
        let record = repository
            .find_by_id(parse_resource_id(image_name(&result)).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.file_size, content.len() as i64);
        assert_eq!(record.file_extension, "mp4");
        assert_eq!(std::fs::read(record.path()).unwrap(), content);
    }

    #[tokio::test]
    async fn test_stream_failure_rolls_back() {
        let (temp_dir, repository, service) = setup();
        let user = create_user();
        let mut reader = FailingReader { served: false };

        let result = service
            .save_from_stream(
                Some(&user),
                None,
                &mut reader,
                "broken.bin",
                CancellationToken::new(),
                false,
            )
            .await;

        match result {
            Err(AppError::Storage(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected storage error, got {:?}", other),
        }
        assert_eq!(repository.len().await, 0);
        assert_eq!(files_in(&temp_dir.path().join(user.user_id.to_string())), 0);
    }

    #[tokio::test]
    async fn test_stream_cancellation_rolls_back() {
        let (temp_dir, repository, service) = setup();
        let user = create_user();
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"first chunk").await.unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = service
            .save_from_stream(Some(&user), None, &mut server, "live.bin", cancel, true)
            .await;

        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert_eq!(repository.len().await, 0);
        assert_eq!(
            files_in(
                &temp_dir
                    .path()
                    .join(user.user_id.to_string())
                    .join("public")
            ),
            0
        );
        drop(client);
    }

    #[tokio::test]
    async fn test_delete_file_by_owner() {
        let (_temp_dir, repository, service) = setup();
        let owner = create_user();
        let result = service
            .upload_file(Some(&owner), upload("a.txt", b"data"), false, None)
            .await
            .unwrap();
        let id = parse_resource_id(image_name(&result)).unwrap();
        let path = repository.find_by_id(id).await.unwrap().unwrap().path();

        service
            .delete_file(Some(&owner), &result.file_url, false)
            .await
            .unwrap();

        assert!(repository.find_by_id(id).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_file_permissions() {
        let (_temp_dir, repository, service) = setup();
        let owner = create_user();
        let result = service
            .upload_file(Some(&owner), upload("a.txt", b"data"), true, None)
            .await
            .unwrap();

        assert!(matches!(
            service.delete_file(None, &result.file_url, false).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            service
                .delete_file(Some(&create_user()), &result.file_url, false)
                .await,
            Err(AppError::Unauthorized(_))
        ));
        assert_eq!(repository.len().await, 1);

        // internal callers skip the check entirely
        service
            .delete_file(None, &result.file_url, true)
            .await
            .unwrap();
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_company_file_requires_write() {
        let (_temp_dir, repository, service) = setup();
        let company = Uuid::new_v4();
        let result = service
            .upload_file(None, upload("a.txt", b"data"), false, Some(company))
            .await
            .unwrap();

        assert!(matches!(
            service
                .delete_file(
                    Some(&create_company_member(company, "read")),
                    &result.file_url,
                    false
                )
                .await,
            Err(AppError::Unauthorized(_))
        ));

        service
            .delete_file(
                Some(&create_company_member(company, "write")),
                &result.file_url,
                false,
            )
            .await
            .unwrap();
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_file() {
        let (_temp_dir, _repository, service) = setup();

        assert!(matches!(
            service
                .delete_file(
                    Some(&create_operator_user()),
                    "https://api.example.com/media?imageName=nope.png",
                    false
                )
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_payload_write_failure_rolls_back() {
        let (temp_dir, repository, service) = setup();
        let user = create_user();

        let record = service
            .insert_record(
                Uuid::new_v4(),
                Some(user.user_id),
                None,
                "report.pdf",
                false,
                4,
            )
            .await
            .unwrap();
        let target = service.open_target(&record).await.unwrap();
        assert!(record.path().exists());

        let result = service
            .write_or_roll_back(&record, &mut FailingWriter, b"%PDF")
            .await;
        drop(target);

        match result {
            Err(AppError::Storage(e)) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
            other => panic!("expected storage error, got {:?}", other),
        }
        assert_eq!(repository.len().await, 0);
        assert_eq!(files_in(&temp_dir.path().join(user.user_id.to_string())), 0);
    }

    #[tokio::test]
    async fn test_size_update_failure_rolls_back() {
        let temp_dir = TempDir::new().unwrap();
        let inner = Arc::new(InMemoryMediaFileRepository::new());
        let service = MediaService::new(
            Arc::new(SizeUpdateFailingRepository {
                inner: inner.clone(),
            }),
            media_config(temp_dir.path()),
        );
        let user = create_user();
        let mut reader: &[u8] = b"streamed bytes";

        let result = service
            .save_from_stream(
                Some(&user),
                None,
                &mut reader,
                "log.txt",
                CancellationToken::new(),
                false,
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        ));
        assert_eq!(inner.len().await, 0);
        assert_eq!(files_in(&temp_dir.path().join(user.user_id.to_string())), 0);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected() {
        let (_temp_dir, repository, service) = setup();
        let data = vec![0u8; service.max_upload_size() + 1];

        let result = service
            .upload_file(Some(&create_user()), upload("big.bin", &data), false, None)
            .await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert_eq!(repository.len().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_stream_rolls_back() {
        let (temp_dir, repository, service) = setup();
        let company = Uuid::new_v4();
        let content = vec![9u8; service.max_upload_size() * 3];
        let mut reader = content.as_slice();

        let result = service
            .save_from_stream(
                None,
                Some(company),
                &mut reader,
                "flood.bin",
                CancellationToken::new(),
                false,
            )
            .await;

        assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));
        assert_eq!(repository.len().await, 0);
        assert_eq!(files_in(&temp_dir.path().join(company.to_string())), 0);
    }

    #[tokio::test]
    async fn test_delete_keeps_going_when_bytes_cannot_be_removed() {
        let (temp_dir, repository, service) = setup();
        let owner = create_user();
        let id = Uuid::new_v4();
        // a directory where the file should be makes the unlink fail
        let blocked = temp_dir.path().join(format!("{}.png", id));
        std::fs::create_dir_all(&blocked).unwrap();
        repository
            .seed(MediaFile {
                id,
                company_id: None,
                created_by: Some(owner.user_id),
                original_file_name: "stuck.png".to_string(),
                file_name: format!("{}.png", id),
                file_path: blocked.to_string_lossy().into_owned(),
                file_size: 3,
                file_extension: "png".to_string(),
                public_visible: false,
                is_active: true,
                media_type: String::new(),
                created_at: Utc::now(),
            })
            .await;

        service
            .delete_file(Some(&owner), &format!("{}.png", id), false)
            .await
            .unwrap();

        assert!(repository.find_by_id(id).await.unwrap().is_none());
        assert!(blocked.exists());
    }
}
