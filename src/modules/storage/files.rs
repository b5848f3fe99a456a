//! Physical file writes for uploads.

use std::io;
use std::path::Path;

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::core::error::{AppError, Result};
use crate::shared::constants::STREAM_CHUNK_SIZE;

/// Open `path` for writing, failing with `Conflict` if anything is already there
pub async fn create_new_file(path: &Path) -> Result<File> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(AppError::Conflict(
            "File with this name already exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Write a whole in-memory payload in one pass
pub async fn write_payload<W>(file: &mut W, data: &[u8]) -> Result<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    file.write_all(data).await?;
    file.flush().await?;
    Ok(data.len() as u64)
}

/// Copy `reader` into `file` in bounded chunks and return the number of bytes
/// written.
///
/// The token is checked before every read and while a read is pending; once
/// it fires nothing more is written and `Cancelled` is returned. A chunk that
/// would take the total past `max_size` is not written and fails with
/// `PayloadTooLarge`.
pub async fn copy_stream<R>(
    reader: &mut R,
    file: &mut File,
    max_size: u64,
    cancel: &CancellationToken,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; STREAM_CHUNK_SIZE];
    let mut written: u64 = 0;

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AppError::Cancelled(format!(
                    "Upload cancelled after {} bytes",
                    written
                )));
            }
            read = reader.read(&mut buffer) => read?,
        };

        if read == 0 {
            break;
        }

        if written + read as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {} bytes",
                max_size
            )));
        }

        file.write_all(&buffer[..read]).await?;
        written += read as u64;
    }

    file.flush().await?;
    Ok(written)
}

/// Best-effort delete; `Ok(false)` when there was nothing to remove
pub async fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
