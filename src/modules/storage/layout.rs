//! Folder layout of the media root
//!
//! ```text
//! {root}/
//! ├── {company_id}/
//! │   ├── public/{file_id}.{ext}
//! │   └── {file_id}.{ext}
//! └── {user_id}/
//!     ├── public/{file_id}.{ext}
//!     └── {file_id}.{ext}
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::shared::constants::PUBLIC_FOLDER_NAME;

/// Owner of a stored file; decides which top-level folder it lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Company(Uuid),
    Individual(Uuid),
}

impl OwnerScope {
    /// Company ownership wins over the caller; without a company the caller
    /// must be known.
    pub fn resolve(caller_id: Option<Uuid>, company_id: Option<Uuid>) -> Result<Self> {
        match (company_id, caller_id) {
            (Some(company_id), _) => Ok(OwnerScope::Company(company_id)),
            (None, Some(caller_id)) => Ok(OwnerScope::Individual(caller_id)),
            (None, None) => Err(AppError::Unauthenticated(
                "Authentication required to store personal files".to_string(),
            )),
        }
    }

    pub fn folder_name(&self) -> String {
        match self {
            OwnerScope::Company(id) | OwnerScope::Individual(id) => id.to_string(),
        }
    }
}

/// Target folder for a scope and visibility, without touching the filesystem
pub fn target_folder(root: &Path, scope: OwnerScope, public_visible: bool) -> PathBuf {
    let base = root.join(scope.folder_name());
    if public_visible {
        base.join(PUBLIC_FOLDER_NAME)
    } else {
        base
    }
}

/// Resolve the target folder and create every missing directory on the way.
///
/// Existing directories are left as they are, so calling this twice with the
/// same inputs returns the same path.
pub async fn build_target_folder(
    root: &Path,
    public_visible: bool,
    caller_id: Option<Uuid>,
    company_id: Option<Uuid>,
) -> Result<PathBuf> {
    let scope = OwnerScope::resolve(caller_id, company_id)?;
    let folder = target_folder(root, scope, public_visible);

    tokio::fs::create_dir_all(&folder).await?;
    debug!(folder = %folder.display(), ?scope, public_visible, "Target folder ready");

    Ok(folder)
}
