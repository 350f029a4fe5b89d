//! On-disk storage for uploaded artifacts

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Extensions kept as uploaded; anything else is stored as `.bin`
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg", "mp4", "webm"];

/// A stored file and its last modification time
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Flat directory of artifacts addressed by generated ids
pub struct FileStorage {
    storage_path: PathBuf,
}

impl FileStorage {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    /// Ensure the storage directory exists
    pub async fn ensure_storage_dir(&self) -> Result<()> {
        if !self.storage_path.exists() {
            fs::create_dir_all(&self.storage_path).await?;
            debug!(path = ?self.storage_path, "Created storage directory");
        }
        Ok(())
    }

    /// Store an upload and return its id. The original name only contributes its extension.
    pub async fn save(&self, data: &[u8], original_name: Option<&str>) -> Result<String> {
        if data.is_empty() {
            return Err(AppError::InvalidRequest("empty file upload".to_string()));
        }
        self.ensure_storage_dir().await?;

        let id = format!("{}.{}", Uuid::new_v4().simple(), extension_for(original_name));

        // Written under a hidden name first so `latest` never sees a partial file
        let staging = self.storage_path.join(format!(".{}.part", id));
        fs::write(&staging, data).await?;
        fs::rename(&staging, self.storage_path.join(&id)).await?;

        debug!(id = %id, size = data.len(), "Saved artifact");
        Ok(id)
    }

    /// Read a stored file by id
    pub async fn read(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.resolve(id)?;
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => Ok(fs::read(&path).await?),
            Ok(_) => Err(not_found(id)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Most recently modified file, if any
    pub async fn latest(&self) -> Result<Option<StoredFile>> {
        let mut latest: Option<StoredFile> = None;

        for file in self.list().await? {
            if latest.as_ref().map_or(true, |current| file.modified > current.modified) {
                latest = Some(file);
            }
        }

        Ok(latest)
    }

    /// List all visible files in storage
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();

        let mut entries = match fs::read_dir(&self.storage_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(AppError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if id.starts_with('.') {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            files.push(StoredFile {
                id,
                path: entry.path(),
                modified: metadata.modified()?,
            });
        }

        Ok(files)
    }

    /// Delete files older than `max_age`
    pub async fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let mut deleted = 0;
        let now = SystemTime::now();

        for file in self.list().await? {
            let expired = now
                .duration_since(file.modified)
                .map(|age| age > max_age)
                .unwrap_or(false);
            if expired && fs::remove_file(&file.path).await.is_ok() {
                deleted += 1;
                debug!(id = %file.id, "Deleted expired artifact");
            }
        }

        Ok(deleted)
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    fn resolve(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(not_found(id));
        }
        Ok(self.storage_path.join(id))
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("artifact '{}'", id))
}

/// Ids are plain file names; anything that could leave the storage directory is refused
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Extension to store an upload under
pub fn extension_for(original_name: Option<&str>) -> &'static str {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    extension
        .and_then(|ext| ALLOWED_EXTENSIONS.iter().find(|allowed| **allowed == ext).copied())
        .unwrap_or("bin")
}

/// Media type served for a stored id
pub fn media_type(id: &str) -> &'static str {
    match id.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}
