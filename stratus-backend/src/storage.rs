use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// File storage manager placing uploads under per-user directories
#[derive(Clone)]
pub struct FileStorage {
    storage_root: PathBuf,
}

impl FileStorage {
    /// Create a new file storage instance
    pub fn new(storage_root: impl AsRef<Path>) -> Self {
        Self {
            storage_root: storage_root.as_ref().to_path_buf(),
        }
    }

    /// Initialize the storage directory structure
    pub async fn init(&self) -> Result<()> {
        if !self.storage_root.exists() {
            fs::create_dir_all(&self.storage_root).await.map_err(|e| {
                AppError::ServerError(format!("Failed to create storage directory: {}", e))
            })?;
            tracing::info!(
                "📁 Created storage directory: {}",
                self.storage_root.display()
            );
        }
        Ok(())
    }

    /// Pick a location for an upload: a fresh UUID carrying only the
    /// extension of the claimed filename, under the owner's directory.
    /// Nothing else of the claimed name survives.
    pub fn generate_location(&self, storage_path: &str, original_name: &str) -> String {
        let basename = Path::new(original_name)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let stored_name = match Path::new(&basename).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        format!("{}/{}", storage_path, stored_name)
    }

    /// Write uploaded bytes and return the location to record
    pub async fn store_file(
        &self,
        storage_path: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<String> {
        let relative_path = self.generate_location(storage_path, original_name);
        let file_path = self.storage_root.join(&relative_path);

        // Create the owner's directory if it doesn't exist
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::ServerError(format!("Failed to create directory: {}", e)))?;
        }

        fs::write(&file_path, data)
            .await
            .map_err(|e| AppError::ServerError(format!("Failed to write file: {}", e)))?;

        tracing::debug!("💾 Stored file: {} -> {}", original_name, relative_path);
        Ok(relative_path)
    }

    /// Open stored bytes for streaming
    pub async fn open_file(&self, relative_path: &str) -> Result<fs::File> {
        let file_path = self.storage_root.join(relative_path);

        let file = fs::File::open(&file_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AppError::FileNotFound,
            _ => AppError::ServerError(format!("Failed to open file: {}", e)),
        })?;

        Ok(file)
    }

    /// Check whether stored bytes exist at the location
    pub async fn file_exists(&self, relative_path: &str) -> bool {
        fs::try_exists(self.storage_root.join(relative_path))
            .await
            .unwrap_or(false)
    }

    /// Delete a file from disk
    pub async fn delete_file(&self, relative_path: &str) -> Result<()> {
        let file_path = self.storage_root.join(relative_path);

        match fs::remove_file(&file_path).await {
            Ok(_) => {
                tracing::debug!("🗑️  Deleted file: {}", relative_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File already doesn't exist, that's fine
                Ok(())
            }
            Err(e) => Err(AppError::ServerError(format!(
                "Failed to delete file: {}",
                e
            ))),
        }
    }

    /// Delete a user's whole directory, files included
    pub async fn delete_user_dir(&self, storage_path: &str) -> Result<()> {
        let dir_path = self.storage_root.join(storage_path);

        match fs::remove_dir_all(&dir_path).await {
            Ok(_) => {
                tracing::debug!("🗑️  Deleted user directory: {}", storage_path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::ServerError(format!(
                "Failed to delete user directory: {}",
                e
            ))),
        }
    }
}
