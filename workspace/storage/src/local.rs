use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{Error, ImageFile, Result, StorageProvider, UploadedImage};

/// Stores images on disk below `<public_root>/uploads` and returns
/// `/uploads/<folder>/<name>` URLs, which the HTTP layer serves statically.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    public_root: PathBuf,
}

impl LocalStorage {
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.public_root.join("uploads")
    }

    /// Maps a `<folder>/<file>` id back to a file path. Anything else, including
    /// ids that try to climb out of the uploads directory, yields `None`.
    fn resolve_id(&self, public_id: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = public_id.split('/').collect();
        if segments.len() != 2
            || segments
                .iter()
                .any(|segment| segment.is_empty() || segment.starts_with('.') || segment.contains('\\'))
        {
            return None;
        }
        Some(self.uploads_dir().join(public_id))
    }

    /// Same as [`Self::resolve_id`] for an `/uploads/<folder>/<file>` URL.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        self.resolve_id(url.strip_prefix("/uploads/")?)
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload_image(&self, file: &ImageFile, folder: &str) -> Result<UploadedImage> {
        let extension = file.validate()?;

        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let target_dir = self.uploads_dir().join(folder);
        tokio::fs::create_dir_all(&target_dir).await?;

        let path = target_dir.join(&file_name);
        debug!("Writing image to {}", path.display());
        tokio::fs::write(&path, &file.bytes).await?;

        Ok(UploadedImage {
            url: format!("/uploads/{}/{}", folder, file_name),
            public_id: Some(format!("{}/{}", folder, file_name)),
        })
    }

    #[instrument(skip(self))]
    async fn delete_image(&self, url: &str, public_id: Option<&str>) -> Result<()> {
        let target = match public_id {
            Some(public_id) => self.resolve_id(public_id),
            None => self.resolve(url),
        };
        let Some(path) = target else {
            debug!("Ignoring delete for non-local image URL");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Tried to delete a file that does not exist: {}", path.display());
                Ok(())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}
