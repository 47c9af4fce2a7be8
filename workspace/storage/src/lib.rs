//! Image storage for player photos and team banners.
//!
//! Every backend implements [`StorageProvider`]: validate the file, put it
//! somewhere reachable, hand back a URL. Which backend runs is decided once at
//! start-up from a [`ProviderConfig`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

mod cloudinary;
mod error;
mod local;

pub use cloudinary::{CloudinaryConfig, CloudinaryStorage};
pub use error::{Error, Result};
pub use local::LocalStorage;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// An uploaded file as received from the client.
#[derive(Clone)]
pub struct ImageFile {
    /// Original file name, used only to read the extension.
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl std::fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension of the original file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Checks extension and size, returning the normalized extension.
    pub fn validate(&self) -> Result<String> {
        let extension = self.extension().unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::UnsupportedExtension {
                extension,
                allowed: "jpg, jpeg, png, webp",
            });
        }

        if self.bytes.len() > MAX_IMAGE_SIZE {
            return Err(Error::FileTooLarge {
                size: self.bytes.len(),
                max_mb: MAX_IMAGE_SIZE / (1024 * 1024),
            });
        }

        Ok(extension)
    }
}

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    /// Provider-side identifier, when the provider has one.
    pub public_id: Option<String>,
}

#[async_trait]
pub trait StorageProvider: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Validates and stores `file` under `folder`.
    async fn upload_image(&self, file: &ImageFile, folder: &str) -> Result<UploadedImage>;

    /// Removes a previously stored image. A missing image is not an error.
    async fn delete_image(&self, url: &str, public_id: Option<&str>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub enum ProviderConfig {
    Local { public_root: PathBuf },
    Cloudinary(CloudinaryConfig),
}

impl ProviderConfig {
    pub fn build(self) -> Result<Arc<dyn StorageProvider>> {
        let provider: Arc<dyn StorageProvider> = match self {
            ProviderConfig::Local { public_root } => Arc::new(LocalStorage::new(public_root)),
            ProviderConfig::Cloudinary(config) => Arc::new(CloudinaryStorage::new(config)?),
        };
        tracing::info!(provider = provider.name(), "Image storage provider ready");
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "d.webp"] {
            let file = ImageFile::new(name, vec![0u8; 16]);
            assert!(file.validate().is_ok(), "{name} should be accepted");
        }
        assert_eq!(ImageFile::new("x.JPG", vec![1u8]).validate().unwrap(), "jpg");
    }

    #[test]
    fn rejects_other_extensions() {
        let err = ImageFile::new("anim.gif", vec![0u8; 4]).validate().unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension { ref extension, .. } if extension == "gif"));
        assert!(err.is_client_error());

        let err = ImageFile::new("no_extension", vec![0u8; 4]).validate().unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension { .. }));
    }

    #[test]
    fn rejects_files_over_ten_megabytes() {
        let exact = ImageFile::new("ok.png", vec![0u8; MAX_IMAGE_SIZE]);
        assert!(exact.validate().is_ok());

        let big = ImageFile::new("big.png", vec![0u8; MAX_IMAGE_SIZE + 1]);
        let err = big.validate().unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { max_mb: 10, .. }));
    }
}
