use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File extension '{extension}' is not allowed. Allowed extensions: {allowed}")]
    UnsupportedExtension {
        extension: String,
        allowed: &'static str,
    },

    #[error("File exceeds the maximum allowed size ({max_mb}MB)")]
    FileTooLarge { size: usize, max_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload rejected by provider: {0}")]
    Upload(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by the submitted file rather than the backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedExtension { .. } | Error::FileTooLarge { .. }
        )
    }
}
