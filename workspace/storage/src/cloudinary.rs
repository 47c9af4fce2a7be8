use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::{Error, ImageFile, Result, StorageProvider, UploadedImage};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Caps stored images at 1920px wide without cropping.
const WIDTH_LIMIT_TRANSFORMATION: &str = "c_limit,w_1920";

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder prefix for every upload, e.g. `pucara`.
    pub base_folder: String,
    pub api_base: String,
}

impl CloudinaryConfig {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_folder: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_folder: base_folder.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.api_base, self.cloud_name, action)
    }
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("base_folder", &self.base_folder)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug)]
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        if config.cloud_name.is_empty() || config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(Error::Config(
                "cloudinary requires cloud name, api key and api secret".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { config, client })
    }

    /// Only assets below the configured base folder were uploaded by us.
    fn owns(&self, public_id: &str) -> bool {
        is_below_folder(public_id, &self.config.base_folder)
    }

    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);
        params.insert("signature", signature);
        params.insert("signature_algorithm", "sha256".to_string());
        params.insert("api_key", self.config.api_key.clone());
        params
    }
}

/// `k1=v1&k2=v2` over the sorted parameters, as signed by the upload API.
pub(crate) fn string_to_sign(params: &BTreeMap<&'static str, String>) -> String {
    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub(crate) fn is_below_folder(public_id: &str, base_folder: &str) -> bool {
    public_id
        .strip_prefix(base_folder)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.split('/').any(|segment| segment == ".."))
}

/// Pulls the public id out of a delivery URL such as
/// `https://res.cloudinary.com/<cloud>/image/upload/v1712/pucara/players/abc.jpg`.
pub(crate) fn extract_public_id(url: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(offset) = url[search_from..].find("/v") {
        let start = search_from + offset + 2;
        let rest = &url[start..];
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();

        if digits > 0 && rest[digits..].starts_with('/') {
            let tail = &rest[digits + 1..];
            if let Some((id, extension)) = tail.rsplit_once('.') {
                let extension_ok = !extension.is_empty()
                    && extension.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
                if !id.is_empty() && extension_ok {
                    return Some(id.to_string());
                }
            }
        }

        search_from = start;
    }
    None
}

#[async_trait]
impl StorageProvider for CloudinaryStorage {
    fn name(&self) -> &'static str {
        "cloudinary"
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload_image(&self, file: &ImageFile, folder: &str) -> Result<UploadedImage> {
        file.validate()?;

        let mut params = BTreeMap::new();
        params.insert("folder", format!("{}/{}", self.config.base_folder, folder));
        params.insert("public_id", Uuid::new_v4().simple().to_string());
        params.insert("transformation", WIDTH_LIMIT_TRANSFORMATION.to_string());

        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }

        let form = self
            .signed_params(params)
            .into_iter()
            .fold(Form::new().part("file", part), |form, (key, value)| form.text(key, value));

        debug!("Uploading image to cloudinary");
        let response = self
            .client
            .post(self.config.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Cloudinary upload failed with {}: {}", status, body);
            return Err(Error::Upload(format!("status {}", status)));
        }

        let uploaded: UploadResponse = response.json().await?;
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: Some(uploaded.public_id),
        })
    }

    #[instrument(skip(self))]
    async fn delete_image(&self, url: &str, public_id: Option<&str>) -> Result<()> {
        let Some(public_id) = public_id.map(str::to_string).or_else(|| extract_public_id(url)) else {
            warn!("Could not extract a public id from {}", url);
            return Ok(());
        };
        if !self.owns(&public_id) {
            warn!("Refusing to destroy {} outside '{}'", public_id, self.config.base_folder);
            return Ok(());
        }

        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.clone());

        let response = self
            .client
            .post(self.config.endpoint("destroy"))
            .form(&self.signed_params(params))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Upload(format!(
                "destroy of {} returned {}",
                public_id,
                response.status()
            )));
        }

        let outcome: DestroyResponse = response.json().await?;
        if outcome.result != "ok" {
            warn!("Cloudinary destroy of {} returned '{}'", public_id, outcome.result);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_public_id_from_versioned_url() {
        let url = "https://res.cloudinary.com/demo/image/upload/v1712345678/pucara/players/abc123.jpg";
        assert_eq!(extract_public_id(url).as_deref(), Some("pucara/players/abc123"));
    }

    #[test]
    fn extracts_public_id_after_transformations() {
        let url = "https://res.cloudinary.com/demo/image/upload/c_limit,w_1920/v99/pucara/teams/t.webp";
        assert_eq!(extract_public_id(url).as_deref(), Some("pucara/teams/t"));
    }

    #[test]
    fn no_public_id_without_version_segment() {
        assert_eq!(extract_public_id("/uploads/players/abc.png"), None);
        assert_eq!(extract_public_id("https://example.com/video/abc"), None);
    }

    #[test]
    fn only_ids_below_base_folder_are_owned() {
        assert!(is_below_folder("pucara/players/abc", "pucara"));
        assert!(is_below_folder("pucara/teams/t", "pucara"));
        assert!(!is_below_folder("pucara", "pucara"));
        assert!(!is_below_folder("pucara/", "pucara"));
        assert!(!is_below_folder("pucarax/players/abc", "pucara"));
        assert!(!is_below_folder("other/players/abc", "pucara"));
        assert!(!is_below_folder("pucara/../other/abc", "pucara"));
    }

    #[tokio::test]
    async fn delete_outside_base_folder_makes_no_request() {
        let mut config = CloudinaryConfig::new("demo", "key", "secret", "pucara");
        // Unroutable; any request would fail the delete
        config.api_base = "http://127.0.0.1:9".to_string();
        let storage = CloudinaryStorage::new(config).unwrap();

        storage
            .delete_image("https://res.cloudinary.com/demo/image/upload/v1/victim/asset.jpg", None)
            .await
            .unwrap();
        storage.delete_image("", Some("victim/asset")).await.unwrap();
    }

    #[test]
    fn string_to_sign_is_sorted_and_skips_empty_values() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());
        params.insert("folder", "pucara/players".to_string());
        params.insert("public_id", String::new());

        assert_eq!(string_to_sign(&params), "folder=pucara/players&timestamp=1700000000");
    }

    #[test]
    fn signature_depends_on_secret() {
        let mut params = BTreeMap::new();
        params.insert("timestamp", "1700000000".to_string());

        let a = sign(&params, "secret-a");
        let b = sign(&params, "secret-b");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(a, sign(&params, "secret-a"));
    }

    #[test]
    fn debug_output_hides_secret() {
        let config = CloudinaryConfig::new("demo", "key", "super-secret", "pucara");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let config = CloudinaryConfig::new("demo", "", "secret", "pucara");
        assert!(matches!(CloudinaryStorage::new(config), Err(Error::Config(_))));
    }
}
