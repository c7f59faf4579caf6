//! Image uploads to a third-party host.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, instrument};

use configs::ImageConfig;

use crate::errors::ServiceError;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ServiceError>;
}

fn check_payload(bytes: &[u8]) -> Result<(), ServiceError> {
    if bytes.is_empty() {
        return Err(ServiceError::Validation("image body is empty".into()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ServiceError::Validation("image exceeds 10 MiB".into()));
    }
    Ok(())
}

/// Unsigned-preset uploads in the Cloudinary style: multipart `file` + `upload_preset`.
pub struct CloudinaryHost {
    client: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl CloudinaryHost {
    pub fn new(client: reqwest::Client, cfg: &ImageConfig) -> Self {
        Self { client, upload_url: cfg.upload_url.clone(), upload_preset: cfg.upload_preset.clone() }
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ServiceError> {
        check_payload(&bytes)?;
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_string()))
            .text("upload_preset", self.upload_preset.clone());
        let resp = self.client.post(&self.upload_url).multipart(form).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Upstream(format!("image host returned {status}: {body}")));
        }
        let parsed: UploadResponse = resp.json().await?;
        info!(url = %parsed.secure_url, "image_uploaded");
        Ok(parsed.secure_url)
    }
}

/// Used when no upload URL is configured.
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _bytes: Vec<u8>, _filename: &str) -> Result<String, ServiceError> {
        Err(ServiceError::Upstream("image uploads are not configured".into()))
    }
}

pub fn image_host_from_config(cfg: &ImageConfig, client: reqwest::Client) -> Arc<dyn ImageHost> {
    if cfg.is_configured() {
        Arc::new(CloudinaryHost::new(client, cfg))
    } else {
        Arc::new(DisabledImageHost)
    }
}

/// In-memory host for tests
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryImageHost {
        pub uploads: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl ImageHost for MemoryImageHost {
        async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String, ServiceError> {
            check_payload(&bytes)?;
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((filename.to_string(), bytes.len()));
            Ok(format!("https://images.test/{}/{}", uploads.len(), filename))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::mock::MemoryImageHost;

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let host = MemoryImageHost::default();
        assert!(matches!(host.upload(Vec::new(), "a.png").await, Err(ServiceError::Validation(_))));
        let url = host.upload(vec![1, 2, 3], "a.png").await.unwrap();
        assert_eq!(url, "https://images.test/1/a.png");
    }

    #[tokio::test]
    async fn unconfigured_host_reports_upstream_error() {
        let host = image_host_from_config(&ImageConfig::default(), reqwest::Client::new());
        assert!(matches!(host.upload(vec![1], "a.png").await, Err(ServiceError::Upstream(_))));
    }
}
