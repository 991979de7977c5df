use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, StatusCode};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::store::ObjectStore;

/// Object storage over a Supabase-style REST API. Objects live at
/// `{base}/object/{bucket}/{key}` and are served publicly from
/// `{base}/object/public/{bucket}/{key}`.
pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

impl HttpObjectStore {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build storage HTTP client");

        Self {
            http,
            base_url: config.storage_url.trim_end_matches('/').to_string(),
            bucket: config.storage_bucket.clone(),
            service_key: config.storage_service_key.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, key)
    }

    fn public_ref(&self, key: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> AppResult<String> {
        let response = self
            .http
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to upload image: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!(
                "Failed to upload image: {}: {}",
                status, body
            )));
        }

        Ok(self.public_ref(key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let response = self
            .http
            .delete(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Failed to delete image: {}", e)))?;

        // A blob that is already gone counts as deleted.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upload(format!(
                "Failed to delete image: {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn bucket_exists(&self) -> AppResult<bool> {
        let response = self
            .http
            .get(format!("{}/bucket/{}", self.base_url, self.bucket))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageConfig(format!(
                    "Failed to reach storage: {}. Check STORAGE_URL and STORAGE_SERVICE_KEY.",
                    e
                ))
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(AppError::StorageConfig(format!(
                "Storage bucket check failed with status {}. Check STORAGE_URL and STORAGE_SERVICE_KEY.",
                status
            ))),
        }
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
