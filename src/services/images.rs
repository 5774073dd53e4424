//! Post and comment images live in object storage behind a CDN.
//!
//! The browser uploads directly with a presigned PUT URL; the server only
//! hands out URLs and deletes objects.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{Client as S3Client, presigning::PresigningConfig};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{config::StorageConfig, error::AppError};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub image_name: String,
    /// Where the image is served from once uploaded.
    pub public_url: String,
}

/// Object storage backend.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Presigned PUT URL for `key`.
    async fn presign_put(&self, key: &str) -> Result<String, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;

    fn public_url(&self, key: &str) -> String;
}

/// Cache invalidation in front of the store.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, path: &str) -> Result<(), AppError>;
}

pub struct S3ImageStore {
    client: S3Client,
    bucket: String,
    public_url: String,
    upload_ttl: Duration,
}

impl S3ImageStore {
    /// Credentials come from the default AWS provider chain.
    pub async fn new(config: &StorageConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        Self {
            client: S3Client::new(&shared),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            upload_ttl: Duration::from_secs(config.upload_url_ttl),
        }
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn presign_put(&self, key: &str) -> Result<String, AppError> {
        let presigning = PresigningConfig::expires_in(self.upload_ttl)
            .map_err(|e| AppError::internal("Failed to generate upload URL", e))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::internal("Failed to generate upload URL", e))?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::internal("Failed to delete image", e))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }
}

/// Purges paths through an HTTP endpoint (`POST {"paths": [...]}`, bearer token).
pub struct HttpPurgeInvalidator {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpPurgeInvalidator {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl CacheInvalidator for HttpPurgeInvalidator {
    async fn invalidate(&self, path: &str) -> Result<(), AppError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "paths": [path] }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| AppError::InternalServerError(format!("CDN purge failed: {}", e)))?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn ImageStore>,
    cdn: Option<Arc<dyn CacheInvalidator>>,
}

impl ImageService {
    pub fn new(store: Arc<dyn ImageStore>, cdn: Option<Arc<dyn CacheInvalidator>>) -> Self {
        Self { store, cdn }
    }

    pub async fn from_config(config: &StorageConfig) -> Self {
        let store = Arc::new(S3ImageStore::new(config).await);
        let cdn = config.cdn_purge_url.clone().map(|endpoint| {
            Arc::new(HttpPurgeInvalidator::new(
                endpoint,
                config.cdn_purge_token.clone(),
            )) as Arc<dyn CacheInvalidator>
        });

        Self::new(store, cdn)
    }

    /// Presigned upload for a fresh random object name.
    pub async fn upload_url(&self) -> Result<PresignedUpload, AppError> {
        let image_name = Uuid::new_v4().simple().to_string();
        let upload_url = self.store.presign_put(&image_name).await?;

        Ok(PresignedUpload {
            upload_url,
            public_url: self.store.public_url(&image_name),
            image_name,
        })
    }

    /// Deletes the object, then asks the CDN to drop it. A failed purge is logged
    /// and does not fail the deletion.
    pub async fn delete(&self, image_name: &str) -> Result<(), AppError> {
        validate_image_name(image_name)?;

        self.store.delete(image_name).await?;
        tracing::info!("Deleted image {}", image_name);

        if let Some(cdn) = &self.cdn {
            if let Err(e) = cdn.invalidate(&format!("/{}", image_name)).await {
                tracing::warn!("Failed to invalidate CDN cache for {}: {}", image_name, e);
            }
        }

        Ok(())
    }
}

fn validate_image_name(name: &str) -> Result<(), AppError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid image name".to_string()))
    }
}
