// service/media_storage.rs
use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use crate::{config::Config, service::error::ServiceError};

pub const MAX_MEDIA_SIZE_MB: usize = 5;

/// Drops a `data:image/...;base64,` prefix if the client sent a data URL.
pub fn strip_data_url(data: &str) -> &str {
    if data.starts_with("data:") {
        data.split_once(',').map(|(_, body)| body).unwrap_or(data)
    } else {
        data
    }
}

pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

pub fn decode_media(data: &str, max_size_mb: usize) -> Result<Vec<u8>, ServiceError> {
    let clean_data = strip_data_url(data.trim());

    // Cheap estimate before allocating the decoded buffer
    let approx_size = clean_data.len() * 3 / 4;
    let max_size_bytes = max_size_mb * 1024 * 1024;
    if approx_size > max_size_bytes {
        return Err(ServiceError::Validation(format!(
            "File is larger than {} MB",
            max_size_mb
        )));
    }

    STANDARD
        .decode(clean_data)
        .map_err(|e| ServiceError::Validation(format!("Failed to decode base64: {}", e)))
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    access_key: String,
}

impl MediaStorage {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.media_storage_url.trim_end_matches('/').to_string(),
            bucket: config.media_bucket.clone(),
            access_key: config.media_access_key.clone(),
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, key)
    }

    /// Stores one listing image and returns its public URL.
    pub async fn upload_listing_media(
        &self,
        listing_id: Uuid,
        content_type: &str,
        data: &str,
    ) -> Result<String, ServiceError> {
        let bytes = decode_media(data, MAX_MEDIA_SIZE_MB)?;
        let key = format!(
            "listings/{}/{}.{}",
            listing_id,
            Uuid::new_v4(),
            extension_for(content_type)
        );
        let url = self.object_url(&key);

        let mut request = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(bytes);
        if !self.access_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.access_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Other(format!("Media upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::Other(format!(
                "Media storage returned {} for {}",
                response.status(),
                key
            )));
        }

        tracing::info!("Uploaded media {} for listing {}", key, listing_id);
        Ok(url)
    }
}
