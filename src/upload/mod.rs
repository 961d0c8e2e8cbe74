//! Poster image uploads
//!
//! The backend signs an upload (`POST /s3/upload-url`) and the image itself
//! goes straight to the image host as a multipart form. Failures here are
//! [`UploadError`]s so callers can retry the upload without touching the
//! movie form.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::client::MovieApi;
use crate::client::models::{UploadSignature, UploadSignatureRequest};
use crate::config::UploadConfig;
use crate::error::{Result, UploadError, ValidationError};

/// Largest accepted image (10 MiB)
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Content type for a supported image extension
pub fn content_type_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// An image ready to upload
#[derive(Debug, Clone)]
pub struct ImageFile {
    file_name: String,
    content_type: &'static str,
    bytes: Vec<u8>,
}

impl ImageFile {
    /// Read an image from disk. Oversized files are rejected before reading.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        if content_type_for(&file_name).is_none() {
            return Err(ValidationError::UnsupportedImageType(file_name).into());
        }

        let size = std::fs::metadata(path)?.len();
        if size > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size,
                max: MAX_IMAGE_BYTES,
            }
            .into());
        }

        let bytes = std::fs::read(path)?;
        Self::from_bytes(file_name, bytes)
    }

    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name)
            .ok_or_else(|| ValidationError::UnsupportedImageType(file_name.clone()))?;
        let image = Self {
            file_name,
            content_type,
            bytes,
        };
        image.validate()?;
        Ok(image)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.bytes.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        let size = self.bytes.len() as u64;
        if size > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size,
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Body for the backend's signature endpoint
    pub fn signature_request(&self) -> UploadSignatureRequest {
        UploadSignatureRequest {
            file_name: self.file_name.clone(),
            file_type: self.content_type.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Image host error body: `{"error": {"message": "..."}}`
#[derive(Deserialize)]
struct HostErrorBody {
    error: HostError,
}

#[derive(Deserialize)]
struct HostError {
    message: String,
}

/// Client for the image host's signed upload endpoint
pub struct ImageUploader {
    http: reqwest::Client,
    host: String,
    api_key: Option<String>,
}

impl ImageUploader {
    pub fn new(config: &UploadConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UploadError::from)?;
        Ok(Self {
            http,
            host: config.host.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn upload_url(&self, cloud_name: &str) -> String {
        format!("{}/{}/image/upload", self.host, cloud_name)
    }

    /// Post the image with the backend-issued signature; returns the hosted URL.
    pub async fn upload(
        &self,
        image: &ImageFile,
        signature: &UploadSignature,
    ) -> std::result::Result<String, UploadError> {
        let api_key = self.api_key.as_deref().ok_or(UploadError::MissingApiKey)?;

        let file = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(image.content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", api_key.to_string())
            .text("signature", signature.signature.clone())
            .text("timestamp", signature.timestamp.to_string())
            .text("upload_preset", signature.folder.clone());

        let url = self.upload_url(&signature.cloud_name);
        debug!("Uploading {} ({} bytes) to {}", image.file_name, image.len(), url);
        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<HostErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        info!("Uploaded {} to {}", image.file_name, uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}

/// Validate, obtain a signature from the backend, upload, return the URL.
pub async fn upload_poster<A: MovieApi + ?Sized>(
    api: &A,
    uploader: &ImageUploader,
    image: &ImageFile,
) -> Result<String> {
    image.validate()?;
    let signature = api
        .request_upload_signature(&image.signature_request())
        .await?;
    Ok(uploader.upload(image, &signature).await?)
}
