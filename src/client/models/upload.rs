//! Upload signature models

use serde::{Deserialize, Serialize};

/// Body of `POST /s3/upload-url`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignatureRequest {
    pub file_name: String,
    pub file_type: String,
}

/// Single-use authorization for one direct upload to the image host.
///
/// Never persisted; consumed by [`crate::upload::ImageUploader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSignature {
    pub signature: String,
    pub timestamp: i64,
    /// Upload preset / destination folder on the image host
    pub folder: String,
    pub cloud_name: String,
}
