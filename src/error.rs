//! Error types for the Cinedex CLI

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Cinedex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

impl Error {
    /// The API error behind this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors returned by the movie catalog backend or the transport to it
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Run `cinedex login` to sign in.")]
    Unauthorized,

    #[error("Login failed for {0}: invalid email or password")]
    InvalidCredentials(String),

    #[error("Your session has expired. Run `cinedex login` to sign in again.")]
    SessionExpired,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Whether retrying the same call later may succeed.
    ///
    /// Transport failures and 5xx responses are retryable; auth, validation
    /// and not-found outcomes are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::ServerError(_) | ApiError::RateLimit(_)
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Client-side validation failures, raised before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Title must be at most {max} characters")]
    TitleTooLong { max: usize },

    #[error("Publishing year {year} must be between {min} and {max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("Poster URL is not a valid http(s) URL: {0}")]
    InvalidPosterUrl(String),

    #[error("A poster is required: pass --poster URL or --poster-file PATH")]
    MissingPoster,

    #[error("Invalid movie id '{0}'")]
    InvalidMovieId(String),

    #[error("Nothing to update: provide at least one field")]
    EmptyUpdate,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password is required")]
    EmptyPassword,

    #[error("Unsupported image type for {0} (expected jpg, png, gif or webp)")]
    UnsupportedImageType(String),

    #[error("Image is {size} bytes, larger than the {max} byte limit")]
    ImageTooLarge { size: u64, max: u64 },

    #[error("Image file is empty")]
    EmptyImage,
}

/// Poster upload failures, reported separately from movie-save failures
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("Invalid image host response: {0}")]
    InvalidResponse(String),

    #[error("Upload API key not configured. Set `upload.api_key` or CINEDEX_UPLOAD_API_KEY.")]
    MissingApiKey,
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Durable session storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Session database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Session storage I/O error: {0}")]
    Io(String),

    #[error("Failed to encode session data: {0}")]
    Serialize(String),
}
