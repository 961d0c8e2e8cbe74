//! Movie models and client-side validation

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Year of the first motion picture; nothing older is accepted
pub const MIN_PUBLISHING_YEAR: i32 = 1888;

/// Longest title the backend stores
pub const MAX_TITLE_LEN: usize = 255;

/// Latest acceptable publishing year (next calendar year)
pub fn max_publishing_year() -> i32 {
    Utc::now().year() + 1
}

/// Movie record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Movie ID (`_id` on the wire)
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    pub title: String,

    pub publishing_year: i32,

    /// Hosted poster image URL
    pub poster_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Movie {
    /// Copy of this movie with the given partial update applied locally
    pub fn patched(&self, update: &UpdateMovieRequest) -> Movie {
        let mut movie = self.clone();
        if let Some(ref title) = update.title {
            movie.title = title.clone();
        }
        if let Some(year) = update.publishing_year {
            movie.publishing_year = year;
        }
        if let Some(ref url) = update.poster_url {
            movie.poster_url = url.clone();
        }
        movie
    }
}

/// Body of `POST /movies`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub title: String,
    pub publishing_year: i32,
    pub poster_url: String,
}

impl CreateMovieRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_year(self.publishing_year)?;
        validate_poster_url(&self.poster_url)
    }
}

/// Body of `PATCH /movies/{id}`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishing_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

impl UpdateMovieRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.publishing_year.is_none() && self.poster_url.is_none()
    }

    /// Validate only the fields being changed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(year) = self.publishing_year {
            validate_year(year)?;
        }
        if let Some(ref url) = self.poster_url {
            validate_poster_url(url)?;
        }
        Ok(())
    }
}

/// One page of `GET /movies`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePage {
    pub results: Vec<Movie>,
    pub total: u64,
    pub page: u32,
    pub last_page: u32,
}

impl MoviePage {
    /// Whether a later page exists
    pub fn has_next(&self) -> bool {
        self.page < self.last_page
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(())
}

fn validate_year(year: i32) -> Result<(), ValidationError> {
    let max = max_publishing_year();
    if !(MIN_PUBLISHING_YEAR..=max).contains(&year) {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: MIN_PUBLISHING_YEAR,
            max,
        });
    }
    Ok(())
}

fn validate_poster_url(url: &str) -> Result<(), ValidationError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ValidationError::InvalidPosterUrl(url.to_string())),
    }
}
