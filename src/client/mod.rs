//! Movie catalog API client

use async_trait::async_trait;

use crate::error::Result;

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod movies;
pub mod pagination;
pub mod rate_limit;

pub use http::HttpClient;
#[cfg(test)]
pub use mock::MockMovieClient;
pub use movies::MovieClient;
pub use pagination::PaginationParams;

use models::{
    ApiInfo, CreateMovieRequest, HealthStatus, LoginRequest, Message, Movie, MoviePage, Session,
    UpdateMovieRequest, UploadSignature, UploadSignatureRequest, UserProfile,
};

/// Catalog backend operations.
///
/// Implemented over HTTP by [`MovieClient`]; the cache layer wraps any
/// implementation.
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Sign in and persist the resulting session
    async fn login(&self, request: &LoginRequest) -> Result<Session>;

    /// Sign out. The local session is cleared whatever the server says.
    async fn logout(&self) -> Result<Message>;

    /// Profile of the signed-in user
    async fn get_profile(&self) -> Result<UserProfile>;

    /// One page of the catalog
    async fn list_movies(&self, params: &PaginationParams) -> Result<MoviePage>;

    async fn get_movie(&self, id: &str) -> Result<Movie>;

    async fn create_movie(&self, request: &CreateMovieRequest) -> Result<Movie>;

    /// Partial update; only present fields are sent
    async fn update_movie(&self, id: &str, request: &UpdateMovieRequest) -> Result<Movie>;

    async fn delete_movie(&self, id: &str) -> Result<Message>;

    /// Signed parameters for a direct upload to the image host
    async fn request_upload_signature(
        &self,
        request: &UploadSignatureRequest,
    ) -> Result<UploadSignature>;

    /// Backend liveness (`GET /`)
    async fn health_check(&self) -> Result<HealthStatus>;

    /// Backend description (`GET /info`)
    async fn api_info(&self) -> Result<ApiInfo>;
}
