//! HTTP implementation of [`MovieApi`]

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use super::http::{ApiRequest, HttpClient};
use super::models::{
    ApiInfo, CreateMovieRequest, HealthStatus, LoginRequest, Message, Movie, MoviePage, Session,
    UpdateMovieRequest, UploadSignature, UploadSignatureRequest, UserProfile,
};
use super::pagination::PaginationParams;
use super::MovieApi;
use crate::error::{ApiError, Error, Result, ValidationError};
use crate::session::TokenStore;

/// Catalog API client over [`HttpClient`]
pub struct MovieClient {
    http: HttpClient,
}

impl MovieClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        self.http.store()
    }
}

/// Movie id checked for use as the path segment after `/movies`
fn movie_id(id: &str) -> Result<&str> {
    // Dot segments would be resolved away by the URL parser
    if id.is_empty() || id == "." || id == ".." {
        return Err(ValidationError::InvalidMovieId(id.to_string()).into());
    }
    Ok(id)
}

#[async_trait]
impl MovieApi for MovieClient {
    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        request.validate()?;

        let session: Session = self
            .http
            .send(
                ApiRequest::post("/auth/login")
                    .json(request)?
                    .without_refresh(),
            )
            .await
            .map_err(|e| match e {
                Error::Api(ApiError::Unauthorized) => {
                    ApiError::InvalidCredentials(request.email.clone()).into()
                }
                other => other,
            })?;

        self.http.store().set_session(&session)?;
        self.http.remember_refresh_token(&session.refresh_token);
        info!("Logged in as {}", session.user.email);
        Ok(session)
    }

    async fn logout(&self) -> Result<Message> {
        let result = match ApiRequest::post("/auth/logout").json(&serde_json::json!({})) {
            Ok(request) => self.http.send::<Message>(request).await,
            Err(e) => Err(e),
        };
        // Local session goes away no matter how the server answered
        self.http.clear_session();
        if let Err(ref e) = result {
            debug!("Server-side logout failed: {}", e);
        }
        result
    }

    async fn get_profile(&self) -> Result<UserProfile> {
        self.http.send(ApiRequest::get("/auth/profile")).await
    }

    async fn list_movies(&self, params: &PaginationParams) -> Result<MoviePage> {
        self.http
            .send(ApiRequest::get("/movies").query(params.to_query_params()))
            .await
    }

    async fn get_movie(&self, id: &str) -> Result<Movie> {
        self.http
            .send(ApiRequest::get("/movies").segment(movie_id(id)?))
            .await
    }

    async fn create_movie(&self, request: &CreateMovieRequest) -> Result<Movie> {
        request.validate()?;
        self.http
            .send(ApiRequest::post("/movies").json(request)?)
            .await
    }

    async fn update_movie(&self, id: &str, request: &UpdateMovieRequest) -> Result<Movie> {
        request.validate()?;
        self.http
            .send(
                ApiRequest::patch("/movies")
                    .segment(movie_id(id)?)
                    .json(request)?,
            )
            .await
    }

    async fn delete_movie(&self, id: &str) -> Result<Message> {
        self.http
            .send(ApiRequest::delete("/movies").segment(movie_id(id)?))
            .await
    }

    async fn request_upload_signature(
        &self,
        request: &UploadSignatureRequest,
    ) -> Result<UploadSignature> {
        self.http
            .send(ApiRequest::post("/s3/upload-url").json(request)?)
            .await
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        self.http.send(ApiRequest::get("/")).await
    }

    async fn api_info(&self) -> Result<ApiInfo> {
        self.http.send(ApiRequest::get("/info")).await
    }
}
