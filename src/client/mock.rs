//! Mock catalog client for testing
//!
//! An in-memory implementation of [`MovieApi`] that counts calls, can inject
//! one-shot errors and can delay individual calls so tests can interleave
//! concurrent requests deterministically.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::MovieApi;
use super::models::{
    ApiInfo, CreateMovieRequest, HealthStatus, LoginRequest, Message, Movie, MoviePage, Session,
    SessionUser, UpdateMovieRequest, UploadSignature, UploadSignatureRequest, UserProfile,
};
use super::pagination::{PaginationParams, page_count};
use crate::error::{ApiError, Result};

/// Mock API client for testing.
///
/// # Example
/// ```ignore
/// let mock = MockMovieClient::new().with_movies(vec![movie("m1")]).await;
/// let page = mock.list_movies(&PaginationParams::new()).await?;
/// assert_eq!(mock.call_counts().await.list_movies, 1);
/// ```
#[derive(Default)]
pub struct MockMovieClient {
    /// Catalog contents, ordered by id
    movies: Arc<Mutex<BTreeMap<String, Movie>>>,
    /// Session handed out by login
    session: Arc<Mutex<Option<Session>>>,
    /// Error to return (if any), consumed on first use
    error: Arc<Mutex<Option<ApiError>>>,
    /// Per-call delays, consumed front to back
    delays: Arc<Mutex<VecDeque<Duration>>>,
    /// Track number of calls for verification
    call_count: Arc<Mutex<CallCounts>>,
    /// Sequence for generated ids
    next_id: Arc<Mutex<u64>>,
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub login: usize,
    pub logout: usize,
    pub get_profile: usize,
    pub list_movies: usize,
    pub get_movie: usize,
    pub create_movie: usize,
    pub update_movie: usize,
    pub delete_movie: usize,
    pub request_upload_signature: usize,
    pub health_check: usize,
    pub api_info: usize,
}

impl CallCounts {
    /// Get total number of API calls made.
    pub fn total(&self) -> usize {
        self.login
            + self.logout
            + self.get_profile
            + self.list_movies
            + self.get_movie
            + self.create_movie
            + self.update_movie
            + self.delete_movie
            + self.request_upload_signature
            + self.health_check
            + self.api_info
    }
}

/// Movie fixture with a predictable poster URL
pub fn movie(id: &str, title: &str) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        publishing_year: 2000,
        poster_url: format!("https://img.example.com/{}.jpg", id),
        created_at: None,
        updated_at: None,
    }
}

/// Session fixture for `user_id`
pub fn session(user_id: &str) -> Session {
    Session {
        access_token: format!("at-{}", user_id),
        refresh_token: format!("rt-{}", user_id),
        user: SessionUser {
            id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            name: user_id.to_uppercase(),
        },
    }
}

impl MockMovieClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog.
    pub async fn with_movies(self, movies: Vec<Movie>) -> Self {
        let mut map = self.movies.lock().await;
        for movie in movies {
            map.insert(movie.id.clone(), movie);
        }
        drop(map);
        self
    }

    /// Configure the session returned by login.
    pub async fn with_session(self, session: Session) -> Self {
        *self.session.lock().await = Some(session);
        self
    }

    /// Configure an error to return on the next API call.
    pub async fn with_error(self, error: ApiError) -> Self {
        self.fail_next(error).await;
        self
    }

    /// Arm a one-shot error on an already-built mock.
    pub async fn fail_next(&self, error: ApiError) {
        *self.error.lock().await = Some(error);
    }

    /// Queue delays applied to the next calls, one per call.
    pub async fn delay_next(&self, delays: impl IntoIterator<Item = Duration>) {
        self.delays.lock().await.extend(delays);
    }

    /// Get the call counts for verification in tests.
    pub async fn call_counts(&self) -> CallCounts {
        self.call_count.lock().await.clone()
    }

    /// Current server-side state of one movie
    pub async fn stored_movie(&self, id: &str) -> Option<Movie> {
        self.movies.lock().await.get(id).cloned()
    }

    /// Change a movie behind the client's back (another user's edit).
    pub async fn put_movie(&self, movie: Movie) {
        self.movies.lock().await.insert(movie.id.clone(), movie);
    }

    /// Count the call, wait out any queued delay, then surface a pending error.
    async fn enter(&self, record: impl FnOnce(&mut CallCounts)) -> Result<()> {
        record(&mut *self.call_count.lock().await);

        let delay = self.delays.lock().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(e) = self.error.lock().await.take() {
            return Err(e.into());
        }
        Ok(())
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::NotFound(format!("Movie with ID {} not found", id))
    }
}

#[async_trait]
impl MovieApi for MockMovieClient {
    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        request.validate()?;
        self.enter(|c| c.login += 1).await?;

        let session = self.session.lock().await.clone();
        Ok(session.unwrap_or_else(|| session_for(&request.email)))
    }

    async fn logout(&self) -> Result<Message> {
        self.enter(|c| c.logout += 1).await?;
        Ok(Message {
            message: "Logged out successfully".to_string(),
        })
    }

    async fn get_profile(&self) -> Result<UserProfile> {
        self.enter(|c| c.get_profile += 1).await?;

        let session = self.session.lock().await.clone();
        let user = session.map(|s| s.user).ok_or(ApiError::Unauthorized)?;
        Ok(UserProfile::from(user))
    }

    async fn list_movies(&self, params: &PaginationParams) -> Result<MoviePage> {
        self.enter(|c| c.list_movies += 1).await?;

        let movies = self.movies.lock().await;
        let total = movies.len() as u64;
        let skip = (params.page.saturating_sub(1) as usize) * params.limit as usize;
        let results = movies
            .values()
            .skip(skip)
            .take(params.limit as usize)
            .cloned()
            .collect();

        Ok(MoviePage {
            results,
            total,
            page: params.page,
            last_page: page_count(total, params.limit),
        })
    }

    async fn get_movie(&self, id: &str) -> Result<Movie> {
        self.enter(|c| c.get_movie += 1).await?;

        let movie = self.movies.lock().await.get(id).cloned();
        movie.ok_or_else(|| Self::not_found(id).into())
    }

    async fn create_movie(&self, request: &CreateMovieRequest) -> Result<Movie> {
        request.validate()?;
        self.enter(|c| c.create_movie += 1).await?;

        let id = {
            let mut next = self.next_id.lock().await;
            *next += 1;
            format!("new-{}", *next)
        };
        let movie = Movie {
            id: id.clone(),
            title: request.title.trim().to_string(),
            publishing_year: request.publishing_year,
            poster_url: request.poster_url.clone(),
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        };
        self.movies.lock().await.insert(id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, id: &str, request: &UpdateMovieRequest) -> Result<Movie> {
        request.validate()?;
        self.enter(|c| c.update_movie += 1).await?;

        let mut movies = self.movies.lock().await;
        let current = movies.get(id).ok_or_else(|| Self::not_found(id))?;
        let updated = current.patched(request);
        movies.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete_movie(&self, id: &str) -> Result<Message> {
        self.enter(|c| c.delete_movie += 1).await?;

        match self.movies.lock().await.remove(id) {
            Some(_) => Ok(Message {
                message: "Movie deleted successfully".to_string(),
            }),
            None => Err(Self::not_found(id).into()),
        }
    }

    async fn request_upload_signature(
        &self,
        _request: &UploadSignatureRequest,
    ) -> Result<UploadSignature> {
        self.enter(|c| c.request_upload_signature += 1).await?;

        Ok(UploadSignature {
            signature: "mock-signature".to_string(),
            timestamp: 1_700_000_000,
            folder: "movies".to_string(),
            cloud_name: "mock-cloud".to_string(),
        })
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        self.enter(|c| c.health_check += 1).await?;

        Ok(HealthStatus {
            status: "ok".to_string(),
            timestamp: None,
            uptime: Some(1.0),
            environment: Some("test".to_string()),
        })
    }

    async fn api_info(&self) -> Result<ApiInfo> {
        self.enter(|c| c.api_info += 1).await?;

        Ok(ApiInfo {
            name: "Movie API".to_string(),
            version: "1.0.0".to_string(),
            description: "Mock catalog".to_string(),
            endpoints: BTreeMap::new(),
        })
    }
}

fn session_for(email: &str) -> Session {
    let user_id = email.split('@').next().unwrap_or("user");
    let mut session = session(user_id);
    session.user.email = email.to_string();
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockMovieClient::new()
            .with_movies(vec![movie("m1", "One"), movie("m2", "Two")])
            .await;

        let page = mock.list_movies(&PaginationParams::new()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.last_page, 1);

        mock.get_movie("m1").await.unwrap();

        let counts = mock.call_counts().await;
        assert_eq!(counts.list_movies, 1);
        assert_eq!(counts.get_movie, 1);
        assert_eq!(counts.total(), 2);
    }

    #[tokio::test]
    async fn test_mock_error_consumed_once() {
        let mock = MockMovieClient::new()
            .with_movies(vec![movie("m1", "One")])
            .await
            .with_error(ApiError::ServerError("boom".to_string()))
            .await;

        assert!(matches!(
            mock.get_movie("m1").await,
            Err(Error::Api(ApiError::ServerError(_)))
        ));
        assert!(mock.get_movie("m1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_pagination() {
        let movies = (1..=25)
            .map(|i| movie(&format!("m{:02}", i), "Title"))
            .collect();
        let mock = MockMovieClient::new().with_movies(movies).await;

        let page = mock
            .list_movies(&PaginationParams::new().page(3))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 5);
        assert_eq!(page.last_page, 3);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_login_then_page_past_the_end_is_empty() {
        let movies = (1..=23)
            .map(|i| movie(&format!("m{:02}", i), "Title"))
            .collect();
        let mock = MockMovieClient::new().with_movies(movies).await;

        let session = mock
            .login(&LoginRequest::new("a@b.com", "secret", false))
            .await
            .unwrap();
        assert_eq!(session.user.email, "a@b.com");
        assert!(!session.access_token.is_empty());

        let params = PaginationParams::new().page(1).limit(10);
        let first = mock.list_movies(&params).await.unwrap();
        assert_eq!(first.last_page, crate::client::pagination::page_count(23, 10));
        assert_eq!(first.last_page, 3);

        let past = mock
            .list_movies(&params.page(first.last_page + 1))
            .await
            .unwrap();
        assert!(past.results.is_empty());
        assert_eq!(past.total, 23);
    }
}
