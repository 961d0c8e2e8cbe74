//! Cached wrapper for the catalog client
//!
//! Reads go through the [`QueryCache`]; mutations apply the invalidation
//! rules below once the server has confirmed them.
//!
//! | Operation         | Cache effect                                          |
//! |-------------------|-------------------------------------------------------|
//! | login             | write user and profile, remove the movie namespace    |
//! | logout            | remove auth and movie namespaces (even on failure)    |
//! | create            | invalidate every list                                 |
//! | update            | overwrite the detail entry, invalidate every list     |
//! | delete            | remove the detail entry, invalidate every list        |
//! | `SessionExpired`  | remove auth and movie namespaces                      |

use std::future::Future;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use super::key::{Namespace, QueryKey, QueryKind};
use super::store::{Lookup, QueryCache};
use super::TtlPolicy;
use crate::client::models::{
    ApiInfo, CreateMovieRequest, HealthStatus, LoginRequest, Message, Movie, MoviePage, Session,
    SessionUser, UpdateMovieRequest, UploadSignature, UploadSignatureRequest, UserProfile,
};
use crate::client::{MovieApi, PaginationParams};
use crate::config::CacheSettings;
use crate::error::{ApiError, Error, Result};

/// How reads treat an entry that is present but stale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Stale entries are refetched before returning
    #[default]
    CacheFirst,
    /// Stale entries are returned at once and refreshed in the background
    StaleWhileRevalidate,
    /// Always fetch; results still populate the cache (`--no-cache`)
    NetworkOnly,
}

impl FetchPolicy {
    /// Policy for a run: `--no-cache` wins over the configured behaviour
    pub fn select(settings: &CacheSettings, no_cache: bool) -> Self {
        if no_cache {
            FetchPolicy::NetworkOnly
        } else if settings.stale_while_revalidate {
            FetchPolicy::StaleWhileRevalidate
        } else {
            FetchPolicy::CacheFirst
        }
    }
}

/// Caching wrapper for any [`MovieApi`] implementation.
pub struct CachedMovieClient<C: MovieApi> {
    inner: Arc<C>,
    cache: Arc<QueryCache>,
    ttl: TtlPolicy,
    policy: FetchPolicy,
    revalidations: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: MovieApi + 'static> CachedMovieClient<C> {
    pub fn new(inner: Arc<C>, cache: Arc<QueryCache>) -> Self {
        Self {
            inner,
            cache,
            ttl: TtlPolicy::default(),
            policy: FetchPolicy::default(),
            revalidations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Signed-in user, from cache or else from `load` (usually the token store)
    pub fn current_user(&self, load: impl FnOnce() -> Option<SessionUser>) -> Option<SessionUser> {
        let key = QueryKey::auth_user();
        if let Lookup::Fresh(user) = self.cache.get::<SessionUser>(&key) {
            return Some(user);
        }
        let user = load()?;
        self.cache
            .set_data(&key, &user, self.ttl.for_kind(QueryKind::AuthUser));
        Some(user)
    }

    /// Update with the locally patched movie shown until the server answers.
    ///
    /// On failure the detail entry is rolled back to its prior state unless a
    /// newer write has landed in the meantime.
    pub async fn update_movie_optimistic(
        &self,
        id: &str,
        request: &UpdateMovieRequest,
    ) -> Result<Movie> {
        request.validate()?;

        let key = QueryKey::movie_detail(id);
        let ttl = self.ttl.for_kind(QueryKind::MovieDetail);
        let snapshot = self.cache.snapshot(&key);
        let optimistic = match self.cache.get::<Movie>(&key).into_value() {
            Some(current) => Some(self.cache.set_data(&key, &current.patched(request), ttl)),
            None => None,
        };

        match self.inner.update_movie(id, request).await {
            Ok(movie) => {
                self.after_update(&movie);
                Ok(movie)
            }
            Err(e) => {
                if let Some(generation) = optimistic
                    && self.cache.restore(snapshot, generation)
                {
                    debug!("Rolled back optimistic update of {}", key);
                }
                Err(self.observe_error(e))
            }
        }
    }

    /// Drop everything tied to the signed-in user
    pub fn purge_session_data(&self) {
        self.cache.remove_namespace(Namespace::Auth);
        self.cache.remove_namespace(Namespace::Movies);
    }

    fn invalidate_lists(&self) {
        self.cache
            .invalidate_where(|k| k.kind() == QueryKind::MovieList);
    }

    fn after_update(&self, movie: &Movie) {
        self.cache.set_data(
            &QueryKey::movie_detail(&movie.id),
            movie,
            self.ttl.for_kind(QueryKind::MovieDetail),
        );
        self.invalidate_lists();
    }

    /// A dead session takes all per-user data with it
    fn observe_error(&self, error: Error) -> Error {
        if matches!(error, Error::Api(ApiError::SessionExpired)) {
            debug!("Session expired, purging cached user data");
            self.purge_session_data();
        }
        error
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| self.observe_error(e))
    }

    /// Read `key` per the fetch policy, calling `fetch` on a miss or stale hit.
    async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(Arc<C>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if self.policy != FetchPolicy::NetworkOnly {
            match self.cache.get::<T>(&key) {
                Lookup::Fresh(value) => {
                    debug!("Cache hit: {}", key);
                    return Ok(value);
                }
                Lookup::Stale(value) if self.policy == FetchPolicy::StaleWhileRevalidate => {
                    debug!("Cache stale: {}, revalidating in background", key);
                    self.revalidate(key, fetch);
                    return Ok(value);
                }
                Lookup::Stale(_) => debug!("Cache stale: {}", key),
                Lookup::Miss => debug!("Cache miss: {}", key),
            }
        }

        let ttl = self.ttl.for_kind(key.kind());
        let ticket = self.cache.begin_fetch(&key);
        let value = self.observe(fetch(Arc::clone(&self.inner)).await)?;
        self.cache.complete_fetch(ticket, &value, ttl);
        Ok(value)
    }

    /// Wait for background refreshes started by stale reads.
    ///
    /// A short-lived process calls this before exiting so refreshed values
    /// reach the cache.
    pub async fn settle(&self) {
        let pending: Vec<JoinHandle<()>> = {
            let mut revalidations = self
                .revalidations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            revalidations.drain(..).collect()
        };
        for handle in pending {
            if let Err(e) = handle.await {
                debug!("Background refresh did not finish: {}", e);
            }
        }
    }

    fn revalidate<T, F, Fut>(&self, key: QueryKey, fetch: F)
    where
        T: Serialize + Send + 'static,
        F: FnOnce(Arc<C>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        let inner = Arc::clone(&self.inner);
        let ttl = self.ttl.for_kind(key.kind());
        let ticket = cache.begin_fetch(&key);

        let handle = tokio::spawn(async move {
            match fetch(inner).await {
                Ok(value) => {
                    cache.complete_fetch(ticket, &value, ttl);
                }
                Err(Error::Api(ApiError::SessionExpired)) => {
                    cache.remove_namespace(Namespace::Auth);
                    cache.remove_namespace(Namespace::Movies);
                }
                Err(e) => warn!("Background refresh of {} failed: {}", key, e),
            }
        });

        let mut revalidations = self
            .revalidations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        revalidations.retain(|h| !h.is_finished());
        revalidations.push(handle);
    }
}

#[async_trait]
impl<C: MovieApi + 'static> MovieApi for CachedMovieClient<C> {
    async fn login(&self, request: &LoginRequest) -> Result<Session> {
        let session = self.observe(self.inner.login(request).await)?;

        // New session: nothing from a previous user carries over
        self.cache.remove_namespace(Namespace::Movies);
        self.cache.set_data(
            &QueryKey::auth_user(),
            &session.user,
            self.ttl.for_kind(QueryKind::AuthUser),
        );
        self.cache.set_data(
            &QueryKey::auth_profile(),
            &UserProfile::from(session.user.clone()),
            self.ttl.for_kind(QueryKind::AuthProfile),
        );
        Ok(session)
    }

    async fn logout(&self) -> Result<Message> {
        let result = self.inner.logout().await;
        self.purge_session_data();
        result
    }

    async fn get_profile(&self) -> Result<UserProfile> {
        self.query(QueryKey::auth_profile(), |api| async move {
            api.get_profile().await
        })
        .await
    }

    async fn list_movies(&self, params: &PaginationParams) -> Result<MoviePage> {
        let params = *params;
        self.query(QueryKey::movie_list(&params), move |api| async move {
            api.list_movies(&params).await
        })
        .await
    }

    async fn get_movie(&self, id: &str) -> Result<Movie> {
        let id = id.to_string();
        self.query(QueryKey::movie_detail(&id), move |api| async move {
            api.get_movie(&id).await
        })
        .await
    }

    async fn create_movie(&self, request: &CreateMovieRequest) -> Result<Movie> {
        let movie = self.observe(self.inner.create_movie(request).await)?;
        self.invalidate_lists();
        Ok(movie)
    }

    async fn update_movie(&self, id: &str, request: &UpdateMovieRequest) -> Result<Movie> {
        let movie = self.observe(self.inner.update_movie(id, request).await)?;
        self.after_update(&movie);
        Ok(movie)
    }

    async fn delete_movie(&self, id: &str) -> Result<Message> {
        let message = self.observe(self.inner.delete_movie(id).await)?;
        self.cache.remove(&QueryKey::movie_detail(id));
        self.invalidate_lists();
        Ok(message)
    }

    /// Never cached: signatures are single-use
    async fn request_upload_signature(
        &self,
        request: &UploadSignatureRequest,
    ) -> Result<UploadSignature> {
        self.observe(self.inner.request_upload_signature(request).await)
    }

    async fn health_check(&self) -> Result<HealthStatus> {
        self.inner.health_check().await
    }

    async fn api_info(&self) -> Result<ApiInfo> {
        self.inner.api_info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{MockMovieClient, movie, session};
    use std::time::Duration;

    async fn setup(movies: Vec<Movie>) -> (CachedMovieClient<MockMovieClient>, Arc<MockMovieClient>) {
        let mock = Arc::new(MockMovieClient::new().with_movies(movies).await);
        let client = CachedMovieClient::new(Arc::clone(&mock), Arc::new(QueryCache::new()));
        (client, mock)
    }

    fn rename(title: &str) -> UpdateMovieRequest {
        UpdateMovieRequest {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_reads_skip_network() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;

        client.get_movie("m1").await.unwrap();
        client.get_movie("m1").await.unwrap();
        client.list_movies(&PaginationParams::new()).await.unwrap();
        client.list_movies(&PaginationParams::new()).await.unwrap();

        let counts = mock.call_counts().await;
        assert_eq!(counts.get_movie, 1);
        assert_eq!(counts.list_movies, 1);
    }

    #[tokio::test]
    async fn test_lists_cached_per_page() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;

        client.list_movies(&PaginationParams::new().page(1)).await.unwrap();
        client.list_movies(&PaginationParams::new().page(2)).await.unwrap();

        assert_eq!(mock.call_counts().await.list_movies, 2);
    }

    #[tokio::test]
    async fn test_update_writes_detail_without_refetch() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.get_movie("m1").await.unwrap();

        let updated = client.update_movie("m1", &rename("Renamed")).await.unwrap();
        let fetched = client.get_movie("m1").await.unwrap();

        assert_eq!(fetched, updated);
        assert_eq!(fetched.title, "Renamed");
        assert_eq!(mock.call_counts().await.get_movie, 1);
    }

    #[tokio::test]
    async fn test_update_invalidates_lists() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.list_movies(&PaginationParams::new()).await.unwrap();

        client.update_movie("m1", &rename("Renamed")).await.unwrap();
        let page = client.list_movies(&PaginationParams::new()).await.unwrap();

        assert_eq!(page.results[0].title, "Renamed");
        assert_eq!(mock.call_counts().await.list_movies, 2);
    }

    #[tokio::test]
    async fn test_create_invalidates_lists_and_round_trips() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.list_movies(&PaginationParams::new()).await.unwrap();

        let created = client
            .create_movie(&CreateMovieRequest {
                title: "Two".to_string(),
                publishing_year: 2001,
                poster_url: "https://img.example.com/two.jpg".to_string(),
            })
            .await
            .unwrap();

        let page = client.list_movies(&PaginationParams::new()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(mock.call_counts().await.list_movies, 2);

        let fetched = client.get_movie(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_delete_removes_detail() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.get_movie("m1").await.unwrap();

        client.delete_movie("m1").await.unwrap();
        let err = client.get_movie("m1").await.unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::NotFound(_))));
        assert_eq!(mock.call_counts().await.get_movie, 2);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.list_movies(&PaginationParams::new()).await.unwrap();

        mock.fail_next(ApiError::ServerError("boom".to_string())).await;
        assert!(client.delete_movie("m1").await.is_err());

        client.list_movies(&PaginationParams::new()).await.unwrap();
        assert_eq!(mock.call_counts().await.list_movies, 1);
    }

    #[tokio::test]
    async fn test_logout_purges_even_on_failure() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client
            .login(&LoginRequest::new("ada@example.com", "secret", false))
            .await
            .unwrap();
        client.get_movie("m1").await.unwrap();

        mock.fail_next(ApiError::Network("offline".to_string())).await;
        assert!(client.logout().await.is_err());
        assert!(client.cache().is_empty());

        // Already logged out: still fine
        client.logout().await.unwrap();
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_login_seeds_auth_and_drops_movies() {
        let mock = Arc::new(
            MockMovieClient::new()
                .with_movies(vec![movie("m1", "One")])
                .await
                .with_session(session("ada"))
                .await,
        );
        let client = CachedMovieClient::new(Arc::clone(&mock), Arc::new(QueryCache::new()));
        client.get_movie("m1").await.unwrap();

        let session = client
            .login(&LoginRequest::new("ada@example.com", "secret", false))
            .await
            .unwrap();
        let profile = client.get_profile().await.unwrap();
        let user = client.current_user(|| None);

        assert_eq!(profile.id, session.user.id);
        assert_eq!(user, Some(session.user));
        let counts = mock.call_counts().await;
        assert_eq!(counts.get_profile, 0);

        client.get_movie("m1").await.unwrap();
        assert_eq!(mock.call_counts().await.get_movie, 2);
    }

    #[tokio::test]
    async fn test_session_expiry_purges_cache() {
        let (client, mock) = setup(vec![movie("m1", "One"), movie("m2", "Two")]).await;
        client.get_movie("m1").await.unwrap();

        mock.fail_next(ApiError::SessionExpired).await;
        assert!(client.get_movie("m2").await.is_err());

        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_discards_in_flight_fetch() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        mock.delay_next([Duration::from_secs(5)]).await;

        let (fetched, _) = tokio::join!(client.get_movie("m1"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            client.logout().await
        });

        // The caller still gets its answer, the cache does not
        assert!(fetched.is_ok());
        assert!(client.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_resolving_update_wins() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        // "X" resolves after "Y"
        mock.delay_next([Duration::from_secs(3), Duration::from_secs(1)])
            .await;

        let (rx, ry) = (rename("X"), rename("Y"));
        let (x, y) = tokio::join!(
            client.update_movie("m1", &rx),
            client.update_movie("m1", &ry)
        );
        assert!(x.is_ok() && y.is_ok());

        let cached = client.get_movie("m1").await.unwrap();
        assert_eq!(cached.title, "X");
        assert_eq!(mock.call_counts().await.get_movie, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_refetched_cache_first() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.get_movie("m1").await.unwrap();

        mock.put_movie(movie("m1", "Changed elsewhere")).await;
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        let fetched = client.get_movie("m1").await.unwrap();
        assert_eq!(fetched.title, "Changed elsewhere");
        assert_eq!(mock.call_counts().await.get_movie, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_while_revalidate() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        let client = client.with_policy(FetchPolicy::StaleWhileRevalidate);
        client.get_movie("m1").await.unwrap();

        mock.put_movie(movie("m1", "Changed elsewhere")).await;
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        let served = client.get_movie("m1").await.unwrap();
        assert_eq!(served.title, "One");

        client.settle().await;
        let refreshed = client.get_movie("m1").await.unwrap();
        assert_eq!(refreshed.title, "Changed elsewhere");
        assert_eq!(mock.call_counts().await.get_movie, 2);
    }

    #[test]
    fn test_policy_selection() {
        let mut settings = CacheSettings::default();
        assert_eq!(FetchPolicy::select(&settings, false), FetchPolicy::CacheFirst);

        settings.stale_while_revalidate = true;
        assert_eq!(
            FetchPolicy::select(&settings, false),
            FetchPolicy::StaleWhileRevalidate
        );
        assert_eq!(FetchPolicy::select(&settings, true), FetchPolicy::NetworkOnly);
    }

    #[tokio::test]
    async fn test_network_only_always_fetches() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        let client = client.with_policy(FetchPolicy::NetworkOnly);

        client.get_movie("m1").await.unwrap();
        client.get_movie("m1").await.unwrap();

        assert_eq!(mock.call_counts().await.get_movie, 2);
        assert_eq!(client.cache().stats().total, 1);
    }

    #[tokio::test]
    async fn test_optimistic_update_success() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.get_movie("m1").await.unwrap();

        let updated = client
            .update_movie_optimistic("m1", &rename("Renamed"))
            .await
            .unwrap();

        assert_eq!(client.get_movie("m1").await.unwrap(), updated);
        assert_eq!(mock.call_counts().await.get_movie, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimistic_update_visible_then_rolled_back() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;
        client.get_movie("m1").await.unwrap();
        mock.delay_next([Duration::from_secs(2)]).await;
        mock.fail_next(ApiError::ServerError("boom".to_string()))
            .await;

        let request = rename("Renamed");
        let (result, during) = tokio::join!(
            client.update_movie_optimistic("m1", &request),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                client.get_movie("m1").await
            }
        );

        assert_eq!(during.unwrap().title, "Renamed");
        assert!(result.is_err());
        assert_eq!(client.get_movie("m1").await.unwrap().title, "One");
        assert_eq!(mock.call_counts().await.get_movie, 1);
    }

    #[tokio::test]
    async fn test_optimistic_update_validates_first() {
        let (client, mock) = setup(vec![movie("m1", "One")]).await;

        let err = client
            .update_movie_optimistic("m1", &UpdateMovieRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(mock.call_counts().await.update_movie, 0);
    }
}
