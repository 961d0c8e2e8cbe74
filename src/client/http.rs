//! Authenticated HTTP transport for the catalog API
//!
//! Every request picks up the current access token from the [`TokenStore`]
//! right before it is sent. A 401 triggers one token refresh and one
//! re-send of the original request; concurrent 401s share a single
//! in-flight refresh call.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::{debug, warn};
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::models::RefreshResponse;
use super::rate_limit::ReactiveRateLimiter;
use crate::error::{ApiError, Result};
use crate::session::{REFRESH_TOKEN_KEY, TokenStore};

/// Path of the token renewal endpoint
const REFRESH_PATH: &str = "/auth/refresh";

type SharedRefresh = Shared<BoxFuture<'static, Option<String>>>;

/// Description of one API call, replayable for the post-refresh retry
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    refresh_on_unauthorized: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
            refresh_on_unauthorized: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment, percent-encoded so it cannot leave its place
    /// in the path (`/`, `?` and `#` are escaped).
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append query parameters
    pub fn query<K: Into<String>, V: Into<String>>(
        mut self,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Surface 401 directly instead of refreshing (login, refresh itself)
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }
}

/// Backend error payload: `{"message": "..." | ["...", ...], "error": "..."}`
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<ErrorMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

/// Pulls a human-readable message out of an error response body
fn error_message(body: &str, fallback: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(ErrorMessage::One(msg)),
            ..
        }) => msg,
        Ok(ErrorBody {
            message: Some(ErrorMessage::Many(msgs)),
            ..
        }) if !msgs.is_empty() => msgs.join("; "),
        Ok(ErrorBody {
            error: Some(err), ..
        }) => err,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => fallback.to_string(),
    }
}

/// Everything the refresh call needs, detached from `&self` so the shared
/// future can be `'static`.
#[derive(Clone)]
struct Refresher {
    http: Client,
    url: String,
    store: Arc<TokenStore>,
}

impl Refresher {
    /// Issue `POST /auth/refresh`; the refresh token rides in the cookie jar.
    async fn run(self) -> Option<String> {
        let response = match self
            .http
            .post(&self.url)
            .json(&serde_json::json!({}))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Token refresh transport failure: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Token refresh rejected with {}", response.status());
            return None;
        }

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Token refresh returned an unreadable body: {}", e);
                return None;
            }
        };

        if let Err(e) = self.store.set_access_token(&body.access_token) {
            warn!("Refreshed token could not be persisted: {}", e);
        }
        Some(body.access_token)
    }
}

/// HTTP client wrapper with bearer attachment and refresh-and-retry
pub struct HttpClient {
    http: Client,
    base_url: String,
    store: Arc<TokenStore>,
    jar: Arc<Jar>,
    refresh_slot: Arc<Mutex<Option<SharedRefresh>>>,
    rate_limiter: ReactiveRateLimiter,
}

impl HttpClient {
    /// Create a client for `base_url` reading credentials from `store`
    pub fn new(base_url: &str, store: Arc<TokenStore>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| ApiError::Network(format!("Invalid API URL '{}': {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let client = Self {
            http,
            base_url,
            store,
            jar,
            refresh_slot: Arc::new(Mutex::new(None)),
            rate_limiter: ReactiveRateLimiter::default(),
        };

        // A session persisted by an earlier run still needs its cookie
        if let Some(refresh_token) = client.store.refresh_token() {
            client.remember_refresh_token(&refresh_token);
        }

        Ok(client)
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    fn refresh_url(&self) -> String {
        format!("{}{}", self.base_url, REFRESH_PATH)
    }

    /// Put the refresh token into the cookie jar, scoped to the refresh
    /// endpoint so no other request carries it
    pub fn remember_refresh_token(&self, token: &str) {
        if let Ok(url) = Url::parse(&self.refresh_url()) {
            self.jar.add_cookie_str(
                &format!("{}={}; Path={}; HttpOnly", REFRESH_TOKEN_KEY, token, url.path()),
                &url,
            );
        }
    }

    /// Expire the refresh cookie
    pub fn forget_refresh_token(&self) {
        if let Ok(url) = Url::parse(&self.refresh_url()) {
            self.jar.add_cookie_str(
                &format!("{}=; Path={}; Max-Age=0", REFRESH_TOKEN_KEY, url.path()),
                &url,
            );
        }
    }

    /// Drop every trace of the session: stored tokens, user and cookie
    pub fn clear_session(&self) {
        self.store.clear();
        self.forget_refresh_token();
    }

    /// Obtain a new access token, joining an in-flight refresh if one exists.
    ///
    /// Returns `None` when the refresh fails for any reason.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let shared = {
            let mut slot = self.refresh_slot.lock().await;
            match slot.as_ref() {
                Some(in_flight) => {
                    debug!("Joining in-flight token refresh");
                    in_flight.clone()
                }
                None => {
                    let refresher = Refresher {
                        http: self.http.clone(),
                        url: self.refresh_url(),
                        store: Arc::clone(&self.store),
                    };
                    let slot_handle = Arc::clone(&self.refresh_slot);
                    let fut = async move {
                        let token = refresher.run().await;
                        slot_handle.lock().await.take();
                        token
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        shared.await
    }

    /// Send a request and decode its JSON response.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let sent_token = self.store.access_token();
        let response = self.dispatch(&request, sent_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !request.refresh_on_unauthorized {
            return self.handle_response(response).await;
        }

        // The request is now on its single retry
        debug!(
            "401 from {} {}, refreshing access token",
            request.method, request.path
        );
        let new_token = match self.store.access_token() {
            // Another caller already renewed the token after ours was sent
            Some(current) if sent_token.as_deref() != Some(current.as_str()) => Some(current),
            _ => self.refresh_access_token().await,
        };

        let Some(new_token) = new_token else {
            log::info!("Token refresh failed, ending session");
            self.clear_session();
            return Err(ApiError::SessionExpired.into());
        };

        let retry = self.dispatch(&request, Some(&new_token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }
        self.handle_response(retry).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        self.rate_limiter.wait_if_active().await;

        let url = self.request_url(request)?;
        let mut builder = self.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(ApiError::from)?;
        debug!(
            "{} {} -> {}",
            request.method,
            url.path(),
            response.status()
        );
        Ok(response)
    }

    fn request_url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| ApiError::Network(format!("Invalid request URL: {}", e)))?;
        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| {
                    ApiError::Network(format!("API URL '{}' cannot take a path", self.base_url))
                })?
                .extend(&request.segments);
        }
        Ok(url)
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await.map_err(ApiError::from)?;
            let data = serde_json::from_slice::<T>(&bytes).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
            })?;
            return Ok(data);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        let err = match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
            StatusCode::FORBIDDEN => ApiError::Forbidden,
            StatusCode::NOT_FOUND => ApiError::NotFound(error_message(&body, "Resource not found")),
            StatusCode::CONFLICT => ApiError::Conflict(error_message(&body, "Conflict")),
            StatusCode::TOO_MANY_REQUESTS => {
                self.rate_limiter.activate();
                ApiError::RateLimit(Duration::from_secs(retry_after.unwrap_or(60)))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::BadRequest(error_message(&body, "Bad request"))
            }
            status if status.is_server_error() => {
                ApiError::ServerError(error_message(&body, &format!("Server error: {}", status)))
            }
            _ => ApiError::InvalidResponse(format!("Unexpected status code: {}", status)),
        };
        Err(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::{Session, SessionUser};
    use crate::error::Error;
    use mockito::{Matcher, Server};

    const MOVIE_BODY: &str = r#"{"_id":"m1","title":"Metropolis","publishingYear":1927,"posterUrl":"https://img.example.com/m1.jpg"}"#;

    #[derive(Debug, Deserialize, PartialEq)]
    struct MovieStub {
        #[serde(rename = "_id")]
        id: String,
        title: String,
    }

    fn logged_in_store(access: &str) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::in_memory());
        store
            .set_session(&Session {
                access_token: access.to_string(),
                refresh_token: "rt-1".to_string(),
                user: SessionUser {
                    id: "u1".to_string(),
                    email: "a@b.com".to_string(),
                    name: "Ada".to_string(),
                },
            })
            .unwrap();
        store
    }

    fn client(server: &Server, store: Arc<TokenStore>) -> HttpClient {
        HttpClient::new(&server.url(), store, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(error_message(r#"{"message":"Movie not found"}"#, "x"), "Movie not found");
        assert_eq!(
            error_message(r#"{"message":["title should not be empty","year too small"]}"#, "x"),
            "title should not be empty; year too small"
        );
        assert_eq!(error_message(r#"{"error":"Bad Request"}"#, "x"), "Bad Request");
        assert_eq!(error_message("", "fallback"), "fallback");
        assert_eq!(error_message("plain text", "fallback"), "plain text");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let store = Arc::new(TokenStore::in_memory());
        assert!(HttpClient::new("not a url", store, Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/movies/m1")
            .match_header("authorization", "Bearer at-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(MOVIE_BODY)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("at-1"));
        let movie: MovieStub = http.send(ApiRequest::get("/movies/m1")).await.unwrap();

        assert_eq!(movie.id, "m1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_token_no_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let http = client(&server, Arc::new(TokenStore::in_memory()));
        let _: serde_json::Value = http.send(ApiRequest::get("/")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_and_retry_matches_first_try_result() {
        let mut server = Server::new_async().await;
        let _expired = server
            .mock("GET", "/movies/m1")
            .match_header("authorization", "Bearer old")
            .with_status(401)
            .with_body(r#"{"message":"Unauthorized","statusCode":401}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/movies/m1")
            .match_header("authorization", "Bearer new")
            .with_status(200)
            .with_body(MOVIE_BODY)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", Matcher::Regex("refreshToken=rt-1".to_string()))
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"accessToken":"new"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = logged_in_store("old");
        let http = client(&server, Arc::clone(&store));

        let retried: MovieStub = http.send(ApiRequest::get("/movies/m1")).await.unwrap();
        // Same request with a valid token on the first attempt
        let direct: MovieStub = http.send(ApiRequest::get("/movies/m1")).await.unwrap();

        assert_eq!(retried, direct);
        assert_eq!(store.access_token().as_deref(), Some("new"));
        assert_eq!(store.refresh_token().as_deref(), Some("rt-1"));
        refresh.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_failure_clears_session() {
        let mut server = Server::new_async().await;
        let _expired = server
            .mock("GET", "/auth/profile")
            .with_status(401)
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_body(r#"{"message":"Invalid refresh token"}"#)
            .create_async()
            .await;

        let store = logged_in_store("old");
        let http = client(&server, Arc::clone(&store));

        let err = http
            .send::<serde_json::Value>(ApiRequest::get("/auth/profile"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::SessionExpired)));
        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_hard_failure() {
        let mut server = Server::new_async().await;
        let protected = server
            .mock("GET", "/auth/profile")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"new"}"#)
            .expect(1)
            .create_async()
            .await;

        let store = logged_in_store("old");
        let http = client(&server, Arc::clone(&store));

        let err = http
            .send::<serde_json::Value>(ApiRequest::get("/auth/profile"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));
        // Only one retry and one refresh
        protected.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(store.access_token().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_share_one_refresh() {
        use std::io::Write;

        let mut server = Server::new_async().await;
        let _expired = server
            .mock("GET", Matcher::Regex(r"^/movies/m\d$".to_string()))
            .match_header("authorization", "Bearer old")
            .with_status(401)
            .expect_at_least(1)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", Matcher::Regex(r"^/movies/m\d$".to_string()))
            .match_header("authorization", "Bearer new")
            .with_status(200)
            .with_body(MOVIE_BODY)
            .expect(5)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_millis(100));
                w.write_all(br#"{"accessToken":"new"}"#)
            })
            .expect(1)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("old"));
        let calls = (1..=5).map(|i| http.send::<MovieStub>(ApiRequest::get(format!("/movies/m{}", i))));
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_cookie_only_sent_to_refresh_endpoint() {
        let mut server = Server::new_async().await;
        let _expired = server
            .mock("GET", "/movies/m1")
            .match_header("authorization", "Bearer old")
            .with_status(401)
            .create_async()
            .await;
        let movie = server
            .mock("GET", "/movies/m1")
            .match_header("authorization", "Bearer new")
            .match_header("cookie", Matcher::Missing)
            .with_status(200)
            .with_body(MOVIE_BODY)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .match_header("cookie", Matcher::Regex("refreshToken=rt-1".to_string()))
            .with_status(200)
            .with_body(r#"{"accessToken":"new"}"#)
            .expect(1)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("old"));
        let _: MovieStub = http.send(ApiRequest::get("/movies/m1")).await.unwrap();

        refresh.assert_async().await;
        movie.assert_async().await;
    }

    #[tokio::test]
    async fn test_segments_are_percent_encoded() {
        let mut server = Server::new_async().await;
        let escaped = server
            .mock("GET", "/movies/..%2Fauth%2Fprofile%3Fx")
            .with_status(200)
            .with_body(MOVIE_BODY)
            .expect(1)
            .create_async()
            .await;
        let elsewhere = server
            .mock("GET", "/auth/profile")
            .expect(0)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("at"));
        let _: MovieStub = http
            .send(ApiRequest::get("/movies").segment("../auth/profile?x"))
            .await
            .unwrap();

        escaped.assert_async().await;
        elsewhere.assert_async().await;
    }

    #[tokio::test]
    async fn test_without_refresh_surfaces_unauthorized() {
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"message":"Invalid credentials"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let http = client(&server, Arc::new(TokenStore::in_memory()));
        let err = http
            .send::<serde_json::Value>(ApiRequest::post("/auth/login").without_refresh())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/movies/gone")
            .with_status(404)
            .with_body(r#"{"message":"Movie with ID gone not found"}"#)
            .create_async()
            .await;
        let _invalid = server
            .mock("POST", "/movies")
            .with_status(400)
            .with_body(r#"{"message":["title must be a string"]}"#)
            .create_async()
            .await;
        let _busy = server
            .mock("GET", "/movies")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;
        let _broken = server
            .mock("DELETE", "/movies/m1")
            .with_status(503)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("at"));

        let err = http
            .send::<serde_json::Value>(ApiRequest::get("/movies/gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::NotFound(ref m)) if m.contains("gone")));

        let err = http
            .send::<serde_json::Value>(ApiRequest::post("/movies"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::BadRequest(ref m)) if m.contains("title")));

        let err = http
            .send::<serde_json::Value>(ApiRequest::get("/movies"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::RateLimit(d)) if d == Duration::from_secs(7)));
        assert!(http.rate_limiter.is_active());

        let err = http
            .send::<serde_json::Value>(ApiRequest::delete("/movies/m1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(_))));
    }

    #[tokio::test]
    async fn test_query_and_body_are_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/movies/m1")
            .match_query(Matcher::UrlEncoded("dry".to_string(), "1".to_string()))
            .match_body(Matcher::Json(serde_json::json!({"title": "X"})))
            .with_status(200)
            .with_body(MOVIE_BODY)
            .create_async()
            .await;

        let http = client(&server, logged_in_store("at"));
        let request = ApiRequest::patch("/movies/m1")
            .query([("dry", "1")])
            .json(&serde_json::json!({"title": "X"}))
            .unwrap();
        let _: MovieStub = http.send(request).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let store = Arc::new(TokenStore::in_memory());
        let http = HttpClient::new("http://127.0.0.1:1", store, Duration::from_secs(2)).unwrap();

        let err = http
            .send::<serde_json::Value>(ApiRequest::get("/"))
            .await
            .unwrap_err();

        match err {
            Error::Api(api) => assert!(api.is_retryable()),
            other => panic!("Expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/movies/m1")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let http = client(&server, logged_in_store("at"));
        let err = http.send::<MovieStub>(ApiRequest::get("/movies/m1")).await.unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::InvalidResponse(_))));
    }
}
