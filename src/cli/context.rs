//! Command execution context
//!
//! Provides a unified context for command execution, eliminating boilerplate
//! for config loading, session storage and client initialization.

use std::sync::Arc;

use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::cache::{CachedMovieClient, FetchPolicy, QueryCache, TtlPolicy};
use crate::cli::{GlobalOptions, OutputFormat};
use crate::client::models::SessionUser;
use crate::client::{HttpClient, MovieClient};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::session::{SqliteBackend, TokenStore};
use crate::upload::ImageUploader;

/// Context for command execution containing config, client, and runtime options.
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Catalog client with the response cache in front of it
    pub client: Arc<CachedMovieClient<MovieClient>>,
    /// Output format preference
    pub format: OutputFormat,
    gc: Option<JoinHandle<()>>,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// Loads config (applying the `--api-url` override), opens the session
    /// database beside the config file and wraps the HTTP client in the
    /// cache, which is persisted in the same database. With `--no-cache`
    /// every read goes to the network.
    ///
    /// Must be called inside the tokio runtime when periodic GC is enabled.
    ///
    /// # Errors
    /// Returns error if config cannot be loaded or the API URL is invalid.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Config::load_at(opts.config_ref())?.with_api_url(opts.api_url_ref());
        config.validate()?;

        let (store, cache) = match open_database(opts.config_ref()) {
            Some(db) => (
                TokenStore::new(Arc::clone(&db)),
                QueryCache::with_backend(db),
            ),
            None => (TokenStore::detached(), QueryCache::new()),
        };
        let http = HttpClient::new(config.api_base(), Arc::new(store), config.request_timeout())?;

        let cache = Arc::new(cache);
        let client = CachedMovieClient::new(Arc::new(MovieClient::new(http)), Arc::clone(&cache))
            .with_ttl(TtlPolicy::from_settings(&config.cache))
            .with_policy(FetchPolicy::select(&config.cache, opts.no_cache));

        let gc = config.cache.gc_interval().map(|every| cache.spawn_gc(every));

        Ok(Self {
            config,
            client: Arc::new(client),
            format: opts.format,
            gc,
        })
    }

    /// The shared session store
    pub fn store(&self) -> &Arc<TokenStore> {
        self.client.inner().store()
    }

    /// Signed-in user, or `Unauthorized` without contacting the server.
    pub fn require_session(&self) -> Result<SessionUser> {
        let store = self.store();
        if store.access_token().is_none() && store.refresh_token().is_none() {
            return Err(ApiError::Unauthorized.into());
        }
        self.client
            .current_user(|| store.user())
            .ok_or_else(|| ApiError::Unauthorized.into())
    }

    /// Uploader for the configured image host
    pub fn uploader(&self) -> Result<ImageUploader> {
        ImageUploader::new(&self.config.upload, self.config.request_timeout())
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

/// Open the session database. `None` degrades to "no session" and a
/// cache that lives only for this command.
fn open_database(config_path: Option<&str>) -> Option<Arc<SqliteBackend>> {
    let path = match Config::session_db_path(config_path) {
        Ok(path) => path,
        Err(e) => {
            warn!("Session storage unavailable: {}", e);
            return None;
        }
    };
    match SqliteBackend::open_at(&path) {
        Ok(backend) => {
            debug!("Using session database at {}", backend.path().display());
            Some(Arc::new(backend))
        }
        Err(e) => {
            warn!("Session storage unavailable ({}): {}", path.display(), e);
            None
        }
    }
}
