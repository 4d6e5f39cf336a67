//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::middleware::rate_limit::RateLimiters;
use crate::services::auth::TokenService;
use crate::services::catalog::{CATEGORY_CACHE_TTL, CategoryCache};
use crate::services::media::MediaStore;
use crate::services::sms::SmsCodeStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    sms: SmsCodeStore,
    rate_limiters: RateLimiters,
    categories: CategoryCache,
    media: MediaStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        let tokens = TokenService::new(
            &config.secret_key,
            config.access_token_expire_minutes,
            config.refresh_token_expire_days,
        );
        let sms = SmsCodeStore::new(config.sms.code_length, config.sms.code_ttl);
        let rate_limiters = RateLimiters::new(&config.rate_limits);
        let media = MediaStore::new(config.uploads_dir.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                sms,
                rate_limiters,
                categories: CategoryCache::new(CATEGORY_CACHE_TTL),
                media,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    #[must_use]
    pub fn sms(&self) -> &SmsCodeStore {
        &self.inner.sms
    }

    #[must_use]
    pub fn rate_limiters(&self) -> &RateLimiters {
        &self.inner.rate_limiters
    }

    /// Cached category listing.
    #[must_use]
    pub fn categories(&self) -> &CategoryCache {
        &self.inner.categories
    }

    /// Uploaded product images.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }
}
