//! Application state for dine-cloud

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::auth::RateLimiter;
use crate::config::Config;
use crate::llm::LlmClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Outbound HTTP client (Stripe)
    pub http: reqwest::Client,
    /// HS256 secret of the external auth service
    pub jwt_secret: String,
    /// Expected JWT audience
    pub jwt_audience: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Customer checkout redirect (success)
    pub checkout_success_url: String,
    /// Customer checkout redirect (cancel)
    pub checkout_cancel_url: String,
    /// LLM client; `None` when no API key is configured
    pub llm: Option<LlmClient>,
    /// Rate limiter for public customer routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Self::with_pool(pool, config)
    }

    /// Build the state around an existing pool
    pub fn with_pool(pool: PgPool, config: &Config) -> Result<Self, BoxError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let llm = match &config.openai_api_key {
            Some(key) => Some(LlmClient::new(
                http.clone(),
                &config.openai_base_url,
                key,
                &config.assistant_model,
                &config.menu_vision_model,
            )),
            None => {
                tracing::warn!("OPENAI_API_KEY not set, assistant and menu import disabled");
                None
            }
        };

        Ok(Self {
            pool,
            http,
            jwt_secret: config.jwt_secret.clone(),
            jwt_audience: config.jwt_audience.clone(),
            stripe_secret_key: config.stripe_secret_key.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            checkout_success_url: config.checkout_success_url.clone(),
            checkout_cancel_url: config.checkout_cancel_url.clone(),
            llm,
            rate_limiter: RateLimiter::new(),
        })
    }

    /// State over a lazily connected pool (router tests never reach the database)
    #[cfg(test)]
    pub fn for_tests() -> Self {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy(&config.database_url)
            .unwrap();
        Self::with_pool(pool, &config).unwrap()
    }
}
