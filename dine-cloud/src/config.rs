//! Cloud server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cloud server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Max pooled PostgreSQL connections
    pub db_max_connections: u32,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HS256 secret of the external auth service
    pub jwt_secret: String,
    /// Expected `aud` claim
    pub jwt_audience: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Redirect after a successful customer checkout (`{ORDER_ID}` is substituted)
    pub checkout_success_url: String,
    /// Redirect after a cancelled customer checkout (`{ORDER_ID}` is substituted)
    pub checkout_cancel_url: String,
    /// OpenAI-compatible API key (assistant + menu vision)
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible base URL
    pub openai_base_url: String,
    /// Model used for assistant planning
    pub assistant_model: String,
    /// Model used for menu image extraction
    pub menu_vision_model: String,
    /// Seconds between automatic daily reset sweeps (0 disables)
    pub daily_reset_interval_secs: u64,
    /// Log level / filter directive
    pub log_level: Option<String>,
    /// Directory for rolling log files
    pub log_dir: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.into())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = env_or("ENVIRONMENT", "development");
        if !matches!(
            environment.as_str(),
            "development" | "staging" | "production"
        ) {
            return Err(format!("Unknown ENVIRONMENT: {environment}").into());
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 10),
            http_port: env_parse("HTTP_PORT", 8080),
            environment: environment.clone(),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_audience: env_or("JWT_AUDIENCE", "authenticated"),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            checkout_success_url: env_or(
                "CHECKOUT_SUCCESS_URL",
                "http://localhost:3000/order/{ORDER_ID}?paid=1",
            ),
            checkout_cancel_url: env_or(
                "CHECKOUT_CANCEL_URL",
                "http://localhost:3000/order/{ORDER_ID}?cancelled=1",
            ),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            assistant_model: env_or("ASSISTANT_MODEL", "gpt-4o-mini"),
            menu_vision_model: env_or("MENU_VISION_MODEL", "gpt-4o"),
            daily_reset_interval_secs: env_parse("DAILY_RESET_INTERVAL_SECS", 900),
            log_level: std::env::var("LOG_LEVEL").ok().filter(|s| !s.is_empty()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Defaults for router tests: no network, development secrets
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/dine_test".into(),
            db_max_connections: 1,
            http_port: 0,
            environment: "development".into(),
            jwt_secret: "test-secret".into(),
            jwt_audience: "authenticated".into(),
            stripe_secret_key: "sk_test".into(),
            stripe_webhook_secret: "whsec_test".into(),
            checkout_success_url: "http://localhost/ok/{ORDER_ID}".into(),
            checkout_cancel_url: "http://localhost/cancel/{ORDER_ID}".into(),
            openai_api_key: None,
            openai_base_url: "http://localhost:9/v1".into(),
            assistant_model: "gpt-4o-mini".into(),
            menu_vision_model: "gpt-4o".into(),
            daily_reset_interval_secs: 0,
            log_level: None,
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_secrets_get_placeholders() {
        let secret = Config::require_secret("DINE_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(secret, "dev-DINE_TEST_UNSET_SECRET-not-for-production");
    }

    #[test]
    fn secrets_required_outside_development() {
        let err = Config::require_secret("DINE_TEST_UNSET_SECRET", "production").unwrap_err();
        assert!(err.to_string().contains("must be set in production"));
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        assert_eq!(env_parse("DINE_TEST_UNSET_PORT", 8080u16), 8080);
        assert_eq!(env_or("DINE_TEST_UNSET_NAME", "x"), "x");
    }
}
