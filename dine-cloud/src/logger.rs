//! Logging Infrastructure
//!
//! `tracing` subscriber with an env filter. When `LOG_DIR` points at an
//! existing directory, output goes to a daily rolling file instead of stdout.

use std::path::Path;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dine_cloud=info,tower_http=info";

/// Filter from `RUST_LOG`, else `LOG_LEVEL`, else the service default.
///
/// A bare level (`debug`) applies to this crate and tower-http only.
fn build_filter(log_level: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = match log_level {
        Some(level) if level.parse::<tracing::Level>().is_ok() => {
            format!("dine_cloud={level},tower_http={level}")
        }
        Some(custom) => custom.to_string(),
        None => DEFAULT_FILTER.to_string(),
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the global subscriber
pub fn init_logger(log_level: Option<&str>, log_dir: Option<&str>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(log_level))
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "dine-cloud");
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
        eprintln!("LOG_DIR {dir} does not exist, logging to stdout");
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_is_scoped_to_service() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let scoped = build_filter(Some("debug")).to_string();
        assert!(scoped.contains("dine_cloud=debug"));
        assert!(scoped.contains("tower_http=debug"));
        assert!(build_filter(None).to_string().contains("dine_cloud=info"));
        assert!(build_filter(Some("sqlx=warn")).to_string().contains("sqlx=warn"));
    }
}
