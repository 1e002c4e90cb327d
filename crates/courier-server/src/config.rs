use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

use courier_api::threads::DEFAULT_MAX_THREAD_DEPTH;

/// Secrets that only exist so a dev checkout boots without a `.env`.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub token_ttl_days: i64,
    pub max_thread_depth: usize,
    /// `None` means any origin is allowed.
    pub allowed_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = var("COURIER_PORT", "3000");
        let ttl = var("COURIER_TOKEN_TTL_DAYS", "10");

        let token_ttl_days: i64 = ttl
            .parse()
            .with_context(|| format!("COURIER_TOKEN_TTL_DAYS is not a number: {:?}", ttl))?;
        anyhow::ensure!(token_ttl_days > 0, "COURIER_TOKEN_TTL_DAYS must be positive");

        let max_thread_depth: usize = match get("COURIER_MAX_THREAD_DEPTH") {
            Some(depth) => depth
                .parse()
                .with_context(|| format!("COURIER_MAX_THREAD_DEPTH is not a number: {:?}", depth))?,
            None => DEFAULT_MAX_THREAD_DEPTH,
        };
        anyhow::ensure!(max_thread_depth > 0, "COURIER_MAX_THREAD_DEPTH must be positive");

        let allowed_origins = get("COURIER_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        Ok(Self {
            jwt_secret: var("COURIER_JWT_SECRET", "dev-secret-change-me"),
            db_path: var("COURIER_DB_PATH", "courier.db").into(),
            host: var("COURIER_HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("COURIER_PORT is not a valid port: {:?}", port))?,
            token_ttl_days,
            max_thread_depth,
            allowed_origins,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.token_ttl_days, 10);
        assert_eq!(cfg.max_thread_depth, DEFAULT_MAX_THREAD_DEPTH);
        assert_eq!(cfg.db_path, PathBuf::from("courier.db"));
        assert!(cfg.allowed_origins.is_none());
        assert!(cfg.uses_placeholder_secret());
        assert_eq!(cfg.addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("COURIER_JWT_SECRET", "s3cret"),
            ("COURIER_PORT", "8080"),
            ("COURIER_HOST", "127.0.0.1"),
            ("COURIER_MAX_THREAD_DEPTH", "50"),
            ("COURIER_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ])
        .unwrap();
        assert!(!cfg.uses_placeholder_secret());
        assert_eq!(cfg.max_thread_depth, 50);
        assert_eq!(cfg.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(
            cfg.allowed_origins.unwrap(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config(&[("COURIER_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("COURIER_PORT"));
        assert!(config(&[("COURIER_MAX_THREAD_DEPTH", "0")]).is_err());
        assert!(config(&[("COURIER_TOKEN_TTL_DAYS", "-1")]).is_err());
    }
}
