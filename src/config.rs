use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use axum::http::HeaderValue;

/// Shortest `SECRET_KEY` accepted for deriving the cookie signing key.
pub const MIN_SECRET_KEY_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    /// `None` means a random key is generated at startup.
    pub secret_key: Option<String>,
    /// Empty means any origin may call `/api/*` (without credentials).
    pub allowed_origins: Vec<HeaderValue>,
    pub static_dir: PathBuf,
    pub cookie_secure: bool,
    pub addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let db_max_connections = match var("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("DB_MAX_CONNECTIONS must be a positive integer, got {raw:?}"))?,
            None => 10,
        };

        let secret_key = var("SECRET_KEY").filter(|k| !k.is_empty());
        if let Some(key) = &secret_key {
            if key.len() < MIN_SECRET_KEY_LEN {
                bail!("SECRET_KEY must be at least {MIN_SECRET_KEY_LEN} bytes long");
            }
        }

        let allowed_origins = parse_origins(&var("ALLOWED_ORIGINS").unwrap_or_default())?;

        let static_dir = var("STATIC_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("public"));

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("COOKIE_SECURE must be a boolean, got {raw:?}"))?,
            None => false,
        };

        let host = var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = var("APP_PORT").unwrap_or_else(|| "8080".into());
        let addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        Ok(Self {
            database_url,
            db_max_connections,
            secret_key,
            allowed_origins,
            static_dir,
            cookie_secure,
            addr,
        })
    }
}

fn parse_origins(raw: &str) -> anyhow::Result<Vec<HeaderValue>> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("ALLOWED_ORIGINS: invalid origin {o:?}"))
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
