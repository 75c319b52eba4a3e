use anyhow::{bail, Context, Result};

use crate::layout::allocator::required_units;
use crate::layout::{PageConfig, DEFAULT_PAGE_CAPACITY};
use crate::models::placement::SizeTier;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub rust_log: String,
    pub db_max_connections: u32,
    pub page_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            page_capacity: parse_page_capacity(std::env::var("PAGE_CAPACITY").ok().as_deref())?,
        })
    }

    pub fn page_config(&self) -> PageConfig {
        PageConfig {
            capacity: self.page_capacity,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// A page must be able to hold one FULL placement.
fn parse_page_capacity(raw: Option<&str>) -> Result<usize> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PAGE_CAPACITY);
    };
    let capacity = raw
        .trim()
        .parse::<usize>()
        .context("PAGE_CAPACITY must be a positive integer")?;
    let minimum = required_units(SizeTier::Full);
    if capacity < minimum {
        bail!("PAGE_CAPACITY must be at least {minimum}, got {capacity}");
    }
    Ok(capacity)
}
