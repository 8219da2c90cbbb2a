use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default feed page size when TIMBER_PAGE_SIZE is unset.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Base URL of the hosted data API (TIMBER_API_URL).
    pub api_url: Option<String>,
    /// API key for the hosted data API (TIMBER_API_KEY, optional for
    /// anonymous-readable deployments).
    pub api_key: Option<String>,
    /// Direct PostgreSQL connection URL (when set and starts with
    /// postgres://, uses the sqlx backend behind the `postgres` feature).
    pub database_url: Option<String>,
    /// Feed page size (TIMBER_PAGE_SIZE, default 10).
    pub page_size: usize,
    /// Whole-fetch deadline applied to every feed page request
    /// (TIMBER_FETCH_DEADLINE_MS, unset = no deadline).
    pub fetch_deadline: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a workable default except the backend: commands that
    /// touch the store call `require_backend` first.
    pub fn load() -> Result<Self> {
        let page_size = match env::var("TIMBER_PAGE_SIZE") {
            Ok(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| {
                    format!("TIMBER_PAGE_SIZE must be a positive integer, got '{raw}'")
                })?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        let fetch_deadline = match env::var("TIMBER_FETCH_DEADLINE_MS") {
            Ok(raw) => {
                let millis = raw.parse::<u64>().with_context(|| {
                    format!("TIMBER_FETCH_DEADLINE_MS must be an integer, got '{raw}'")
                })?;
                Some(Duration::from_millis(millis))
            }
            Err(_) => None,
        };

        Ok(Self {
            api_url: env::var("TIMBER_API_URL").ok().filter(|s| !s.is_empty()),
            api_key: env::var("TIMBER_API_KEY").ok().filter(|s| !s.is_empty()),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            page_size,
            fetch_deadline,
        })
    }

    /// Check that some backend is configured.
    /// Call this before any operation that reads or writes the store.
    pub fn require_backend(&self) -> Result<()> {
        if self.api_url.is_none() && self.database_url.is_none() {
            anyhow::bail!(
                "Neither TIMBER_API_URL nor DATABASE_URL is set. Add one to your \
                 .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }
}
