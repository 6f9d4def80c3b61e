//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SUPABASE_URL` (required): base URL of the managed backend project
/// - `SUPABASE_ANON_KEY` (required): public API key sent with every backend call
/// - `CHANGE_FEED_SECRET` (required): HMAC key shared with the database webhooks
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `API_TIMEOUT_SECS` (optional): outbound request timeout, defaults to 30
/// - `TRANSACTION_PAGE_LIMIT` (optional): rows fetched for the transactions page, defaults to 100
/// - `CHANGE_FEED_CAPACITY` (optional): buffered events per table, defaults to 256
/// - `SESSION_REVALIDATE_SECS` (optional): how long a session is trusted before
///   the auth provider is asked again, defaults to 60
/// - `SESSION_IDLE_SECS` (optional): unused sessions are dropped after this long, defaults to 1800
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase_url: String,

    pub supabase_anon_key: String,

    pub change_feed_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_timeout")]
    pub api_timeout_secs: u64,

    #[serde(default = "default_page_limit")]
    pub transaction_page_limit: usize,

    #[serde(default = "default_feed_capacity")]
    pub change_feed_capacity: usize,

    #[serde(default = "default_revalidate")]
    pub session_revalidate_secs: u64,

    #[serde(default = "default_idle")]
    pub session_idle_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_timeout() -> u64 {
    30
}

fn default_page_limit() -> usize {
    100
}

fn default_feed_capacity() -> usize {
    256
}

fn default_revalidate() -> u64 {
    60
}

fn default_idle() -> u64 {
    30 * 60
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment: {0}")]
    Env(#[from] envy::Error),

    #[error("SUPABASE_URL is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("SUPABASE_URL must use http or https")]
    UnsupportedScheme,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., SUPABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    /// - The backend URL is malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that envy cannot type-check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.supabase_url)?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            _ => Err(ConfigError::UnsupportedScheme),
        }
    }

    /// Configuration pointing at an arbitrary backend, with defaults for everything else.
    pub fn for_backend(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: anon_key.into(),
            change_feed_secret: String::new(),
            server_port: default_port(),
            api_timeout_secs: default_timeout(),
            transaction_page_limit: default_page_limit(),
            change_feed_capacity: default_feed_capacity(),
            session_revalidate_secs: default_revalidate(),
            session_idle_secs: default_idle(),
        }
    }
}
