//! # Bot Configuration Module
//!
//! Gathers the environment-supplied settings (bot token, database URL)
//! and the runtime tunables into one structure read once at startup.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Default path of the catalog seed manifest, relative to the working directory
pub const DEFAULT_SEED_MANIFEST: &str = "seed/catalog.json";
/// Upper bound on a single outbound send, in seconds
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot API token
    pub bot_token: String,
    /// SQLite database URL (e.g. `sqlite://storefront.db`)
    pub database_url: String,
    /// Path to the seed manifest used by the `seed` binary
    pub seed_manifest: PathBuf,
    /// Timeout applied to every outbound send
    pub send_timeout_secs: u64,
}

impl BotConfig {
    /// Read the configuration from the environment.
    ///
    /// `BOT_TOKEN` and `DATABASE_URL` are required; the rest fall back to
    /// defaults. Call `dotenv::dotenv()` before this if a `.env` file
    /// should be honored.
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?;
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let seed_manifest = env::var("SEED_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SEED_MANIFEST));

        let send_timeout_secs = match env::var("SEND_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("SEND_TIMEOUT_SECS must be a positive integer")?,
            Err(_) => DEFAULT_SEND_TIMEOUT_SECS,
        };

        Ok(Self {
            bot_token,
            database_url,
            seed_manifest,
            send_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        // from_env is environment-dependent; the defaults themselves are
        // what downstream code relies on.
        assert_eq!(DEFAULT_SEND_TIMEOUT_SECS, 10);
        assert_eq!(DEFAULT_SEED_MANIFEST, "seed/catalog.json");
    }
}
