//! Connection configuration for the SQLite provider.

use std::str::FromStr;
use std::time::Duration;

use oxide_rowset_core::{Error, Result};
use sqlx::sqlite::SqliteConnectOptions;

/// Environment variable holding the database URL.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Environment variable holding the busy timeout in milliseconds.
pub const BUSY_TIMEOUT_ENV: &str = "OXIDE_ROWSET_BUSY_TIMEOUT_MS";

/// How [`crate::SqliteDriver`] opens its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite URL, e.g. `sqlite:db.sqlite3` or `sqlite::memory:`.
    pub url: String,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Create the database file when it does not exist.
    pub create_if_missing: bool,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::DEFAULT_URL)
    }
}

impl Config {
    /// URL used when nothing is configured.
    pub const DEFAULT_URL: &'static str = "sqlite:db.sqlite3";

    /// Creates a configuration for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
            foreign_keys: true,
        }
    }

    /// Configuration for a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    /// Reads `DATABASE_URL` and `OXIDE_ROWSET_BUSY_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::new(
            lookup(DATABASE_URL_ENV).unwrap_or_else(|| Self::DEFAULT_URL.to_string()),
        );
        if let Some(raw) = lookup(BUSY_TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{BUSY_TIMEOUT_ENV} must be milliseconds, got `{raw}`"))
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets foreign key enforcement.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub(crate) fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| Error::Config(format!("invalid database url `{}`: {e}", self.url)))?;
        Ok(options
            .busy_timeout(self.busy_timeout)
            .create_if_missing(self.create_if_missing)
            .foreign_keys(self.foreign_keys))
    }
}
