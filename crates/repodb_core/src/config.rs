//! Context configuration.

use crate::error::{CoreError, CoreResult};

/// Database scope used when no name is configured.
pub const DEFAULT_DATABASE_NAME: &str = "repodb";

/// Configuration for a transactional context.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the database scope the context reads and writes.
    ///
    /// Contexts configured with the same name share committed data.
    pub database_name: String,

    /// Whether to emit a `trace` event for every committed entry.
    pub log_entries: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            log_entries: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database scope name.
    #[must_use]
    pub fn database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Sets whether every committed entry is traced.
    #[must_use]
    pub const fn log_entries(mut self, value: bool) -> Self {
        self.log_entries = value;
        self
    }

    /// Checks that the configuration can open a context.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NullArgument`] if the database name is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database_name.trim().is_empty() {
            return Err(CoreError::null_argument("database_name"));
        }
        Ok(())
    }
}
