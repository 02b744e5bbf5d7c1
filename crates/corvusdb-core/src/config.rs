//! `CorvusDB` configuration module.
//!
//! Provides configuration file support via `corvusdb.toml`, environment
//! variables, and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (builder methods)
//! 2. Environment variables (`CORVUSDB_*`)
//! 3. Configuration file (`corvusdb.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Graph engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Number of shards. `None` = one per available core.
    pub shards: Option<u16>,
    /// Bound on each shard's mailbox; `None` = unbounded. Submissions to a
    /// full mailbox block the caller, which backpressures producers.
    pub mailbox_capacity: Option<usize>,
    /// Prefix for the shard thread names (`<prefix>-<index>`).
    pub thread_name_prefix: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            shards: None,
            mailbox_capacity: None,
            thread_name_prefix: "corvus-shard".to_string(),
        }
    }
}

impl GraphConfig {
    /// Loads configuration from defaults, `corvusdb.toml`, and `CORVUSDB_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment contains values that do
    /// not parse, or if validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("corvusdb.toml"))
    }

    /// Loads configuration with an explicit file path.
    ///
    /// A missing file is not an error; the defaults and environment apply.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CORVUSDB_"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved shard count: configured value or one per available core.
    #[must_use]
    pub fn shard_count(&self) -> u16 {
        self.shards.unwrap_or_else(|| {
            let cores = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1);
            u16::try_from(cores).unwrap_or(u16::MAX)
        })
    }

    /// Overrides the shard count (builder pattern).
    #[must_use]
    pub fn with_shards(mut self, shards: u16) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.shards == Some(0) {
            return Err(Error::Config("shards must be at least 1".into()));
        }
        if let Some(shards) = self.shards {
            if u64::from(shards) > crate::ids::MAX_SHARDS {
                return Err(Error::Config(format!(
                    "shards must be at most {}",
                    crate::ids::MAX_SHARDS
                )));
            }
        }
        if self.mailbox_capacity == Some(0) {
            return Err(Error::Config("mailbox_capacity must be at least 1".into()));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::Config("thread_name_prefix must not be empty".into()));
        }
        Ok(())
    }
}
