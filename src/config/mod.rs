use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::paging::PageSize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// How long the page worker may keep running after the UI closes
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    /// Log output goes here; stdout belongs to the terminal UI
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_max_connections() -> u32 {
    5
}

fn default_query_timeout_secs() -> u64 {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_page_size() -> u32 {
    PageSize::default().get()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("project_manager.log")
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Variables from a `.env` file are picked up first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Build a config from an explicit set of variables and validate it
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.page_size()?;
        if config.max_connections == 0 {
            return Err(anyhow!("MAX_CONNECTIONS must be at least 1"));
        }
        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn page_size(&self) -> Result<PageSize> {
        PageSize::from_value(self.default_page_size).ok_or_else(|| {
            anyhow!(
                "DEFAULT_PAGE_SIZE must be one of {}, got {}",
                PageSize::describe_all(),
                self.default_page_size
            )
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
