use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContentConfig {
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: u32,
    #[serde(default = "default_categories_per_page")]
    pub categories_per_page: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_per_page: default_posts_per_page(),
            categories_per_page: default_categories_per_page(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    /// Keep recent statements in memory and expose them at `/admin/debug/queries`.
    #[serde(default)]
    pub query_log: bool,
    #[serde(default = "default_query_log_capacity")]
    pub query_log_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            query_log: false,
            query_log_capacity: default_query_log_capacity(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_posts_per_page() -> u32 {
    5
}

fn default_categories_per_page() -> u32 {
    10
}

fn default_query_log_capacity() -> usize {
    200
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Could not read config file '{}': {}. Run `blog-admin init` to create one.",
                path.display(),
                e
            )
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("content.posts_per_page", self.content.posts_per_page),
            ("content.categories_per_page", self.content.categories_per_page),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
            if value > 100 {
                anyhow::bail!("{} must be 100 or less", name);
            }
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        if self.diagnostics.query_log && self.diagnostics.query_log_capacity == 0 {
            anyhow::bail!("diagnostics.query_log_capacity must be greater than 0");
        }
        Ok(())
    }

    pub fn default_toml(site_title: &str) -> String {
        format!(
            r#"[site]
title = "{}"

[server]
host = "127.0.0.1"
port = 3000

[database]
path = "data/blog.db"
pool_size = 10

[content]
posts_per_page = 5
categories_per_page = 10

[diagnostics]
query_log = false
query_log_capacity = 200
"#,
            site_title.replace('"', "'")
        )
    }
}
