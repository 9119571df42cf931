//! Configuration management for Confluence.
//!
//! Configuration is read from `~/.config/confluence/config.toml` at startup
//! (or an explicit `--config` path). If the file doesn't exist, a default
//! configuration with comments is created. Missing fields use defaults.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed endpoint URLs to merge.
    pub sources: Vec<String>,
    /// Number of recent entries hashed into a source fingerprint.
    pub fingerprint_entries: usize,
    pub fetch: FetchConfig,
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            fingerprint_entries: 10,
            fetch: FetchConfig::default(),
            resolver: ResolverConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    /// Maximum concurrent feed fetches.
    pub workers: usize,
    /// Extra attempts for transient failures (429/5xx, timeouts, resets).
    pub retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 2,
            read_timeout_secs: 6,
            workers: 12,
            retries: 2,
            backoff_ms: 300,
            user_agent: "confluence/0.1 (merged feed generator)".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum concurrent article-page probes (distinct from feed workers).
    pub page_workers: usize,
    /// Bytes of an article page read when looking for OG metadata.
    pub max_page_bytes: usize,
    /// Larger read budget for domains that bury their meta tags deep.
    pub generous_page_bytes: usize,
    pub generous_domains: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            page_workers: 16,
            max_page_bytes: 80_000,
            generous_page_bytes: 200_000,
            generous_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file path. Defaults to `<data dir>/confluence/cache.json`.
    pub path: Option<PathBuf>,
    /// Entries untouched for longer than this are evicted at load.
    pub retention_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            retention_days: 14,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub rss_filename: String,
    pub json_filename: String,
    /// Maximum articles in the merged output.
    pub max_items: usize,
    pub channel_title: String,
    pub channel_link: String,
    pub channel_description: String,
    /// Separator between site name and article title in composed titles.
    pub title_separator: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public"),
            rss_filename: "rss_output.xml".into(),
            json_filename: "feed.json".into(),
            max_items: 200,
            channel_title: "Merged RSS Feed".into(),
            channel_link: "https://example.invalid/".into(),
            channel_description: "Merged feed with resolved images".into(),
            title_separator: "\u{9582}".into(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path or the default location.
    ///
    /// When no explicit path is given and the default file doesn't exist,
    /// a commented default config is created.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/confluence/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("confluence").join("config.toml"))
    }

    /// Default cache file path: `<data dir>/confluence/cache.json`
    pub fn cache_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.cache.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        let dir = data_dir.join("confluence");
        fs::create_dir_all(&dir).map_err(|e| ConfigError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir.join("cache.json"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &PathBuf) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let default_config = Self::default_config_content();

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        file.write_all(default_config.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Confluence configuration
#
# List the feed endpoints to merge. An empty list is a fatal error at run
# time, so add at least one source before running `confluence run`.

sources = [
    # "https://www.4gamer.net/rss/index.xml",
    # "https://www.gizmodo.jp/atom.xml",
]

# Number of recent entries hashed into a source fingerprint for change
# detection. A source whose fingerprint is unchanged between runs is
# served from cache without re-resolving images.
fingerprint_entries = 10

[fetch]
# Short timeouts: one slow source must not stall the whole run.
connect_timeout_secs = 2
read_timeout_secs = 6

# Maximum concurrent feed fetches.
workers = 12

# Extra attempts for transient failures (429/5xx, timeouts, resets).
retries = 2
backoff_ms = 300

user_agent = "confluence/0.1 (merged feed generator)"

[resolver]
# Maximum concurrent article-page probes for Open Graph images.
page_workers = 16

# Bytes of an article page read when looking for OG metadata.
max_page_bytes = 80000

# Domains that bury their meta tags deep get a larger read budget.
generous_page_bytes = 200000
generous_domains = []

[cache]
# Cache file path. Defaults to the platform data dir when omitted.
# path = "/var/lib/confluence/cache.json"

# Cache entries untouched for longer than this are evicted at load.
retention_days = 14

[output]
dir = "public"
rss_filename = "rss_output.xml"
json_filename = "feed.json"

# Maximum articles in the merged output.
max_items = 200

channel_title = "Merged RSS Feed"
channel_link = "https://example.invalid/"
channel_description = "Merged feed with resolved images"

# Separator between site name and article title in composed item titles.
title_separator = "閂"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
