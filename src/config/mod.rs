//! Configuration management.
//!
//! Configuration is read from a TOML file and overridden by environment
//! variables prefixed with `BOOKMETA_`, using `__` between section and key
//! (for example `BOOKMETA_SOURCE__BASE_URL`).
//!
//! ```toml
//! [source]
//! base_url = "https://www.yousuu.com"
//! search_path = "/search/?search_type=title&search_value="
//! image_proxy = "https://images.weserv.nl/"
//!
//! [transport]
//! timeout_ladder_secs = [10, 15, 20]
//! backoff_base_ms = 1000
//! max_redirects = 5
//! default_charset = "gbk"
//!
//! [extraction]
//! max_results = 20
//! allow_keyword_truncation = false
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{RetryPolicy, DEFAULT_CHARSET, DEFAULT_TIMEOUT_LADDER_SECS, DEFAULT_USER_AGENT};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "bookmeta.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalogue settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Transport (HTTP) settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote catalogue settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base origin every relative link resolves against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search path; the URL-encoded keyword is appended to it
    #[serde(default = "default_search_path")]
    pub search_path: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Image proxy endpoint used to rewrite cover URLs
    #[serde(default = "default_image_proxy")]
    pub image_proxy: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_path: default_search_path(),
            user_agent: default_user_agent(),
            image_proxy: default_image_proxy(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.yousuu.com".to_string()
}

fn default_search_path() -> String {
    "/search/?search_type=title&search_value=".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_image_proxy() -> String {
    "https://images.weserv.nl/".to_string()
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-attempt timeouts in seconds; one attempt per entry
    #[serde(default = "default_timeout_ladder")]
    pub timeout_ladder_secs: Vec<u64>,

    /// Backoff unit in milliseconds (attempt n waits n times this)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Maximum redirect hops
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Charset used when a page declares none
    #[serde(default = "default_charset")]
    pub default_charset: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ladder_secs: default_timeout_ladder(),
            backoff_base_ms: default_backoff_base_ms(),
            max_redirects: default_max_redirects(),
            default_charset: default_charset(),
        }
    }
}

impl TransportConfig {
    /// Retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_secs(
            &self.timeout_ladder_secs,
            Duration::from_millis(self.backoff_base_ms),
        )
    }
}

fn default_timeout_ladder() -> Vec<u64> {
    DEFAULT_TIMEOUT_LADDER_SECS.to_vec()
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_redirects() -> usize {
    5
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

/// Extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum number of records returned from a listing page
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Retry an empty search with a shortened keyword.
    ///
    /// Off by default: shortening "Title2" to "Title" finds the wrong book.
    #[serde(default)]
    pub allow_keyword_truncation: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            allow_keyword_truncation: false,
        }
    }
}

fn default_max_results() -> usize {
    20
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` (default) or `json`
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from a file, with `BOOKMETA_*` environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("BOOKMETA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("transport.timeout_ladder_secs"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a configuration file in the working directory, then in the
/// user's config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("bookmeta").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration
pub fn get_config() -> Config {
    Config::default()
}
