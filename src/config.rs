use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use snafu::ResultExt;
use tracing::instrument;
use url::Url;

use crate::error::{ApplicationError, ConfigLoadSnafu, ParseConfigSnafu, ReadConfigSnafu};
use crate::time;

/// Runtime settings read from `LIVEWATCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Path of the JSON credentials file.
    #[serde(default = "default_config_path")]
    pub config: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_poll_interval", deserialize_with = "deserialize_period")]
    pub poll_interval: Duration,

    /// Base url of the YouTube Data API, must end with a slash.
    #[serde(default = "default_endpoint", deserialize_with = "deserialize_endpoint")]
    pub endpoint: Url,
}

impl Settings {
    pub fn from_env() -> Result<Settings, ApplicationError> {
        envy::prefixed("LIVEWATCH_")
            .from_env::<Settings>()
            .context(ConfigLoadSnafu)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: default_config_path(),
            log_dir: default_log_dir(),
            poll_interval: default_poll_interval(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_config_path() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_poll_interval() -> Duration {
    time::DEFAULT_PERIOD
}

fn default_endpoint() -> Url {
    Url::parse("https://www.googleapis.com/youtube/v3/").expect("default endpoint is a valid url")
}

fn deserialize_period<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    time::parse_period(&text).map_err(serde::de::Error::custom)
}

fn deserialize_endpoint<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: Deserializer<'de>,
{
    let endpoint = Url::deserialize(deserializer)?;

    // `Url::join` replaces the last segment unless the path ends with a slash
    if !endpoint.path().ends_with('/') {
        return Err(serde::de::Error::custom(format!(
            "api endpoint must end with a slash, got `{endpoint}`"
        )));
    }

    Ok(endpoint)
}

/// Credentials and the channel to watch, loaded once at startup.
#[derive(Clone, Deserialize)]
pub struct Config {
    api_key: SecretString,
    pub channel: String,
}

impl Config {
    pub fn new(api_key: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            channel: channel.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("channel", &self.channel)
            .finish()
    }
}

/// Read the credentials file at `path`.
#[instrument]
pub fn load(path: &Path) -> Result<Config, ApplicationError> {
    let text = std::fs::read_to_string(path).context(ReadConfigSnafu { path })?;
    serde_json::from_str(&text).context(ParseConfigSnafu { path })
}
