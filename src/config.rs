use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { name: &'static str, value: String },
}

/// Process configuration loaded from environment variables.
///
/// Provider settings left unset here fall back to the settings table at command time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `socialsnap.db`.
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub stage_timeout: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                         | Default                        |
    /// |---------------------------------|--------------------------------|
    /// | `SOCIALSNAP_DATA_DIR`           | `<data dir>/socialsnap`        |
    /// | `GEMINI_API_KEY`                | `GOOGLE_API_KEY`, then setting |
    /// | `GEMINI_API_BASE`               | setting, then public endpoint  |
    /// | `SOCIALSNAP_TEXT_MODEL`         | setting, then built-in         |
    /// | `SOCIALSNAP_IMAGE_MODEL`        | setting, then built-in         |
    /// | `SOCIALSNAP_STAGE_TIMEOUT_SECS` | `180`                          |
    /// | `SOCIALSNAP_HTTP_TIMEOUT_SECS`  | `120`                          |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let data_dir = var("SOCIALSNAP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let secs = |name: &'static str, default: u64| -> Result<Duration, ConfigError> {
            match var(name) {
                None => Ok(Duration::from_secs(default)),
                Some(value) => match value.trim().parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
                    _ => Err(ConfigError::InvalidSeconds { name, value }),
                },
            }
        };

        Ok(Self {
            data_dir,
            api_key: var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
            base_url: var("GEMINI_API_BASE"),
            text_model: var("SOCIALSNAP_TEXT_MODEL"),
            image_model: var("SOCIALSNAP_IMAGE_MODEL"),
            stage_timeout: secs("SOCIALSNAP_STAGE_TIMEOUT_SECS", DEFAULT_STAGE_TIMEOUT_SECS)?,
            http_timeout: secs("SOCIALSNAP_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
        })
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("socialsnap"))
        .unwrap_or_else(|| PathBuf::from(".socialsnap"))
}
