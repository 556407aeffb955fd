//! Configuration types and CLI options.
//!
//! This module defines the library configuration struct and the enums and
//! structs used for command-line argument parsing of the diagnostic binary.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;

/// Environment variables consulted (in order) for the model API key.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// Every pacing and retry knob defaults to the values in
/// [`constants`](crate::config), and every third-party endpoint can be
/// redirected, which is how the integration tests point the engine at a mock
/// server.
///
/// # Examples
///
/// ```no_run
/// use recon_mission::Config;
///
/// let config = Config {
///     api_key: Config::api_key_from_env(),
///     timeout_seconds: 15,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Model API key (`None` makes every analysis fail with an `api_key` error)
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Base URL of the model API
    pub ai_base_url: String,

    /// Base URL of the SSL grading API
    pub ssl_labs_url: String,

    /// Base URL of the hosting/geo lookup API
    pub geo_url: String,

    /// Per-request timeout in seconds for the page fetch and HTTP probes
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    pub user_agent: String,

    /// Probes dispatched together in one batch
    pub probe_batch_size: usize,

    /// Cooldown observed after each executed probe batch
    pub probe_batch_cooldown: Duration,

    /// Minimum interval between two model API calls, process-wide
    pub ai_cooldown: Duration,

    /// Maximum attempts for transient model API failures
    pub ai_max_attempts: u32,

    /// Base retry delay (multiplied by the attempt number)
    pub ai_retry_base_delay: Duration,

    /// Upper bound of the retry jitter in milliseconds
    pub ai_retry_max_jitter_ms: u64,
}

impl Config {
    /// Reads the model API key from the first non-empty variable in
    /// [`API_KEY_ENV_VARS`].
    pub fn api_key_from_env() -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            ai_base_url: DEFAULT_AI_BASE_URL.to_string(),
            ssl_labs_url: DEFAULT_SSL_LABS_URL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            timeout_seconds: HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe_batch_size: PROBE_BATCH_SIZE,
            probe_batch_cooldown: PROBE_BATCH_COOLDOWN,
            ai_cooldown: AI_CALL_COOLDOWN,
            ai_max_attempts: AI_MAX_ATTEMPTS,
            ai_retry_base_delay: AI_RETRY_BASE_DELAY,
            ai_retry_max_jitter_ms: AI_RETRY_MAX_JITTER_MS,
        }
    }
}

/// Command-line options for the fingerprint diagnostic binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "recon_mission",
    version,
    about = "Fetches a page and prints the technologies the fingerprint matcher confirms"
)]
pub struct Opt {
    /// Target URL (scheme optional, https is assumed)
    pub url: String,

    /// Log level
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Print the detected technologies as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl From<&Opt> for Config {
    fn from(opt: &Opt) -> Self {
        Config {
            timeout_seconds: opt.timeout_seconds,
            user_agent: opt.user_agent.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_config_matches_constants() {
        let config = Config::default();
        assert_eq!(config.probe_batch_size, 3);
        assert_eq!(config.probe_batch_cooldown, Duration::from_secs(1));
        assert_eq!(config.ai_cooldown, Duration::from_millis(2500));
        assert_eq!(config.ai_max_attempts, 5);
        assert_eq!(config.ai_retry_base_delay, Duration::from_secs(5));
        assert_eq!(config.ai_retry_max_jitter_ms, 2000);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_opt_parses_url_and_flags() {
        let opt = Opt::parse_from([
            "recon_mission",
            "example.com",
            "--timeout-seconds",
            "3",
            "--json",
        ]);
        assert_eq!(opt.url, "example.com");
        assert_eq!(opt.timeout_seconds, 3);
        assert!(opt.json);

        let config = Config::from(&opt);
        assert_eq!(config.timeout_seconds, 3);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_opt_requires_url() {
        assert!(Opt::try_parse_from(["recon_mission"]).is_err());
    }
}
