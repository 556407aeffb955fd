//! Configuration constants.
//!
//! This module defines the defaults used throughout the engine: probe pacing,
//! AI admission control and retry policy, cache TTLs and network timeouts.

use std::time::Duration;

// Probe scheduling
/// Number of probes dispatched together in one concurrent batch
pub const PROBE_BATCH_SIZE: usize = 3;
/// Cooldown observed after each executed probe batch.
/// Bounds the outbound request rate to third-party probe providers
/// (SSL grading, geo lookups) independently of their own throttling.
pub const PROBE_BATCH_COOLDOWN: Duration = Duration::from_secs(1);

// AI gateway admission control and retry policy
/// Minimum interval between two calls to the model API, process-wide
pub const AI_CALL_COOLDOWN: Duration = Duration::from_millis(2500);
/// Maximum number of attempts (initial call included) for transient failures
pub const AI_MAX_ATTEMPTS: u32 = 5;
/// Base retry delay, multiplied by the attempt number
pub const AI_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);
/// Upper bound of the random jitter added to each retry delay (milliseconds)
pub const AI_RETRY_MAX_JITTER_MS: u64 = 2000;
/// Thinking budget attached to DEEP analysis requests
pub const DEEP_THINKING_BUDGET: u32 = 32_768;
/// Per-request timeout for the model API (reasoning calls can be slow)
pub const AI_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Default model identifier
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default base URL of the model API
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Rough characters-per-token ratio used when the provider reports no usage
pub const CHARS_PER_TOKEN_ESTIMATE: usize = 4;

// Probe cache TTLs
/// SSL grades are expensive to compute upstream and change rarely
pub const SSL_GRADE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TLS certificate snapshot TTL
pub const TLS_CERTIFICATE_TTL: Duration = Duration::from_secs(6 * 60 * 60);
/// Hosting/geo lookup TTL
pub const GEO_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// DNS records TTL
pub const DNS_TTL: Duration = Duration::from_secs(60 * 60);
/// Response header snapshot TTL
pub const HTTP_HEADERS_TTL: Duration = Duration::from_secs(15 * 60);
/// security.txt / robots.txt TTL
pub const WELL_KNOWN_TTL: Duration = Duration::from_secs(60 * 60);

// Network operation timeouts
/// DNS query timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// TLS handshake timeout in seconds
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;
/// Per-request HTTP timeout for probes and the page fetch
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent string for page fetches and probe requests.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Response and body size limits
/// Maximum accepted target URL length
pub const MAX_URL_LENGTH: usize = 2048;
/// Maximum page body kept for fingerprinting (2MB)
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;
/// Maximum length of a well-known file kept in a probe payload
pub const MAX_WELL_KNOWN_BODY_CHARS: usize = 4096;
/// Maximum length of the evidence snippet recorded for a content match
pub const MAX_EVIDENCE_SNIPPET_CHARS: usize = 80;

// Page fetch retry strategy
/// Initial delay in milliseconds before the first page fetch retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;
/// Factor by which the page fetch retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between page fetch retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 5;
/// Maximum number of page fetch retries after the initial attempt
pub const RETRY_MAX_ATTEMPTS: usize = 2;

// Mission state
/// Number of findings kept in the `recent_findings` push stream
pub const RECENT_FINDINGS_LIMIT: usize = 10;
/// Capacity of the mission event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Schema version stamped on every mission report
pub const REPORT_SCHEMA_VERSION: &str = "1.0";

// Third-party probe providers
/// SSL Labs assessment API
pub const DEFAULT_SSL_LABS_URL: &str = "https://api.ssllabs.com/api/v3";
/// Hosting/geo lookup API
pub const DEFAULT_GEO_URL: &str = "http://ip-api.com/json";

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_NOT_FOUND: u16 = 404;
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
