//! Target URL validation and normalization.

use log::warn;
use url::Url;

use crate::config::MAX_URL_LENGTH;
use crate::error_handling::MissionError;

/// A validated mission target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    /// Normalized URL (always http or https)
    pub url: Url,
    /// Host name (or IP literal) probes are keyed and addressed by
    pub host: String,
}

impl ProbeTarget {
    /// Validates and normalizes user input into a target.
    ///
    /// Adds an `https://` prefix if no scheme is given, then requires an http
    /// or https URL with a host. Rejects input longer than `MAX_URL_LENGTH`.
    ///
    /// # Errors
    ///
    /// Returns an `unknown` [`MissionError`] describing why the input was rejected.
    pub fn parse(input: &str) -> Result<Self, MissionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MissionError::unknown("Target URL is empty"));
        }

        let normalized = if !input.starts_with("http://") && !input.starts_with("https://") {
            format!("https://{input}")
        } else {
            input.to_string()
        };

        if normalized.len() > MAX_URL_LENGTH {
            warn!(
                "Rejecting URL exceeding maximum length ({} > {})",
                normalized.len(),
                MAX_URL_LENGTH
            );
            return Err(MissionError::unknown(format!(
                "Target URL exceeds {MAX_URL_LENGTH} characters"
            )));
        }

        let url = Url::parse(&normalized).map_err(|e| {
            warn!("Rejecting invalid URL {input}: {e}");
            MissionError::unknown(format!("Invalid target URL '{input}': {e}"))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(MissionError::unknown(format!(
                "Unsupported scheme '{}' in target URL",
                url.scheme()
            )));
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.trim_matches(|c| c == '[' || c == ']'),
            _ => {
                return Err(MissionError::unknown(format!(
                    "Target URL '{input}' has no host"
                )))
            }
        }
        .to_lowercase();

        Ok(Self { url, host })
    }

    /// Whether the target is served over TLS.
    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// Port used for the TLS certificate probe.
    pub fn tls_port(&self) -> u16 {
        if self.is_https() {
            self.url.port_or_known_default().unwrap_or(443)
        } else {
            443
        }
    }

    /// `scheme://host[:port]` with no path, used to build well-known URLs.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::MissionErrorKind;

    #[test]
    fn test_adds_https() {
        let target = ProbeTarget::parse("example.com").unwrap();
        assert_eq!(target.url.as_str(), "https://example.com/");
        assert_eq!(target.host, "example.com");
        assert!(target.is_https());
    }

    #[test]
    fn test_preserves_http() {
        let target = ProbeTarget::parse("http://Example.com/path?q=1").unwrap();
        assert_eq!(target.url.scheme(), "http");
        assert_eq!(target.host, "example.com");
        assert_eq!(target.tls_port(), 443);
        assert_eq!(target.origin(), "http://example.com");
    }

    #[test]
    fn test_port_is_kept() {
        let target = ProbeTarget::parse("example.com:8443").unwrap();
        assert_eq!(target.tls_port(), 8443);
        assert_eq!(target.origin(), "https://example.com:8443");
    }

    #[test]
    fn test_rejects_invalid_url() {
        let error = ProbeTarget::parse("not a valid url!!!").unwrap_err();
        assert_eq!(error.kind, MissionErrorKind::Unknown);
    }

    #[test]
    fn test_rejects_empty_and_overlong() {
        assert!(ProbeTarget::parse("   ").is_err());
        let long = format!("example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(ProbeTarget::parse(&long).is_err());
    }

    #[test]
    fn test_ip_literal_host() {
        let target = ProbeTarget::parse("http://[::1]:8080/").unwrap();
        assert_eq!(target.host, "::1");
        let target = ProbeTarget::parse("127.0.0.1").unwrap();
        assert_eq!(target.host, "127.0.0.1");
    }
}
