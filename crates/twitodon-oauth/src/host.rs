//! Mastodon server addresses.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{OAuthError, Result};

/// A user-chosen Mastodon server, reduced to its origin.
///
/// The base URL is what API calls are made against; the domain keys the
/// stored app registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MastodonHost {
    base_url: String,
    domain: String,
}

impl MastodonHost {
    /// Parse a server address such as `https://mastodon.social/about` or
    /// `mastodon.social`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(OAuthError::InvalidHost(input.to_string()));
        }

        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let url = Url::parse(&candidate).map_err(|_| OAuthError::InvalidHost(input.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OAuthError::InvalidHost(input.to_string()));
        }

        let domain = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OAuthError::InvalidHost(input.to_string()))?
            .to_string();

        let base_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), domain, port),
            None => format!("{}://{}", url.scheme(), domain),
        };

        Ok(Self { base_url, domain })
    }

    /// `scheme://host[:port]`, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bare hostname.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl FromStr for MastodonHost {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MastodonHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url_strips_path() {
        let host = MastodonHost::parse("https://mastodon.social/@alice?x=1").unwrap();
        assert_eq!(host.base_url(), "https://mastodon.social");
        assert_eq!(host.domain(), "mastodon.social");
    }

    #[test]
    fn test_parse_bare_hostname_defaults_to_https() {
        let host = MastodonHost::parse("  Fosstodon.org ").unwrap();
        assert_eq!(host.base_url(), "https://fosstodon.org");
        assert_eq!(host.domain(), "fosstodon.org");
    }

    #[test]
    fn test_parse_keeps_explicit_port() {
        let host = MastodonHost::parse("http://127.0.0.1:8081/").unwrap();
        assert_eq!(host.base_url(), "http://127.0.0.1:8081");
        assert_eq!(host.domain(), "127.0.0.1");
        assert_eq!(host.to_string(), "http://127.0.0.1:8081");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "   ", "https://", "ftp://mastodon.social", "http://exa mple.com"] {
            assert!(
                matches!(MastodonHost::parse(bad), Err(OAuthError::InvalidHost(_))),
                "expected InvalidHost for {:?}",
                bad
            );
        }
    }
}
