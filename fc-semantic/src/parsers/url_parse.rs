// fc-semantic/src/parsers/url_parse.rs
// ============================================================================
// Module: URL Parser
// Description: Structured URL view with an independent internal-host check.
// Purpose: Give semantic rules scheme/host/query signal without re-parsing.
// Dependencies: url
// ============================================================================

//! ## Overview
//! `is_internal` here is an independent classification from the SSRF
//! validator's (`fc-validate`'s `network_ssrf`) — both apply the same
//! private/loopback/link-local rules against the same IP literal or
//! `localhost` alias, but neither calls into the other. A semantic-guard
//! rule flagging an internal host and the SSRF validator blocking it are
//! expected to agree; disagreement between them would indicate one side
//! drifted, not that one is authoritative.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::IpAddr;

use url::Url;

// ============================================================================
// SECTION: Analysis
// ============================================================================

/// Structured view of one URL-shaped string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlAnalysis {
    /// Whether the string parsed as a URL at all.
    pub valid: bool,
    /// Scheme, lowercased.
    pub scheme: Option<String>,
    /// Hostname, if present.
    pub host: Option<String>,
    /// Port, explicit or scheme-default.
    pub port: Option<u16>,
    /// Path component.
    pub path: Option<String>,
    /// Raw query string.
    pub query: Option<String>,
    /// Query string, split into repeated key/value groups.
    pub query_params: BTreeMap<String, Vec<String>>,
    /// Fragment component.
    pub fragment: Option<String>,
    /// `host[:port]` as it appeared in the URL.
    pub netloc: Option<String>,
    /// Whether `host` resolves to a loopback, private, or link-local range.
    pub is_internal: bool,
}

/// Parses `url_str`, returning `UrlAnalysis { valid: false, .. }` rather
/// than an error when parsing fails — an invalid URL is still signal a
/// rule may want to act on.
#[must_use]
pub fn parse(url_str: &str) -> UrlAnalysis {
    let Ok(parsed) = Url::parse(url_str) else {
        return UrlAnalysis { valid: false, ..UrlAnalysis::default() };
    };

    let host = parsed.host_str().map(str::to_string);
    let query_params = parsed.query_pairs().fold(BTreeMap::<String, Vec<String>>::new(), |mut acc, (key, value)| {
        acc.entry(key.into_owned()).or_default().push(value.into_owned());
        acc
    });
    let is_internal = host.as_deref().is_some_and(is_internal_host);

    UrlAnalysis {
        valid: true,
        scheme: Some(parsed.scheme().to_lowercase()),
        netloc: host.as_ref().map(|h| match parsed.port() {
            Some(port) => format!("{h}:{port}"),
            None => h.clone(),
        }),
        port: parsed.port(),
        path: Some(parsed.path().to_string()),
        query: parsed.query().map(str::to_string),
        fragment: parsed.fragment().map(str::to_string),
        is_internal,
        host,
        query_params,
    }
}

/// Checks whether `hostname` names a loopback, private, or link-local
/// host, or the bare `localhost` / `*.local` aliases.
#[must_use]
pub fn is_internal_host(hostname: &str) -> bool {
    let lower = hostname.to_lowercase();
    if lower == "localhost" || lower.ends_with(".local") {
        return true;
    }
    let Ok(ip) = lower.parse::<IpAddr>() else { return false };
    ip.is_loopback() || is_private(ip) || ip.is_unspecified() || is_link_local(ip)
}

fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

fn is_link_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_host_and_query() {
        let analysis = parse("https://example.com:8443/path?a=1&a=2#frag");
        assert!(analysis.valid);
        assert_eq!(analysis.scheme.as_deref(), Some("https"));
        assert_eq!(analysis.host.as_deref(), Some("example.com"));
        assert_eq!(analysis.port, Some(8443));
        assert_eq!(analysis.query_params.get("a"), Some(&vec!["1".to_string(), "2".to_string()]));
        assert_eq!(analysis.fragment.as_deref(), Some("frag"));
    }

    #[test]
    fn invalid_url_is_marked_invalid_not_errored() {
        let analysis = parse("not a url");
        assert!(!analysis.valid);
    }

    #[test]
    fn loopback_literal_is_internal() {
        let analysis = parse("http://127.0.0.1:8080/");
        assert!(analysis.is_internal);
    }

    #[test]
    fn public_host_is_not_internal() {
        let analysis = parse("https://example.com/");
        assert!(!analysis.is_internal);
    }

    #[test]
    fn localhost_alias_is_internal() {
        assert!(is_internal_host("localhost"));
        assert!(is_internal_host("printer.local"));
    }
}
