//! Client identification utilities
//!
//! Common functions for identifying clients via HTTP headers.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

/// Maximum User-Agent length kept for audit records
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Extract client IP address
///
/// The direct connection IP is the client unless it belongs to
/// `trusted_proxies`. Only then is X-Forwarded-For consulted, walking it
/// from the right and skipping further trusted hops.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
/// * `trusted_proxies` - Reverse proxies allowed to set X-Forwarded-For
///
/// ## Returns
/// The client IP address, or None if not determinable
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    let peer = direct_ip?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer);
    }

    let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
        return Some(peer);
    };

    let mut client = peer;
    for hop in xff.rsplit(',') {
        match hop.trim().parse::<IpAddr>() {
            Ok(ip) => {
                client = ip;
                if !trusted_proxies.contains(&ip) {
                    break;
                }
            }
            // Anything left of a garbled entry is unverifiable
            Err(_) => break,
        }
    }
    Some(client)
}

/// Extract the User-Agent header, truncated to [`MAX_USER_AGENT_LEN`] bytes
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())?
        .trim();

    if ua.is_empty() {
        return None;
    }

    let mut end = ua.len().min(MAX_USER_AGENT_LEN);
    while !ua.is_char_boundary(end) {
        end -= 1;
    }
    Some(ua[..end].to_string())
}

/// Key used to bucket a client for rate limiting
///
/// Requests whose address cannot be determined share one bucket.
pub fn rate_limit_key(ip: Option<IpAddr>) -> String {
    ip.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_extract_client_ip_direct() {
        let headers = HeaderMap::new();
        let direct = ip("127.0.0.1");

        assert_eq!(extract_client_ip(&headers, Some(direct), &[]), Some(direct));
        assert_eq!(extract_client_ip(&headers, None, &[]), None);
    }

    #[test]
    fn test_xff_ignored_from_untrusted_peer() {
        let headers = forwarded("192.168.1.1, 10.0.0.1");
        let peer = ip("203.0.113.5");

        assert_eq!(extract_client_ip(&headers, Some(peer), &[]), Some(peer));
        assert_eq!(
            extract_client_ip(&headers, Some(peer), &[ip("10.0.0.1")]),
            Some(peer)
        );
        assert_eq!(extract_client_ip(&headers, None, &[ip("10.0.0.1")]), None);
    }

    #[test]
    fn test_xff_from_trusted_proxy() {
        let proxy = ip("10.0.0.1");
        let headers = forwarded("198.51.100.7");

        assert_eq!(
            extract_client_ip(&headers, Some(proxy), &[proxy]),
            Some(ip("198.51.100.7"))
        );
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(proxy), &[proxy]),
            Some(proxy)
        );
    }

    #[test]
    fn test_xff_spoofed_prefix_is_skipped() {
        let proxies = [ip("10.0.0.1"), ip("10.0.0.2")];
        // Client sent "1.2.3.4" itself; the proxies appended the real hops
        let headers = forwarded("1.2.3.4, 198.51.100.7, 10.0.0.2");

        assert_eq!(
            extract_client_ip(&headers, Some(ip("10.0.0.1")), &proxies),
            Some(ip("198.51.100.7"))
        );
    }

    #[test]
    fn test_garbage_xff_falls_back() {
        let proxy = ip("10.1.1.1");
        let headers = forwarded("not-an-ip");
        assert_eq!(extract_client_ip(&headers, Some(proxy), &[proxy]), Some(proxy));

        let headers = forwarded("1.2.3.4, junk, 198.51.100.9");
        assert_eq!(
            extract_client_ip(&headers, Some(proxy), &[proxy]),
            Some(ip("198.51.100.9"))
        );
    }

    #[test]
    fn test_extract_user_agent() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_agent(&headers), None);

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 Test Browser"),
        );
        assert_eq!(
            extract_user_agent(&headers).as_deref(),
            Some("Mozilla/5.0 Test Browser")
        );
    }

    #[test]
    fn test_user_agent_truncated() {
        let mut headers = HeaderMap::new();
        let long = "a".repeat(MAX_USER_AGENT_LEN * 2);
        headers.insert(header::USER_AGENT, HeaderValue::from_str(&long).unwrap());
        assert_eq!(
            extract_user_agent(&headers).map(|ua| ua.len()),
            Some(MAX_USER_AGENT_LEN)
        );
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key(Some("10.0.0.7".parse().unwrap())), "10.0.0.7");
        assert_eq!(rate_limit_key(None), "unknown");
    }
}
