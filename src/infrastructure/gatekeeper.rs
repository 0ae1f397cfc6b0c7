//! URL Gatekeeper: the SSRF-defense predicate applied before every outbound
//! feed request and again against the final URL of a redirect chain.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafeUrl {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("scheme not allowed: {0}")]
    InvalidScheme(String),

    #[error("host is a loopback, private, link-local, or internal address")]
    PrivateOrInternal,

    #[error("DNS resolution failed: {0}")]
    DnsResolutionFailed(String),
}

const METADATA_HOSTS: &[&str] = &["169.254.169.254", "100.100.100.200", "192.0.0.192"];

/// Pure textual check, performed before any DNS resolution runs: catches
/// loopback aliases, cloud metadata hostnames, and `.internal`/`.local`
/// suffixes even if the resolver itself is compromised, absent, or mocked.
fn textually_unsafe(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "0.0.0.0" {
        return true;
    }
    if METADATA_HOSTS.contains(&host.as_str()) {
        return true;
    }
    if host.ends_with(".internal") || host.ends_with(".local") {
        return true;
    }
    false
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() || ip.is_broadcast() {
        return true;
    }
    let o = ip.octets();
    // 10.0.0.0/8
    if o[0] == 10 {
        return true;
    }
    // 172.16.0.0/12
    if o[0] == 172 && (16..=31).contains(&o[1]) {
        return true;
    }
    // 192.168.0.0/16
    if o[0] == 192 && o[1] == 168 {
        return true;
    }
    // Documentation ranges, never publicly routable.
    if (o[0] == 192 && o[1] == 0 && o[2] == 2)
        || (o[0] == 198 && o[1] == 51 && o[2] == 100)
        || (o[0] == 203 && o[1] == 0 && o[2] == 113)
    {
        return true;
    }
    false
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    // Link-local fe80::/10
    if segments[0] & 0xffc0 == 0xfe80 {
        return true;
    }
    // Unique-local fc00::/7 (covers fd00::/8 named explicitly in the spec)
    if segments[0] & 0xfe00 == 0xfc00 {
        return true;
    }
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&v4);
    }
    false
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// `is_safe(url) -> bool` per spec — true when the URL may be fetched.
pub fn is_safe(url_str: &str) -> bool {
    validate(url_str).is_ok()
}

/// Same predicate, with the rejection reason preserved for logging.
pub fn validate(url_str: &str) -> Result<(), UnsafeUrl> {
    let url = Url::parse(url_str).map_err(|e| UnsafeUrl::InvalidUrl(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UnsafeUrl::InvalidScheme(scheme.to_string())),
    }

    let host = url
        .host_str()
        .ok_or_else(|| UnsafeUrl::InvalidUrl("no host in URL".to_string()))?;

    if textually_unsafe(host) {
        return Err(UnsafeUrl::PrivateOrInternal);
    }

    // A bare IP literal in the URL: check directly, no DNS round trip needed.
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(UnsafeUrl::PrivateOrInternal);
        }
        return Ok(());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|e| UnsafeUrl::DnsResolutionFailed(e.to_string()))?
        .collect();

    if addrs.is_empty() {
        return Err(UnsafeUrl::DnsResolutionFailed(
            "no addresses resolved".to_string(),
        ));
    }

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            tracing::warn!(
                "gatekeeper: {} resolves to private address {}",
                url_str,
                addr.ip()
            );
            return Err(UnsafeUrl::PrivateOrInternal);
        }
    }

    Ok(())
}
