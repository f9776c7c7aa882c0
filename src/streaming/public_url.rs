//! Public base URL inference for addon and proxied stream URLs
//!
//! When the gateway is reached through a tunnel or reverse proxy, stream URLs
//! must point at the public address so remote players can fetch them through
//! the stream proxy. Requests arriving on a local or private address get
//! `None`, which keeps origin URLs direct.

use std::net::IpAddr;

use axum::http::HeaderMap;
use axum::http::header::HOST;
use tracing::{debug, warn};

use crate::config::WebConfig;

const CF_VISITOR: &str = "cf-visitor";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Host without port or IPv6 brackets
fn bare_host(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    // A single colon separates a port; more than one is a bare IPv6 address
    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

/// Localhost, loopback, private LAN and link-local addresses never make a
/// public base
pub fn is_private_host(host: &str) -> bool {
    let host = bare_host(host.trim());
    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>().map(is_private_ip).unwrap_or(false)
}

/// A configured base, accepted only when it parses and its host is public
fn configured_base(name: &str, value: Option<&str>) -> Option<String> {
    let base = value.map(|v| v.trim().trim_end_matches('/'))?;
    if base.is_empty() {
        return None;
    }
    match url::Url::parse(base) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !is_private_host(host) => {
                debug!("Using configured {}: {}", name, base);
                Some(base.to_string())
            }
            _ => {
                warn!("Configured {} has a private host, ignoring: {}", name, base);
                None
            }
        },
        Err(e) => {
            warn!("Configured {} is not a valid URL ({}), ignoring", name, e);
            None
        }
    }
}

fn inferred_base(headers: &HeaderMap) -> Option<String> {
    let mut scheme = "https".to_string();
    if let Some(visitor) = header(headers, CF_VISITOR) {
        let visitor = visitor.to_ascii_lowercase();
        if visitor.contains("https") {
            scheme = "https".to_string();
        } else if visitor.contains("http") {
            scheme = "http".to_string();
        }
    }
    if let Some(proto) = header(headers, X_FORWARDED_PROTO) {
        scheme = proto.to_ascii_lowercase();
    }

    let host = header(headers, X_FORWARDED_HOST)
        .or_else(|| header(headers, HOST.as_str()))
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|h| !h.is_empty())?;

    if is_private_host(host) {
        return None;
    }

    let host = match scheme.as_str() {
        "https" => host.strip_suffix(":443").unwrap_or(host),
        "http" => host.strip_suffix(":80").unwrap_or(host),
        _ => host,
    };
    let base = format!("{scheme}://{host}");
    debug!("Inferred public base: {}", base);
    Some(base)
}

/// Public base URL (no trailing slash) for addon responses, or `None` for
/// local/direct use
pub fn public_base_url(headers: &HeaderMap, configured: Option<&str>) -> Option<String> {
    configured_base("public_base_url", configured).or_else(|| inferred_base(headers))
}

/// Base for proxied stream URLs: the dedicated streaming base when set,
/// otherwise the public base
pub fn public_streaming_base_url(headers: &HeaderMap, web: &WebConfig) -> Option<String> {
    configured_base(
        "public_streaming_base_url",
        web.public_streaming_base_url.as_deref(),
    )
    .or_else(|| public_base_url(headers, web.public_base_url.as_deref()))
}
