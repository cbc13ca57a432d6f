//! Identity Resolver: a coarse, best-effort caller identifier.
//!
//! Every caller behind the same network address shares one identifier.
//! Collisions are accepted: this is a usage throttle, not authentication.

use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use tracing::debug;

use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const LOGIN_VARS: [&str; 3] = ["USER", "USERNAME", "LOGNAME"];

/// Derives the identifier from the peer address (or a trusted forwarded header),
/// falling back to the OS login name when no address is available.
pub fn resolve(peer: Option<SocketAddr>, headers: &HeaderMap, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => {
            debug!("No peer address available, using login name identity");
            login_identity(|key| std::env::var(key).ok())
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    first
        .parse::<std::net::IpAddr>()
        .ok()
        .map(|ip| ip.to_string())
}

/// `local:<login>` from the first non-empty login variable, else `local:unknown`.
pub fn login_identity<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let login = LOGIN_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    format!("local:{login}")
}

/// Axum extractor carrying the resolved caller identifier. Never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CallerId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(CallerId(resolve(
            peer,
            &parts.headers,
            state.config.trust_forwarded_for,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> Option<SocketAddr> {
        Some("203.0.113.9:51234".parse().unwrap())
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_peer_ip_without_port() {
        assert_eq!(resolve(peer(), &HeaderMap::new(), false), "203.0.113.9");
    }

    #[test]
    fn test_same_address_different_ports_collide() {
        let a: SocketAddr = "198.51.100.4:1000".parse().unwrap();
        let b: SocketAddr = "198.51.100.4:2000".parse().unwrap();
        assert_eq!(
            resolve(Some(a), &HeaderMap::new(), false),
            resolve(Some(b), &HeaderMap::new(), false)
        );
    }

    #[test]
    fn test_forwarded_header_ignored_unless_trusted() {
        let headers = forwarded("192.0.2.1, 10.0.0.1");
        assert_eq!(resolve(peer(), &headers, false), "203.0.113.9");
        assert_eq!(resolve(peer(), &headers, true), "192.0.2.1");
    }

    #[test]
    fn test_malformed_forwarded_header_falls_back_to_peer() {
        let headers = forwarded("not-an-ip");
        assert_eq!(resolve(peer(), &headers, true), "203.0.113.9");
    }

    #[test]
    fn test_no_peer_address_falls_back_to_login_identity() {
        let id = resolve(None, &HeaderMap::new(), false);
        assert!(id.starts_with("local:"), "{id}");
        assert!(id.len() > "local:".len());
    }

    #[test]
    fn test_no_peer_and_untrusted_header_still_uses_login_identity() {
        let id = resolve(None, &forwarded("192.0.2.1"), false);
        assert!(id.starts_with("local:"), "{id}");
    }

    #[test]
    fn test_login_identity_prefers_first_present_var() {
        let id = login_identity(|key| match key {
            "USERNAME" => Some("bhargav".to_string()),
            "LOGNAME" => Some("other".to_string()),
            _ => None,
        });
        assert_eq!(id, "local:bhargav");
    }

    #[test]
    fn test_login_identity_skips_blank_values() {
        let id = login_identity(|key| match key {
            "USER" => Some("  ".to_string()),
            "LOGNAME" => Some("ops".to_string()),
            _ => None,
        });
        assert_eq!(id, "local:ops");
    }

    #[test]
    fn test_login_identity_unknown_when_nothing_set() {
        assert_eq!(login_identity(|_| None), "local:unknown");
    }
}
