//! Device fingerprint extractor.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use warden_core::client::ClientInfo;

/// Headers consulted for the client address, most specific first.
const IP_HEADERS: &[&str] = &["x-test-ip", "cf-connecting-ip", "x-real-ip"];

/// The calling device's fingerprint, derived from proxy headers, the socket
/// peer address and the user agent.
#[derive(Debug, Clone)]
pub struct ClientFingerprint(pub ClientInfo);

impl<S: Send + Sync> FromRequestParts<S> for ClientFingerprint {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let ip = client_ip(&parts.headers).or(peer);
        let user_agent = header(&parts.headers, "x-test-user-agent")
            .or_else(|| header(&parts.headers, "user-agent"));

        Ok(Self(ClientInfo::from_request_parts(
            ip.as_deref(),
            user_agent.as_deref(),
        )))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address from proxy headers; `x-forwarded-for` contributes its
/// first (originating) entry.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    IP_HEADERS
        .iter()
        .find_map(|name| header(headers, name))
        .or_else(|| {
            header(headers, "x-forwarded-for")
                .and_then(|list| list.split(',').next().map(|ip| ip.trim().to_string()))
                .filter(|ip| !ip.is_empty())
        })
}
