//! Custom Axum extractors.
//!
//! - `ClientIp`: the key requests are rate limited by
//! - `Nonce`: the per-request CSP nonce injected by the security middleware
//! - `BearerToken`: the caller's access token from `Authorization`
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(client_ip: ClientIp, nonce: Nonce) -> String {
//!     format!("{} {:?}", client_ip.0, nonce.0)
//! }
//! ```

use crate::middleware::NONCE_HEADER;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use std::net::SocketAddr;

/// Key used when nothing identifies the client.
pub const LOOPBACK_KEY: &str = "127.0.0.1";

/// Client address as a rate-limit key.
///
/// The request middleware stores the key it counted the request under, so
/// handlers see the same one. Without the middleware the key comes from the
/// connection address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(counted) = parts.extensions.get::<Self>() {
            return Ok(counted.clone());
        }
        Ok(Self(client_key(&parts.headers, parts.extensions.get(), false)))
    }
}

/// Extract the client key from connection info, or from forwarding headers
/// when `trust_proxy_headers` is set.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first entry), trusted proxies only
/// 2. `X-Real-IP`, trusted proxies only
/// 3. Connection address (needs `into_make_service_with_connect_info`)
/// 4. `127.0.0.1`
///
/// Forwarding headers are client-controlled unless a proxy in front
/// overwrites them. Behind a proxy that is not trusted, every client shares
/// the proxy's bucket.
#[must_use]
pub fn client_key(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        // Take the first entry
        if let Some(first) = header_value(headers, "X-Forwarded-For")
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return first.to_string();
        }

        if let Some(real_ip) = header_value(headers, "X-Real-IP") {
            return real_ip.to_string();
        }
    }

    connect_info.map_or_else(|| LOOPBACK_KEY.to_string(), |info| info.0.ip().to_string())
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// CSP nonce of the current request, if the security middleware ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for Nonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .headers
            .get(NONCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        Ok(Self(nonce))
    }
}

/// Access token from `Authorization: Bearer <token>`, if the caller sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = header_value(&parts.headers, AUTHORIZATION.as_str())
            .and_then(|value| {
                value
                    .split_once(' ')
                    .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            })
            .map(|(_, token)| token.trim())
            .filter(|token| !token.is_empty())
            .map(ToString::to_string);

        Ok(Self(token))
    }
}
