//! Outbound request planning.
//!
//! # Responsibilities
//! - Turn a route match plus the inbound request into an immutable
//!   outbound descriptor
//! - Populate forwarded headers so the backend can reconstruct the
//!   trust context it cannot observe itself
//! - Strip hop-by-hop headers
//!
//! # Design Decisions
//! - Pure function, no I/O, no mutation of the inbound request
//! - Forwarded headers are always rebuilt from the current request;
//!   inbound `x-forwarded-*` values are replaced, never passed through

use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{Method, Request, Uri};

use crate::routing::RouteMatch;

/// Headers that only describe the client↔gateway hop.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Immutable description of one outbound backend call.
#[derive(Debug)]
pub struct OutboundRequest {
    /// Target service name, for logging and error classification.
    pub service: String,

    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,

    /// Per-call deadline from the target's configuration.
    pub timeout: Duration,
}

impl OutboundRequest {
    /// Attach the inbound body and produce the request to execute.
    pub fn into_request(self, body: Body) -> Result<Request<Body>, axum::http::Error> {
        let mut request = Request::builder()
            .method(self.method)
            .uri(self.uri)
            .body(body)?;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

/// Plan the outbound call for a matched route.
///
/// `client_ip` is the resolved client identity (trusted-hop aware), not
/// the raw socket peer of an intermediate proxy.
pub fn plan(
    route: &RouteMatch<'_>,
    parts: &Parts,
    client_ip: IpAddr,
) -> Result<OutboundRequest, axum::http::Error> {
    let target = route.target;

    let authority: Authority = match target.base_url.port() {
        Some(port) => format!("{}:{}", target.base_url.host_str().unwrap_or_default(), port),
        None => target.base_url.host_str().unwrap_or_default().to_string(),
    }
    .parse()?;

    let scheme = if target.base_url.scheme() == "https" {
        Scheme::HTTPS
    } else {
        Scheme::HTTP
    };

    let path_and_query: PathAndQuery = match parts.uri.query() {
        Some(query) => format!("{}?{query}", route.rewritten_path).parse()?,
        None => route.rewritten_path.parse()?,
    };

    let uri = Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(path_and_query)
        .build()?;

    let mut headers = HeaderMap::with_capacity(parts.headers.len() + 3);
    for (name, value) in parts.headers.iter() {
        if is_hop_by_hop(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    // Host must follow the outbound authority; the original one travels
    // in x-forwarded-host instead. HTTP/2 requests carry it in the URI
    // authority rather than a host header.
    let original_host = headers.remove("host");

    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&client_ip.to_string())?,
    );
    match original_host {
        Some(host) => {
            headers.insert("x-forwarded-host", host);
        }
        None => {
            if let Some(authority) = parts.uri.authority() {
                headers.insert("x-forwarded-host", HeaderValue::from_str(authority.as_str())?);
            }
        }
    }
    headers.insert(
        "x-forwarded-proto",
        HeaderValue::from_static(
            parts
                .uri
                .scheme_str()
                .map(|s| if s == "https" { "https" } else { "http" })
                .unwrap_or("http"),
        ),
    );

    Ok(OutboundRequest {
        service: target.name.clone(),
        method: parts.method.clone(),
        uri,
        headers,
        timeout: target.timeout,
    })
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| name.as_str() == *h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceTargetConfig;
    use crate::routing::RoutingTable;

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("host", "gateway.local")
            .header("authorization", "Bearer token")
            .header("connection", "keep-alive")
            .header("x-forwarded-for", "6.6.6.6")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    fn auth_table() -> RoutingTable {
        RoutingTable::from_config(&[ServiceTargetConfig {
            name: "auth".into(),
            base_url: "http://127.0.0.1:3001".into(),
            path_prefix: "/api/auth".into(),
            rewrite_prefix: String::new(),
            timeout_ms: 5000,
        }])
    }

    #[test]
    fn test_plan_builds_rewritten_uri_with_query() {
        let table = auth_table();
        let route = table.resolve("/api/auth/login").unwrap();
        let parts = parts_for("/api/auth/login?remember=1");
        let client_ip: IpAddr = "203.0.113.9".parse().unwrap();

        let outbound = plan(&route, &parts, client_ip).unwrap();
        assert_eq!(outbound.uri.to_string(), "http://127.0.0.1:3001/login?remember=1");
        assert_eq!(outbound.method, Method::POST);
        assert_eq!(outbound.service, "auth");
    }

    #[test]
    fn test_plan_populates_forwarded_headers_from_current_request() {
        let table = auth_table();
        let route = table.resolve("/api/auth/login").unwrap();
        let parts = parts_for("/api/auth/login");
        let client_ip: IpAddr = "203.0.113.9".parse().unwrap();

        let outbound = plan(&route, &parts, client_ip).unwrap();
        // The inbound x-forwarded-for is replaced with the resolved client.
        assert_eq!(outbound.headers["x-forwarded-for"], "203.0.113.9");
        assert_eq!(outbound.headers["x-forwarded-host"], "gateway.local");
        assert_eq!(outbound.headers["x-forwarded-proto"], "http");
        // Host follows the outbound authority instead.
        assert!(outbound.headers.get("host").is_none());
    }

    #[test]
    fn test_plan_takes_host_from_uri_authority_when_header_absent() {
        let table = auth_table();
        let route = table.resolve("/api/auth/login").unwrap();
        // HTTP/2 style: the host lives in the URI, not a host header.
        let (parts, _) = Request::builder()
            .method(Method::POST)
            .uri("http://gateway.local:8443/api/auth/login")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let client_ip: IpAddr = "203.0.113.9".parse().unwrap();

        let outbound = plan(&route, &parts, client_ip).unwrap();
        assert_eq!(outbound.headers["x-forwarded-host"], "gateway.local:8443");
    }

    #[test]
    fn test_plan_strips_hop_by_hop_and_keeps_end_to_end() {
        let table = auth_table();
        let route = table.resolve("/api/auth/login").unwrap();
        let parts = parts_for("/api/auth/login");
        let client_ip: IpAddr = "203.0.113.9".parse().unwrap();

        let outbound = plan(&route, &parts, client_ip).unwrap();
        assert!(outbound.headers.get("connection").is_none());
        assert_eq!(outbound.headers["authorization"], "Bearer token");
    }
}
