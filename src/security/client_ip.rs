//! Client identity resolution.
//!
//! # Responsibilities
//! - Derive the effective client address from the socket peer and the
//!   configured number of trusted forwarding hops
//!
//! # Design Decisions
//! - With zero trusted hops the socket peer is the client and
//!   `x-forwarded-for` is ignored entirely; an untrusted header must
//!   never be used directly
//! - With N trusted hops the chain is `x-forwarded-for` entries plus the
//!   peer, and the client is the address N hops back from the end
//! - Anything unparsable falls back to the socket peer

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Resolve the effective client address.
pub fn client_identity(peer: IpAddr, headers: &HeaderMap, trusted_hops: usize) -> IpAddr {
    if trusted_hops == 0 {
        return peer;
    }

    let forwarded: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    // Chain is [forwarded..., peer]; the last `trusted_hops` entries are
    // our own infrastructure.
    let chain_len = forwarded.len() + 1;
    if chain_len <= trusted_hops {
        return peer;
    }

    let idx = chain_len - trusted_hops - 1;
    if idx == forwarded.len() {
        peer
    } else {
        forwarded[idx].parse().unwrap_or(peer)
    }
}
