//! Fallback orchestration: header, then socket peer, then 0.0.0.0.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::http::{header::InvalidHeaderName, HeaderMap, HeaderName};
use serde::Serialize;

use crate::client_ip::error::ResolveError;
use crate::client_ip::parser::parse_candidates;
use crate::client_ip::trust::TrustedPrefixSet;
use crate::config::ClientIpConfig;

/// Where a resolved address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IpSource {
    Header,
    Peer,
    Unspecified,
}

impl IpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpSource::Header => "header",
            IpSource::Peer => "peer",
            IpSource::Unspecified => "unspecified",
        }
    }
}

/// The address a request is attributed to. Always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientIp {
    ip: IpAddr,
    source: IpSource,
}

impl ClientIp {
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn source(&self) -> IpSource {
        self.source
    }
}

impl fmt::Display for ClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ip.fmt(f)
    }
}

/// Resolves the originating client address of a request.
///
/// Holds only configuration; every call is independent, so one instance can
/// be shared behind an `Arc` by all request handlers.
#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    behind_proxy: bool,
    forwarded_header: Option<HeaderName>,
    trusted: TrustedPrefixSet,
}

impl ClientIpResolver {
    pub fn new(
        behind_proxy: bool,
        forwarded_header: Option<HeaderName>,
        trusted: TrustedPrefixSet,
    ) -> Self {
        Self {
            behind_proxy,
            forwarded_header,
            trusted,
        }
    }

    /// Build from the `[client_ip]` config section. An empty header name
    /// disables the header attempt.
    pub fn from_config(config: &ClientIpConfig) -> Result<Self, InvalidHeaderName> {
        let header = config.forwarded_header.trim();
        let forwarded_header = if header.is_empty() {
            None
        } else {
            Some(HeaderName::from_bytes(header.as_bytes())?)
        };
        Ok(Self::new(
            config.behind_proxy,
            forwarded_header,
            TrustedPrefixSet::new(&config.trusted_prefixes),
        ))
    }

    /// Header attempt enabled at all.
    pub fn uses_header(&self) -> bool {
        self.behind_proxy && self.forwarded_header.is_some()
    }

    pub fn trusted(&self) -> &TrustedPrefixSet {
        &self.trusted
    }

    /// Resolve a request given its headers and the transport peer address
    /// (`ip:port`, IPv6 bracketed).
    pub fn resolve(&self, headers: &HeaderMap, remote_addr: &str) -> ClientIp {
        if let (true, Some(name)) = (self.behind_proxy, &self.forwarded_header) {
            match self.resolve_from_header(name, headers) {
                Ok(ip) => {
                    return ClientIp {
                        ip,
                        source: IpSource::Header,
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        remote_addr = %remote_addr,
                        "Header resolution failed, falling back to peer address"
                    );
                }
            }
        }

        match Self::resolve_from_peer(remote_addr) {
            Ok(ip) => ClientIp {
                ip,
                source: IpSource::Peer,
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    remote_addr = %remote_addr,
                    "Unable to parse peer address, using unspecified address (0.0.0.0)"
                );
                ClientIp {
                    ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    source: IpSource::Unspecified,
                }
            }
        }
    }

    /// Rightmost untrusted address from the named header.
    ///
    /// Repeated header lines are joined in order, as if the proxies had
    /// appended to a single line.
    pub fn resolve_from_header(
        &self,
        name: &HeaderName,
        headers: &HeaderMap,
    ) -> Result<IpAddr, ResolveError> {
        let value = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .collect::<Vec<_>>()
            .join(",");
        let value = value.trim();
        if value.is_empty() {
            return Err(ResolveError::HeaderMissing(name.to_string()));
        }

        let candidates = parse_candidates(value);
        if candidates.is_empty() {
            return Err(ResolveError::NoParseableCandidate {
                header: name.to_string(),
                value: value.to_string(),
            });
        }

        let untrusted = self.trusted.filter_untrusted(candidates);
        select_rightmost(&untrusted).ok_or_else(|| ResolveError::AllCandidatesTrusted {
            header: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Address part of the transport peer `ip:port`.
    pub fn resolve_from_peer(remote_addr: &str) -> Result<IpAddr, ResolveError> {
        remote_addr
            .trim()
            .parse::<SocketAddr>()
            .map(|addr| addr.ip().to_canonical())
            .map_err(|_| ResolveError::MalformedPeerAddress(remote_addr.to_string()))
    }
}

/// Entries further left may have been written by the client itself; the
/// last one was written by the nearest hop we did not filter out.
pub fn select_rightmost(candidates: &[IpAddr]) -> Option<IpAddr> {
    candidates.last().copied()
}
