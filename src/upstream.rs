//! One pooled, TLS-capable DNS client per configured upstream (spec §4.3),
//! built the same way the teacher's `forwarder.rs` builds its forwarding
//! resolver: a single-nameserver `hickory_resolver::TokioResolver` with its
//! own internal connection pool. Unlike the teacher, each `Upstream` here
//! pins exactly one nameserver so the race in `resolver.rs` controls
//! fan-out itself instead of delegating it to hickory's internal
//! nameserver selection.

use hickory_proto::rr::{Name, RecordType};
use hickory_proto::xfer::Protocol;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_proto::ProtoErrorKind;
use hickory_resolver::{ResolveErrorKind, TokioResolver};
use std::net::SocketAddr;
use std::time::Duration;

use crate::errors::UpstreamError;

/// Transport used to reach upstreams — CLI-configurable via
/// `--dns-client-net` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
    TcpTls,
}

impl Transport {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "udp" => Some(Self::Udp),
            "tcp" => Some(Self::Tcp),
            "tcp-tls" | "tls" => Some(Self::TcpTls),
            _ => None,
        }
    }

    fn protocol(self) -> Protocol {
        match self {
            Transport::Udp => Protocol::Udp,
            Transport::Tcp => Protocol::Tcp,
            Transport::TcpTls => Protocol::Tls,
        }
    }
}

/// A single configured upstream resolver.
pub struct Upstream {
    pub addr: SocketAddr,
    resolver: TokioResolver,
}

impl Upstream {
    pub fn new(addr: SocketAddr, transport: Transport, tls_name: Option<&str>, timeout: Duration) -> Self {
        let mut ns = NameServerConfig::new(addr, transport.protocol());
        ns.tls_dns_name = tls_name.map(|s| s.to_string());
        ns.trust_negative_responses = true;

        let mut config = ResolverConfig::new();
        config.add_name_server(ns);

        let mut opts = ResolverOpts::default();
        opts.cache_size = 0; // this binary owns caching, not the per-upstream client
        opts.timeout = timeout;
        opts.attempts = 1; // retries/backoff are explicitly out of scope (spec §4.4)

        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();

        Self { addr, resolver }
    }

    pub fn display(&self) -> String {
        self.addr.to_string()
    }

    /// Sends one question, returns the records from the answer section.
    /// Empty answer sections are surfaced as `UpstreamError::EmptyAnswer`
    /// (spec §4.4: "empty answer sections are treated as no-result"); a
    /// timed-out exchange is reported as `UpstreamError::Timeout` rather
    /// than the generic `Exchange` variant, so callers and logs can tell
    /// "this upstream was slow" apart from "this upstream rejected it".
    pub async fn exchange(&self, qname: Name, qtype: RecordType) -> Result<Vec<hickory_proto::rr::Record>, UpstreamError> {
        let lookup = self.resolver.lookup(qname, qtype).await.map_err(|source| {
            let is_timeout = matches!(
                source.kind(),
                ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout)
            );
            if is_timeout {
                UpstreamError::Timeout
            } else {
                UpstreamError::Exchange { addr: self.display(), source }
            }
        })?;

        let records: Vec<_> = lookup.records().to_vec();
        if records.is_empty() {
            return Err(UpstreamError::EmptyAnswer { addr: self.display() });
        }
        Ok(records)
    }
}

/// Default upstream set (spec §6): Cloudflare / Quad9 / Google on 853, with
/// the TLS server names each provider publishes.
pub const DEFAULT_UPSTREAMS: &[(&str, &str)] = &[
    ("1.1.1.1:853", "cloudflare-dns.com"),
    ("9.9.9.9:853", "dns.quad9.net"),
    ("8.8.8.8:853", "dns.google"),
];

/// Looks up the well-known TLS server name for a default upstream address,
/// if any; custom upstreams fall back to no SNI validation name.
pub fn known_tls_name(addr: &SocketAddr) -> Option<&'static str> {
    DEFAULT_UPSTREAMS
        .iter()
        .find(|(a, _)| a.parse::<SocketAddr>().as_ref() == Ok(addr))
        .map(|(_, name)| *name)
}
