//! Typed error taxonomy (spec §7). Startup errors are fatal; per-query and
//! background errors are logged and swallowed at the boundary that owns them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid upstream {addr:?}: {source}")]
    InvalidUpstream {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("unknown block-list source {name:?}")]
    UnknownSource { name: String },
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("socket bind failed: {0}")]
    Bind(#[source] std::io::Error),
    #[error("socket read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("socket write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("snapshot read failed ({path}): {source}")]
    SnapshotRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot write failed ({path}): {source}")]
    SnapshotWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to decode DNS message: {0}")]
    Decode(#[source] hickory_proto::ProtoError),
    #[error("message carried no question")]
    EmptyQuestion,
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream exchange timed out")]
    Timeout,
    #[error("no upstream answered within the deadline")]
    RaceTimeout,
    #[error("upstream {addr} exchange failed: {source}")]
    Exchange {
        addr: String,
        #[source]
        source: hickory_resolver::ResolveError,
    },
    #[error("upstream {addr} returned an empty answer section")]
    EmptyAnswer { addr: String },
}

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("{0}")]
    Other(String),
}
