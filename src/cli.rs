//! Flat CLI surface (spec §6), via `clap` derive — the same crate and
//! derive style the teacher's `main.rs` reaches for, just without the
//! teacher's TOML config file layer, since spec.md keeps everything on the
//! command line.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "foredns", about = "Caching, filtering, recursive-style DNS forwarder")]
pub struct Cli {
    /// Listen address for inbound UDP DNS queries.
    #[arg(long, default_value = "127.0.0.1:53")]
    pub addr: String,

    /// Transport used to reach upstream resolvers.
    #[arg(long = "dns-client-net", default_value = "tcp-tls")]
    pub dns_client_net: String,

    /// Per-exchange timeout, in seconds, for a single upstream.
    #[arg(long = "dns-client-timeout", default_value_t = 2)]
    pub dns_client_timeout: u64,

    /// Answer cache entry lifetime, in seconds. 0 disables expiry.
    #[arg(long = "cache-expiration", default_value_t = 0)]
    pub cache_expiration: u64,

    /// Enable background re-resolution of cache entries marked refreshable.
    #[arg(long = "cache-dns-refresh", default_value_t = false)]
    pub cache_dns_refresh: bool,

    /// Enable periodic snapshotting of the answer cache to `cache.dump`.
    #[arg(long = "cache-persist", default_value_t = false)]
    pub cache_persist: bool,

    /// Write logs to this rotating file instead of stderr only.
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Rotate the log file once it exceeds this many bytes.
    #[arg(long = "log-max-size")]
    pub log_max_size: Option<usize>,

    /// Number of rotated log files to retain.
    #[arg(long = "log-file-retention")]
    pub log_file_retention: Option<usize>,

    /// Discard rotated log files older than this many days.
    ///
    /// Accepted for parity with the rotation policy this forwarder was
    /// modeled on; `file-rotate` prunes by count, not age, so this value is
    /// currently unenforced (see DESIGN.md).
    #[arg(long = "log-max-age")]
    pub log_max_age: Option<u64>,

    /// Compress rotated log files.
    #[arg(long = "log-compress", default_value_t = false)]
    pub log_compress: bool,

    /// Fetch and ingest the named block-list catalogue sources at startup.
    #[arg(long = "fetch-lists", num_args = 0..)]
    pub fetch_lists: Vec<String>,

    /// Print the embedded block-list source catalogue and exit.
    #[arg(long = "list-blocklists", default_value_t = false)]
    pub list_blocklists: bool,

    /// Upstream resolvers to race queries across, `host:port` pairs.
    #[arg(long = "upstreams", num_args = 0..)]
    pub upstreams: Vec<String>,
}
