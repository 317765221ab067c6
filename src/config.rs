//! Validated startup configuration (spec §6, §7), built once from `Cli` and
//! handed to the rest of the binary. Grounded on the teacher's `config.rs`
//! shape (a single struct parsed up front and threaded through), adapted
//! from TOML-file parsing to CLI-flag validation since spec.md's surface is
//! flat flags, not a config file.

use std::net::SocketAddr;
use std::time::Duration;

use crate::cli::Cli;
use crate::errors::ConfigError;
use crate::upstream::{known_tls_name, Transport, DEFAULT_UPSTREAMS};

pub struct AppConfig {
    pub addr: SocketAddr,
    pub dns_client_net: Transport,
    pub dns_client_timeout: Duration,
    pub cache_expiration: Duration,
    pub cache_dns_refresh: bool,
    pub cache_persist: bool,
    pub upstreams: Vec<(SocketAddr, Option<String>)>,
    pub fetch_lists: Vec<String>,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let addr = cli.addr.parse().map_err(|source| ConfigError::InvalidAddr {
            addr: cli.addr.clone(),
            source,
        })?;

        let dns_client_net = Transport::parse(&cli.dns_client_net).unwrap_or(Transport::TcpTls);
        let dns_client_timeout = Duration::from_secs(cli.dns_client_timeout);
        let cache_expiration = Duration::from_secs(cli.cache_expiration);

        let upstreams = if cli.upstreams.is_empty() {
            DEFAULT_UPSTREAMS
                .iter()
                .map(|(addr, tls_name)| (addr.parse().expect("default upstream addresses are valid"), Some((*tls_name).to_string())))
                .collect()
        } else {
            let mut resolved = Vec::with_capacity(cli.upstreams.len());
            for raw in &cli.upstreams {
                let addr: SocketAddr = raw.parse().map_err(|source| ConfigError::InvalidUpstream {
                    addr: raw.clone(),
                    source,
                })?;
                let tls_name = known_tls_name(&addr).map(|s| s.to_string());
                resolved.push((addr, tls_name));
            }
            resolved
        };

        Ok(Self {
            addr,
            dns_client_net,
            dns_client_timeout,
            cache_expiration,
            cache_dns_refresh: cli.cache_dns_refresh,
            cache_persist: cli.cache_persist,
            upstreams,
            fetch_lists: cli.fetch_lists.clone(),
        })
    }
}
