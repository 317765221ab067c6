//! Binary entry point: parses the CLI, validates configuration, wires the
//! cache/blocklist/resolver/pipeline together, and runs the UDP acceptor
//! until a shutdown signal arrives. Grounded on the teacher's `main.rs`
//! (parse config, build the long-lived components, enter the server loop)
//! with the teacher's `hickory-server`/zone/recursor wiring replaced by
//! this binary's forwarder pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use foredns::acceptor;
use foredns::blocklist::BlockTrie;
use foredns::cache::{self, AnswerCache};
use foredns::cli::Cli;
use foredns::config::AppConfig;
use foredns::lists;
use foredns::logging::{self, LogFileConfig};
use foredns::pipeline::Pipeline;
use foredns::resolver::Resolver;
use foredns::upstream::Upstream;

const CACHE_DUMP_PATH: &str = "cache.dump";
const LISTS_DUMP_PATH: &str = "lists.dump";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_blocklists {
        print!("{}", lists::render_catalogue());
        return Ok(());
    }

    let _log_guard = logging::init(LogFileConfig::from_cli(&cli));

    let config = AppConfig::from_cli(&cli)?;

    let blocklist = Arc::new(BlockTrie::load(&PathBuf::from(LISTS_DUMP_PATH))?);
    tracing::info!(entries = "loaded", path = LISTS_DUMP_PATH, "blocklist snapshot restored");

    if !config.fetch_lists.is_empty() {
        let added = lists::ingest(&blocklist, &config.fetch_lists).await?;
        tracing::info!(added, "block-list ingest complete");
        blocklist.dump(&PathBuf::from(LISTS_DUMP_PATH))?;
    }

    let cache = Arc::new(AnswerCache::new(config.cache_expiration));
    cache.load(&PathBuf::from(CACHE_DUMP_PATH)).await?;

    let upstreams = config
        .upstreams
        .iter()
        .map(|(addr, tls_name)| {
            Arc::new(Upstream::new(*addr, config.dns_client_net, tls_name.as_deref(), config.dns_client_timeout))
        })
        .collect();
    let resolver = Arc::new(Resolver::new(upstreams));

    let pipeline = Arc::new(Pipeline::new(blocklist, cache.clone(), resolver.clone()));

    let shutdown = CancellationToken::new();

    if config.cache_dns_refresh {
        let cache = cache.clone();
        let resolver = resolver.clone();
        tokio::spawn(cache::run_refresh_task(cache, resolver, std::time::Duration::from_secs(30)));
    }

    if config.cache_persist {
        let cache = cache.clone();
        tokio::spawn(cache::run_dump_task(cache, PathBuf::from(CACHE_DUMP_PATH), cache::DEFAULT_DUMP_INTERVAL));
    }

    tokio::spawn(acceptor::wait_for_shutdown_signal(shutdown.clone()));

    acceptor::serve(config.addr, pipeline, shutdown).await?;

    if config.cache_persist {
        cache.save(&PathBuf::from(CACHE_DUMP_PATH)).await?;
    }

    Ok(())
}
