//! The query pipeline (spec §4.5): per-datagram handling, implementing the
//! state machine `Parsed -> (Local | CacheHit | Blocked | Resolved |
//! Dropped)`. Grounded on `original_source/names.go::handleUDP`, reworked
//! into detached tokio tasks for the asynchronous cache writes the teacher
//! itself uses in `handler.rs` (`spawn(async move { refresh_answer_cache
//! ... })`).

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use crate::blocklist::BlockTrie;
use crate::cache::{AnswerCache, CacheEntry, CacheKey};
use crate::errors::ProtocolError;
use crate::resolver::Resolver;
use crate::wire;

/// Well-known loopback answer for the `local.` short-circuit and for
/// blocked names (spec §4.5 steps 2 and 4).
const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Terminal outcome of one query — used by tests and logging to assert the
/// state machine landed where it should (spec §4.5: "Parsed -> (Local |
/// CacheHit | Blocked | Resolved | Dropped)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Local,
    CacheHit,
    Blocked,
    Resolved,
    Dropped,
}

pub struct Pipeline {
    pub blocklist: Arc<BlockTrie>,
    pub cache: Arc<AnswerCache>,
    pub resolver: Arc<Resolver>,
}

impl Pipeline {
    pub fn new(blocklist: Arc<BlockTrie>, cache: Arc<AnswerCache>, resolver: Arc<Resolver>) -> Self {
        Self { blocklist, cache, resolver }
    }

    /// Handles one inbound datagram. Returns `None` when the query should
    /// be dropped silently (parse failure or upstream timeout) — the caller
    /// sends no reply.
    pub async fn handle(&self, raw: &[u8]) -> (Option<Vec<u8>>, Outcome) {
        let query = match wire::parse_query(raw) {
            Ok(q) => q,
            Err(ProtocolError::EmptyQuestion) | Err(ProtocolError::Decode(_)) => {
                tracing::debug!("dropping datagram with no usable question");
                return (None, Outcome::Dropped);
            }
        };

        let domain = query.domain();

        // Step 2: local short-circuit.
        if crate::blocklist::normalize(&domain) == "local" {
            let reply = wire::synthesize_answer(&query, &[LOOPBACK]);
            return (Some(reply), Outcome::Local);
        }

        let key = CacheKey::from_domain(&domain);

        // Step 3: cache lookup.
        if let Some(entry) = self.cache.get(&key).await {
            let reply = wire::synthesize_answer(&query, &[entry.value]);
            if entry.refresh {
                self.spawn_refresh(key, raw.to_vec());
            }
            return (Some(reply), Outcome::CacheHit);
        }

        // Step 4: blocklist.
        if self.blocklist.is_blocked(&domain) {
            let reply = wire::synthesize_answer(&query, &[LOOPBACK]);
            self.spawn_cache_set(key, CacheEntry::new(LOOPBACK, false, String::new(), raw.to_vec()));
            return (Some(reply), Outcome::Blocked);
        }

        // Step 5: upstream race.
        match self.resolver.resolve(&query).await {
            Ok(resolved) => {
                let reply = wire::synthesize_answer(&query, &[resolved.address]);
                self.spawn_cache_set(
                    key,
                    CacheEntry::new(resolved.address, true, resolved.upstream, raw.to_vec()),
                );
                (Some(reply), Outcome::Resolved)
            }
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "upstream race failed, dropping query");
                (None, Outcome::Dropped)
            }
        }
    }

    fn spawn_cache_set(&self, key: CacheKey, entry: CacheEntry) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            cache.set(key, entry).await;
        });
    }

    fn spawn_refresh(&self, key: CacheKey, raw: Vec<u8>) {
        let cache = self.cache.clone();
        let resolver = self.resolver.clone();
        tokio::spawn(async move {
            let Ok(query) = wire::parse_query(&raw) else { return };
            if let Ok(resolved) = resolver.resolve(&query).await {
                cache
                    .set(key, CacheEntry::new(resolved.address, true, resolved.upstream, raw))
                    .await;
            }
        });
    }
}
