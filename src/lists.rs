//! Block-list source catalogue and ingest (spec §6, §4.1 population).
//! Grounded on `original_source/lists/lists.go`, which `go:embed`s a
//! `sources.json` catalogue and fetches/transforms each named source with
//! an embedded AWK rule; here the catalogue is embedded via
//! `include_str!` and each rule is interpreted by `transform::Rule` instead
//! of a general-purpose interpreter (see `transform.rs`).

use std::sync::Arc;

use serde::Deserialize;

use crate::blocklist::{normalize, reverse_domain, BlockTrie};
use crate::errors::ConfigError;
use crate::transform::Rule;

/// One entry in the embedded catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub descurl: Option<String>,
}

const CATALOGUE_JSON: &str = include_str!("../assets/sources.json");

/// Parses the embedded catalogue. Panics only if the shipped asset is
/// malformed, which would be a packaging bug caught immediately in any
/// test run, not a runtime condition.
pub fn catalogue() -> Vec<Source> {
    serde_json::from_str(CATALOGUE_JSON).expect("assets/sources.json must be valid")
}

/// Looks up a catalogue entry by name.
pub fn find(name: &str) -> Option<Source> {
    catalogue().into_iter().find(|s| s.name == name)
}

/// Fetches and ingests the named sources into `trie`, returning the number
/// of domains added. Unknown names are rejected up front (spec §7:
/// `ConfigError::UnknownSource`) so a typo on the command line fails fast
/// rather than silently ingesting nothing.
pub async fn ingest(trie: &Arc<BlockTrie>, names: &[String]) -> Result<usize, ConfigError> {
    let mut sources = Vec::with_capacity(names.len());
    for name in names {
        let source = find(name).ok_or_else(|| ConfigError::UnknownSource { name: name.clone() })?;
        sources.push(source);
    }

    let mut total = 0usize;
    for source in sources {
        match fetch(&source).await {
            Ok(body) => {
                let rule = if source.rule.is_empty() { Rule::identity() } else { Rule::parse(&source.rule) };
                let domains = rule.extract(&body);
                for domain in &domains {
                    trie.add(&reverse_domain(&normalize(domain)));
                }
                tracing::info!(source = %source.name, count = domains.len(), "ingested block-list source");
                total += domains.len();
            }
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "failed to fetch block-list source");
            }
        }
    }
    Ok(total)
}

async fn fetch(source: &Source) -> Result<String, reqwest::Error> {
    reqwest::get(&source.url).await?.error_for_status()?.text().await
}

/// Renders the catalogue for `--list-blocklists` (spec §6).
pub fn render_catalogue() -> String {
    let mut out = String::new();
    for source in catalogue() {
        out.push_str(&format!("{}\t{}\n", source.name, source.url));
        if let Some(focus) = &source.focus {
            out.push_str(&format!("\tfocus: {focus}\n"));
        }
        if let Some(size) = &source.size {
            out.push_str(&format!("\tsize: {size}\n"));
        }
    }
    out
}
