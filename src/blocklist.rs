//! Reverse-domain trie blocklist (spec §4.1).
//!
//! Keys are the reversed, dot-trimmed domain, reversed by Unicode extended
//! grapheme cluster rather than by raw `char` so that a base code point and
//! any combining marks riding on it travel together. Storing domains
//! reversed puts the TLD first, so `example.com` and every subdomain of it
//! (`ads.example.com`, `a.b.example.com`, ...) share the trie path down to
//! `moc.elgoog.`; a blocked parent domain is then found as an ancestor node
//! on the walk for any subdomain query, which is what makes "block this
//! domain and everything under it" a prefix test. A `*.example.com` catalog
//! entry is just that same parent-domain block spelled with an explicit
//! wildcard marker: `normalize` strips the leading `*.` before reversal, so
//! it is stored and matched identically to a bare `example.com` entry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use unicode_segmentation::UnicodeSegmentation;

use crate::errors::IoError;

/// Reverses `s` by extended grapheme cluster, preserving invalid UTF-8 as a
/// single U+FFFD replacement unit rather than failing.
pub fn reverse_domain(s: &str) -> String {
    s.graphemes(true).rev().collect()
}

/// Reverses raw, possibly-invalid-UTF-8 bytes the same way.
pub fn reverse_domain_bytes(bytes: &[u8]) -> String {
    reverse_domain(&String::from_utf8_lossy(bytes))
}

/// Strips leading/trailing dots, lowercases, and drops a leading wildcard
/// marker (`*.example.com` -> `example.com`) — the normalization a domain
/// undergoes before it is reversed and keyed into the trie. A wildcard entry
/// needs no special representation in the trie itself: once stripped it is
/// a plain parent-domain entry, and parent-domain entries already match
/// every subdomain via the prefix walk (see the module doc comment).
pub fn normalize(domain: &str) -> String {
    let trimmed = domain.trim_matches('.').to_ascii_lowercase();
    trimmed.strip_prefix("*.").map(str::to_string).unwrap_or(trimmed)
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    terminal: bool,
}

impl Node {
    fn insert(&mut self, units: &[&str]) {
        match units.split_first() {
            None => self.terminal = true,
            Some((head, rest)) => self
                .children
                .entry((*head).to_string())
                .or_default()
                .insert(rest),
        }
    }

    fn contains(&self, units: &[&str]) -> bool {
        match units.split_first() {
            None => self.terminal,
            Some((head, rest)) => self
                .children
                .get(*head)
                .map(|n| n.contains(rest))
                .unwrap_or(false),
        }
    }

    /// Every terminal key encountered *along* the walk down `units` — i.e.
    /// the stored keys that are ancestors of (prefixes of) the query, not
    /// the other way around. Does not descend past the end of `units`: a
    /// stored key that merely extends beyond the query (a more specific
    /// subdomain) must not count as a match for the broader query.
    fn collect_prefixed(&self, units: &[&str], found: &mut Vec<String>, acc: &mut Vec<String>) {
        if self.terminal {
            found.push(acc.join(""));
        }
        if let Some((head, rest)) = units.split_first() {
            if let Some(child) = self.children.get(*head) {
                acc.push((*head).to_string());
                child.collect_prefixed(rest, found, acc);
                acc.pop();
            }
        }
    }

    fn collect_all(&self, acc: &mut Vec<String>, found: &mut Vec<String>) {
        if self.terminal {
            found.push(acc.join(""));
        }
        for (unit, child) in &self.children {
            acc.push(unit.clone());
            child.collect_all(acc, found);
            acc.pop();
        }
    }
}

/// A trie over reversed-domain grapheme sequences, shared behind an
/// `RwLock` since it is read in the hot path and written only at startup or
/// on a reload (spec §5: "any late additions must be expressed as
/// replacing the trie reference atomically, not mutating in place" — callers
/// achieve that by swapping an `Arc<BlockTrie>`, not by locking more finely
/// here).
#[derive(Debug, Default)]
pub struct BlockTrie {
    root: RwLock<Node>,
}

impl BlockTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a reversed-domain key. Idempotent.
    pub fn add(&self, key: &str) {
        let units: Vec<&str> = key.graphemes(true).collect();
        self.root.write().unwrap().insert(&units);
    }

    /// True iff the exact key is present.
    pub fn has(&self, key: &str) -> bool {
        let units: Vec<&str> = key.graphemes(true).collect();
        self.root.read().unwrap().contains(&units)
    }

    /// Stored keys that are prefixes of `key` — i.e. ancestor domains of the
    /// query, found while walking down `key`. A stored entry that extends
    /// *past* `key` (a more specific subdomain) is not a match: blocking
    /// `ads.example.com` must not block the broader `example.com`.
    pub fn prefix_members(&self, key: &str) -> Vec<String> {
        let units: Vec<&str> = key.graphemes(true).collect();
        let root = self.root.read().unwrap();
        let mut found = Vec::new();
        let mut acc = Vec::new();
        root.collect_prefixed(&units, &mut found, &mut acc);
        found
    }

    /// Exact-or-wildcard membership test used by the query pipeline.
    pub fn is_blocked(&self, domain: &str) -> bool {
        let key = reverse_domain(&normalize(domain));
        self.has(&key) || !self.prefix_members(&key).is_empty()
    }

    fn all_keys(&self) -> Vec<String> {
        let root = self.root.read().unwrap();
        let mut found = Vec::new();
        let mut acc = Vec::new();
        root.collect_all(&mut acc, &mut found);
        found
    }

    /// Snapshots the trie to `path` as a JSON array of reversed keys.
    pub fn dump(&self, path: &Path) -> Result<(), IoError> {
        let snapshot_path = || path.display().to_string();
        let keys = self.all_keys();
        let json = serde_json::to_vec(&keys).map_err(|e| IoError::SnapshotWrite {
            path: snapshot_path(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|source| IoError::SnapshotWrite { path: snapshot_path(), source })?;
        std::fs::rename(&tmp, path).map_err(|source| IoError::SnapshotWrite { path: snapshot_path(), source })
    }

    /// Loads a snapshot written by `dump`. Missing file is not an error.
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let trie = Self::new();
        let snapshot_path = || path.display().to_string();
        match std::fs::read(path) {
            Ok(bytes) => {
                let keys: Vec<String> = serde_json::from_slice(&bytes).map_err(|e| IoError::SnapshotRead {
                    path: snapshot_path(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                })?;
                for key in keys {
                    trie.add(&key);
                }
                Ok(trie)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(trie),
            Err(source) => Err(IoError::SnapshotRead { path: snapshot_path(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_round_trip_edge_cases() {
        assert_eq!(reverse_domain(""), "");
        assert_eq!(reverse_domain("X"), "X");
        assert_eq!(reverse_domain("b\u{0301}"), "b\u{0301}");
        assert_eq!(reverse_domain("ab\u{0301}cde"), "edcb\u{0301}a");
        assert_eq!(reverse_domain("google.com"), "moc.elgoog");
        assert_eq!(reverse_domain("😎⚽"), "⚽😎");
    }

    #[test]
    fn reverse_preserves_invalid_utf8_as_replacement() {
        let bytes = b"This \xc5 is invalid";
        let reversed = reverse_domain_bytes(bytes);
        assert!(reversed.contains('\u{FFFD}'));
    }

    #[test]
    fn reverse_twice_is_identity() {
        for s in ["google.com", "b\u{0301}cde", "犬 yzal", ""] {
            assert_eq!(reverse_domain(&reverse_domain(s)), s);
        }
    }

    #[test]
    fn add_is_idempotent() {
        let trie = BlockTrie::new();
        let key = reverse_domain("ads.example");
        trie.add(&key);
        trie.add(&key);
        trie.add(&key);
        assert!(trie.has(&key));
        assert_eq!(trie.prefix_members(&key).len(), 1);
    }

    #[test]
    fn exact_and_wildcard_membership() {
        let trie = BlockTrie::new();
        trie.add(&reverse_domain("example.com"));
        assert!(trie.has(&reverse_domain("example.com")));
        assert!(!trie.has(&reverse_domain("sub.example.com")));

        // A wildcard catalog entry is normalized (stripping "*.") before
        // insertion, so it becomes a plain parent-domain block.
        trie.add(&reverse_domain(&normalize("*.tracking.example")));
        let members = trie.prefix_members(&reverse_domain("ads.tracking.example"));
        assert_eq!(members.len(), 1);

        // A more specific subdomain entry must not match its broader parent.
        let specific = BlockTrie::new();
        specific.add(&reverse_domain("ads.doubleclick.net"));
        assert!(specific.prefix_members(&reverse_domain("doubleclick.net")).is_empty());
    }

    #[test]
    fn is_blocked_matches_exact_and_wildcard_entries() {
        let trie = BlockTrie::new();
        trie.add(&reverse_domain("ads.example"));
        assert!(trie.is_blocked("ads.example"));
        assert!(trie.is_blocked("ads.example."));
        assert!(!trie.is_blocked("safe.example"));

        trie.add(&reverse_domain(&normalize("*.tracking.example")));
        assert!(trie.is_blocked("tracking.example"));
        assert!(trie.is_blocked("ads.tracking.example"));
        assert!(!trie.is_blocked("tracking.example.evil.com"));
    }

    #[test]
    fn dump_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists.dump");

        let trie = BlockTrie::new();
        trie.add(&reverse_domain("ads.example"));
        trie.add(&reverse_domain("tracking.example"));
        trie.dump(&path).unwrap();

        let loaded = BlockTrie::load(&path).unwrap();
        assert!(loaded.is_blocked("ads.example"));
        assert!(loaded.is_blocked("tracking.example"));
        assert!(!loaded.is_blocked("safe.example"));
    }

    #[test]
    fn load_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.dump");
        let trie = BlockTrie::load(&path).unwrap();
        assert!(!trie.is_blocked("anything.example"));
    }
}
