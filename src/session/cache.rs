// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded LRU cache of derived sessions.
//!
//! Derivation walks the staked validator set and hashes every candidate, so
//! sessions are derived once per header and reused until evicted by capacity
//! or cleared on a chain reorganization. No computation happens in here;
//! the cache only touches the map and the LRU order.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::{Session, SessionHeader};

/// In-process LRU cache of derived sessions, keyed by session header.
pub struct SessionCache {
    cache: Mutex<LruCache<SessionHeader, Session>>,
}

impl SessionCache {
    /// Create a cache holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
        }
    }

    /// Get the cached session for a header, promoting it on hit.
    pub fn get(&self, header: &SessionHeader) -> Option<Session> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(header).cloned()
    }

    /// Store a derived session, evicting the least-recently-used entry on
    /// overflow.
    pub fn put(&self, session: Session) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(session.header.clone(), session);
        }
    }

    /// Drop every cached session.
    ///
    /// Called when the state accessor signals a reorg or height rewind;
    /// sessions derived from orphaned blocks must not be served.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Number of cached sessions.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(height: i64) -> Session {
        Session {
            header: SessionHeader {
                application_public_key: hex::encode([3u8; 32]),
                blockchain: "0001".to_string(),
                session_block_height: height,
            },
            key: format!("{height:064x}"),
            nodes: vec![],
        }
    }

    #[test]
    fn put_and_get_by_header() {
        let cache = SessionCache::new(10);
        let s = session(1);
        assert!(cache.get(&s.header).is_none());

        cache.put(s.clone());
        assert_eq!(cache.get(&s.header), Some(s));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overflow_evicts_least_recently_used() {
        let cache = SessionCache::new(2);
        let (a, b, c) = (session(1), session(5), session(9));
        cache.put(a.clone());
        cache.put(b.clone());

        // touch `a` so `b` is the eviction victim
        assert!(cache.get(&a.header).is_some());
        cache.put(c.clone());

        assert!(cache.get(&a.header).is_some());
        assert!(cache.get(&b.header).is_none());
        assert!(cache.get(&c.header).is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = SessionCache::new(10);
        cache.put(session(1));
        cache.put(session(5));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&session(1).header).is_none());
    }
}
