//! Tile cache for map-style widgets.
//!
//! Fetching is the host's job: the cache records a [`TileState::Pending`]
//! entry, asks the [`TileSource`] to start a fetch, and the host later calls
//! [`TileCache::complete`] with the outcome. Failed tiles stay failed until
//! an explicit retry; there is no automatic backoff.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Address of one tile in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Tile fetch errors.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    #[error("tile fetch failed: {0}")]
    Fetch(String),
}

/// Lifecycle of one cached tile.
#[derive(Debug, Clone)]
pub enum TileState {
    /// Fetch initiated, no outcome yet.
    Pending,
    /// Encoded image bytes, ready to draw.
    Ready(Rc<Vec<u8>>),
    /// Fetch failed; kept until a retry is requested.
    Failed(String),
}

impl TileState {
    /// Whether the tile can be drawn.
    pub fn is_ready(&self) -> bool {
        matches!(self, TileState::Ready(_))
    }
}

/// Starts tile fetches. Implementations are fire-and-forget; the host
/// resolves each fetch by calling [`TileCache::complete`].
pub trait TileSource {
    fn fetch(&self, key: TileKey);
}

/// A source that never fetches, for tests and offline use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTileSource;

impl TileSource for NullTileSource {
    fn fetch(&self, _key: TileKey) {}
}

/// Bounded tile cache with insertion-order eviction.
pub struct TileCache {
    source: Rc<dyn TileSource>,
    entries: HashMap<TileKey, TileState>,
    order: VecDeque<TileKey>,
    capacity: usize,
}

impl TileCache {
    /// Default cache capacity in tiles.
    pub const DEFAULT_CAPACITY: usize = 150;

    /// Create a cache with the default capacity.
    pub fn new(source: Rc<dyn TileSource>) -> Self {
        Self::with_capacity(source, Self::DEFAULT_CAPACITY)
    }

    /// Create a cache with an explicit capacity.
    pub fn with_capacity(source: Rc<dyn TileSource>, capacity: usize) -> Self {
        Self {
            source,
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up a tile, initiating a fetch on first sight.
    ///
    /// May evict the oldest entry, loaded or not, to stay within capacity.
    pub fn request(&mut self, key: TileKey) -> &TileState {
        if !self.entries.contains_key(&key) {
            if self.entries.len() >= self.capacity {
                self.evict_oldest();
            }
            self.entries.insert(key, TileState::Pending);
            self.order.push_back(key);
            self.source.fetch(key);
        }
        // Inserted above when absent.
        &self.entries[&key]
    }

    /// Resolve a fetch. Outcomes for evicted keys are dropped.
    pub fn complete(&mut self, key: TileKey, result: Result<Vec<u8>, TileError>) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        *entry = match result {
            Ok(bytes) => TileState::Ready(Rc::new(bytes)),
            Err(err) => {
                log::warn!("tile {key}: {err}");
                TileState::Failed(err.to_string())
            }
        };
    }

    /// Bytes of a ready tile.
    pub fn bytes(&self, key: TileKey) -> Option<Rc<Vec<u8>>> {
        match self.entries.get(&key) {
            Some(TileState::Ready(bytes)) => Some(Rc::clone(bytes)),
            _ => None,
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of failed tiles currently held.
    pub fn failed_count(&self) -> usize {
        self.entries
            .values()
            .filter(|state| matches!(state, TileState::Failed(_)))
            .count()
    }

    /// Drop failed entries so the next request fetches them again.
    pub fn retry_failed(&mut self) {
        let failed: Vec<TileKey> = self
            .entries
            .iter()
            .filter(|(_, state)| matches!(state, TileState::Failed(_)))
            .map(|(key, _)| *key)
            .collect();
        for key in failed {
            self.entries.remove(&key);
            self.order.retain(|k| *k != key);
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            self.entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every fetch it is asked to start.
    #[derive(Default)]
    struct RecordingSource {
        fetched: RefCell<Vec<TileKey>>,
    }

    impl TileSource for RecordingSource {
        fn fetch(&self, key: TileKey) {
            self.fetched.borrow_mut().push(key);
        }
    }

    fn key(z: u8, x: u32, y: u32) -> TileKey {
        TileKey { z, x, y }
    }

    #[test]
    fn test_first_request_is_pending_and_fetches() {
        let source = Rc::new(RecordingSource::default());
        let mut cache = TileCache::new(Rc::clone(&source) as Rc<dyn TileSource>);

        let state = cache.request(key(3, 1, 2));
        assert!(matches!(state, TileState::Pending));
        assert_eq!(source.fetched.borrow().len(), 1);

        // A second request does not refetch.
        cache.request(key(3, 1, 2));
        assert_eq!(source.fetched.borrow().len(), 1);
    }

    #[test]
    fn test_complete_makes_tile_ready() {
        let mut cache = TileCache::new(Rc::new(NullTileSource));
        cache.request(key(3, 1, 2));
        cache.complete(key(3, 1, 2), Ok(vec![1, 2, 3]));

        assert!(cache.request(key(3, 1, 2)).is_ready());
        assert_eq!(cache.bytes(key(3, 1, 2)).unwrap().as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_complete_for_unknown_key_is_dropped() {
        let mut cache = TileCache::new(Rc::new(NullTileSource));
        cache.complete(key(9, 9, 9), Ok(vec![1]));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_is_insertion_ordered() {
        let mut cache = TileCache::with_capacity(Rc::new(NullTileSource), 3);
        for x in 0..3 {
            cache.request(key(1, x, 0));
        }
        assert_eq!(cache.len(), 3);

        cache.request(key(1, 3, 0));
        assert_eq!(cache.len(), 3);
        // The first-inserted key is gone; a late completion for it is dropped.
        cache.complete(key(1, 0, 0), Ok(vec![1]));
        assert!(cache.bytes(key(1, 0, 0)).is_none());
    }

    #[test]
    fn test_failed_tiles_surface_and_retry() {
        let source = Rc::new(RecordingSource::default());
        let mut cache = TileCache::new(Rc::clone(&source) as Rc<dyn TileSource>);

        cache.request(key(2, 0, 0));
        cache.complete(key(2, 0, 0), Err(TileError::Fetch("timeout".into())));
        assert_eq!(cache.failed_count(), 1);

        // Failed stays failed; no implicit refetch on request.
        assert!(matches!(cache.request(key(2, 0, 0)), TileState::Failed(_)));
        assert_eq!(source.fetched.borrow().len(), 1);

        cache.retry_failed();
        assert_eq!(cache.failed_count(), 0);
        assert!(matches!(cache.request(key(2, 0, 0)), TileState::Pending));
        assert_eq!(source.fetched.borrow().len(), 2);
    }

    #[test]
    fn test_display_key() {
        assert_eq!(key(12, 2200, 1343).to_string(), "12/2200/1343");
    }
}
