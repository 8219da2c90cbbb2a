// Scroll-position memory — remembers how far a user had scrolled each feed
// route so navigation can restore the position.
//
// An explicit, bounded service owned by the application for its lifetime
// and passed to whoever needs it. The key space is capped by an LRU so a
// client wandering through thousands of profile routes cannot grow the map
// without bound.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use lru::LruCache;

/// Default number of routes remembered.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEntry {
    /// Vertical offset in whatever unit the client renders (pixels, rows).
    pub offset: f64,
    pub saved_at: DateTime<Utc>,
}

pub struct ScrollPositions {
    entries: Mutex<LruCache<String, ScrollEntry>>,
}

impl ScrollPositions {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Remember the offset for a route, evicting the least-recently-used
    /// route when full.
    pub fn save(&self, route: &str, offset: f64) {
        let entry = ScrollEntry {
            offset,
            saved_at: Utc::now(),
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(route.to_string(), entry);
        }
    }

    /// The remembered offset for a route, if any. Marks the route as
    /// recently used.
    pub fn restore(&self, route: &str) -> Option<f64> {
        self.entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.get(route).map(|entry| entry.offset))
    }

    /// Drop a route's remembered position (e.g. after an explicit refresh,
    /// where restoring a stale offset would be wrong).
    pub fn clear(&self, route: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.pop(route);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ScrollPositions {
    fn default() -> Self {
        // DEFAULT_CAPACITY is non-zero
        Self::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN))
    }
}
