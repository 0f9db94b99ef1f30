//! Time-bounded key/value cache.
//!
//! Entries are plain strings (callers serialize), keyed under a namespace,
//! and expire `ttl` after the last `put`. Read-read safe, last write wins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

/// Maximum lifetime the backend-facing caches use: 6 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(21_600);

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Clone)]
struct CachedValue {
    value: String,
    expires_at: Instant,
}

/// Shared TTL cache. Cloning shares the underlying store.
#[derive(Clone)]
pub struct TtlCache {
    entries: Arc<RwLock<HashMap<String, CachedValue>>>,
    namespace: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl TtlCache {
    pub fn new(namespace: impl Into<String>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            namespace: namespace.into(),
            ttl,
            clock,
        }
    }

    /// Cache with the wall clock and the default 6-hour ttl.
    pub fn with_defaults(namespace: impl Into<String>) -> Self {
        Self::new(namespace, DEFAULT_TTL, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Value for `key`, or `None` if never put or expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(&self.scoped(key))
            .and_then(|entry| (now < entry.expires_at).then(|| entry.value.clone()))
    }

    /// Store `value` with this cache's ttl.
    pub fn put(&self, key: &str, value: impl Into<String>) {
        self.put_with_ttl(key, value, self.ttl);
    }

    pub fn put_with_ttl(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write();
        // Expired entries are dropped lazily here rather than on read.
        let now = self.clock.now();
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(
            self.scoped(key),
            CachedValue {
                value: value.into(),
                expires_at,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries.write().remove(&self.scoped(key));
    }

    /// Drop every entry in this cache's namespace.
    pub fn clear(&self) {
        let prefix = format!("{}:", self.namespace);
        self.entries.write().retain(|k, _| !k.starts_with(&prefix));
    }
}
