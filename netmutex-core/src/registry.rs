//! # Sharded Mutex Registry
//!
//! 256 independently-locked shards holding `mutex_id_hex ⇄ resource_hash`
//! bidirectional maps. Resource names are SHA-256 hashed before they ever
//! touch a map, so the registry itself never stores plaintext resource
//! names. A mutex id's own shard is found by parsing its first two hex
//! digits, but a *resource* can land in any shard (shard placement tracks
//! the mutex id assigned to it, not the resource), so looking a resource up
//! means scanning every shard.
//!
//! Mirrors `hkv-engine`'s sharded `RwLock` map plus its background sweeper,
//! generalized from an LRU cache to a lease table.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use netmutex_common::NetMutexError;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::identity;

/// Number of independent shards. Fixed, not configurable: the shard count
/// is baked into `shard_index`'s two-hex-digit parse (0..=255).
pub const SHARD_COUNT: usize = 256;

/// How often the reaper wakes to sweep expired leases.
pub const REAPER_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct ShardState {
    mutex_to_resource: HashMap<String, String>,
    resource_to_mutex: HashMap<String, String>,
}

/// The registry. Cheaply cloneable via `Arc` for sharing between the
/// connection server and the reaper task.
pub struct Registry {
    shards: Vec<RwLock<ShardState>>,
    leases: RwLock<HashMap<String, Instant>>,
    /// Serializes the check-then-insert in `capture` across all shards.
    /// Without this, two concurrent `capture` calls on the same resource can
    /// both pass `find_by_hash` before either has inserted, and both would
    /// succeed — the shard `RwLock`s alone only protect a single map
    /// mutation, not the compound "is it free, then claim it" operation.
    capture_lock: Mutex<()>,
}

impl Registry {
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(SHARD_COUNT);
        for _ in 0..SHARD_COUNT {
            shards.push(RwLock::new(ShardState::default()));
        }
        Registry {
            shards,
            leases: RwLock::new(HashMap::new()),
            capture_lock: Mutex::new(()),
        }
    }

    /// Attempts to capture `resource`. Fails immediately (no queueing, no
    /// retry) if the resource is already held by another mutex — contended
    /// captures are never resolved by stealing the existing holder.
    ///
    /// `timeout_seconds == 0` means the mutex has no lease deadline and is
    /// only released by an explicit `release` call or client disconnect.
    /// Returns the new mutex id on success.
    pub async fn capture(&self, resource: &str, timeout_seconds: u64) -> Result<String, NetMutexError> {
        let resource_hash = hash_resource(resource);

        // Held for the whole check-and-insert: two concurrent captures of
        // the same resource must never both observe it as free.
        let _guard = self.capture_lock.lock().await;

        if let Some((_, existing)) = self.find_by_hash(&resource_hash).await {
            return Err(NetMutexError::ResourceLocked(existing));
        }

        let id = identity::new_id()?;
        let shard_idx = shard_index(&id);
        {
            let mut shard = self.shards[shard_idx].write().await;
            shard.mutex_to_resource.insert(id.clone(), resource_hash.clone());
            shard.resource_to_mutex.insert(resource_hash, id.clone());
        }
        if timeout_seconds > 0 {
            let deadline = Instant::now() + Duration::from_secs(timeout_seconds);
            self.leases.write().await.insert(id.clone(), deadline);
        }

        Ok(id)
    }

    /// Releases a previously captured mutex. Fails if `mutex_id` is unknown
    /// (already released, expired, or never issued). Returns the released
    /// id on success, mirroring the id the caller passed in.
    pub async fn release(&self, mutex_id: &str) -> Result<String, NetMutexError> {
        let shard_idx = shard_index(mutex_id);
        let removed = self.remove_from_shard(shard_idx, mutex_id).await;
        self.leases.write().await.remove(mutex_id);
        if removed {
            Ok(mutex_id.to_string())
        } else {
            Err(NetMutexError::UnknownMutex(mutex_id.to_string()))
        }
    }

    /// `true` if `mutex_id` currently names a captured mutex.
    pub async fn exists(&self, mutex_id: &str) -> bool {
        let shard_idx = shard_index(mutex_id);
        self.shards[shard_idx]
            .read()
            .await
            .mutex_to_resource
            .contains_key(mutex_id)
    }

    /// Hashes `resource` and scans shards to locate the mutex id currently
    /// holding it, if any.
    pub async fn find_mutex(&self, resource: &str) -> Option<String> {
        let resource_hash = hash_resource(resource);
        self.find_by_hash(&resource_hash).await.map(|(_, id)| id)
    }

    /// Scans shards outside-in (0, N-1, 1, N-2, ...) looking for a mutex id
    /// already holding `resource_hash`. Order is cosmetic: placement is
    /// hashed to an essentially arbitrary shard relative to the resource,
    /// so no scan order finds it meaningfully faster on average, but the
    /// outside-in order is kept here to mirror the original precisely.
    async fn find_by_hash(&self, resource_hash: &str) -> Option<(usize, String)> {
        for idx in scan_order(self.shards.len()) {
            let shard = self.shards[idx].read().await;
            if let Some(id) = shard.resource_to_mutex.get(resource_hash) {
                return Some((idx, id.clone()));
            }
        }
        None
    }

    async fn remove_from_shard(&self, shard_idx: usize, mutex_id: &str) -> bool {
        let mut shard = self.shards[shard_idx].write().await;
        if let Some(resource_hash) = shard.mutex_to_resource.remove(mutex_id) {
            shard.resource_to_mutex.remove(&resource_hash);
            true
        } else {
            false
        }
    }

    /// Releases every mutex whose lease deadline has passed. Returns the
    /// ids that were reaped, for logging.
    async fn sweep_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = {
            let leases = self.leases.read().await;
            leases
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(id, _)| id.clone())
                .collect()
        };
        let mut reaped = Vec::with_capacity(expired.len());
        for id in expired {
            if self.release(&id).await.is_ok() {
                reaped.push(id);
            } else {
                self.leases.write().await.remove(&id);
            }
        }
        reaped
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background lease reaper, waking every [`REAPER_PERIOD`] to
/// release expired mutexes. Runs until the returned handle is dropped or
/// aborted; the server aborts it during shutdown.
///
/// `on_expired` is called once per sweep with the number of mutexes reaped
/// (zero included), so a caller can feed a counter without `netmutex-core`
/// needing to know anything about `netmutex-server`'s `Metrics` type.
pub fn spawn_reaper(
    registry: Arc<Registry>,
    on_expired: impl Fn(usize) + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(REAPER_PERIOD).await;
            let reaped = registry.sweep_expired().await;
            on_expired(reaped.len());
            for id in &reaped {
                tracing::info!(mutex = %id, "lease expired, auto-released");
            }
        }
    })
}

/// SHA-256 hash of `resource`, hex-encoded. The registry never stores the
/// plaintext resource name, only this digest.
fn hash_resource(resource: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resource.as_bytes());
    identity::to_hex(&hasher.finalize())
}

/// Maps a mutex id to its shard by parsing the first two hex digits (one
/// byte, 0..=255) of the id. Ids are generated via [`identity::new_id`],
/// which always has at least two leading hex digits; ids arriving over the
/// wire are validated by the caller before this is invoked.
fn shard_index(mutex_id: &str) -> usize {
    let mut chars = mutex_id.chars().filter(|c| *c != '-');
    let hi = chars.next().and_then(identity::hex_digit).unwrap_or(0);
    let lo = chars.next().and_then(identity::hex_digit).unwrap_or(0);
    ((hi << 4) | lo) as usize % SHARD_COUNT
}

/// Outside-in traversal order over `0..count`: 0, count-1, 1, count-2, ...
fn scan_order(count: usize) -> Vec<usize> {
    let mut order = Vec::with_capacity(count);
    let mid = count / 2;
    for i in 0..mid {
        order.push(i);
        order.push(count - 1 - i);
    }
    if count % 2 == 1 {
        order.push(mid);
    }
    order
}
