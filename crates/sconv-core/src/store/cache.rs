//! The bounded expiring token store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::time::{Clock, Expirable};
use crate::token::{ContextId, KeyGeneration, SecurityContextToken};

/// Hard upper bound on store entries, independent of configuration.
pub const MAX_STORE_ENTRIES: usize = 65_536;

/// Default configured capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 1_024;

/// Configuration for [`TokenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStoreConfig {
    /// Maximum number of entries. Must be in `1..=MAX_STORE_ENTRIES`.
    pub max_entries: usize,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Errors from store operations.
///
/// Absent and expired entries are misses, not errors; publishing an expired
/// token is a [`PutOutcome`], not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The configured capacity is zero or exceeds the hard limit.
    #[error("configured capacity {requested} is outside 1..={max}")]
    CapacityOutOfRange {
        /// Capacity requested by the configuration.
        requested: usize,
        /// Hard upper bound.
        max: usize,
    },

    /// The internal lock was poisoned by a panicking writer.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Result of publishing a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The token was installed, replacing any prior entry for its key.
    Stored,
    /// The token's expiration had already passed; nothing was stored.
    AlreadyExpired,
}

/// Index key: conversation identity plus key generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StoreKey {
    context_id: ContextId,
    key_generation: Option<KeyGeneration>,
}

struct StoreEntry {
    token: Arc<SecurityContextToken>,
    inserted_seq: u64,
}

#[derive(Default)]
struct StoreIndex {
    entries: HashMap<StoreKey, StoreEntry>,
    /// Latest published generation per conversation, serving bare-identity
    /// lookups. An entry here always names a key present in `entries`.
    current: HashMap<ContextId, Option<KeyGeneration>>,
    next_seq: u64,
}

/// Bounded in-memory store of live security context tokens.
///
/// Reads are concurrent; `put`/`remove`/`sweep` serialize against each
/// other and against readers through the interior `RwLock`.
pub struct TokenStore {
    config: TokenStoreConfig,
    clock: Arc<dyn Clock>,
    inner: RwLock<StoreIndex>,
}

impl TokenStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            config: TokenStoreConfig::default(),
            clock,
            inner: RwLock::new(StoreIndex::default()),
        }
    }

    /// Creates a store with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CapacityOutOfRange`] when `max_entries` is zero
    /// or exceeds [`MAX_STORE_ENTRIES`].
    pub fn with_config(config: TokenStoreConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        if config.max_entries == 0 || config.max_entries > MAX_STORE_ENTRIES {
            return Err(StoreError::CapacityOutOfRange {
                requested: config.max_entries,
                max: MAX_STORE_ENTRIES,
            });
        }
        Ok(Self {
            config,
            clock,
            inner: RwLock::new(StoreIndex::default()),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenStoreConfig {
        &self.config
    }

    /// Number of indexed entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.entries.len())
    }

    /// Whether the store holds no entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.entries.is_empty())
    }

    /// Publishes a token under its (identity, generation) key.
    ///
    /// Replaces any prior entry with the same key and makes this generation
    /// the conversation's current one. Expired entries are swept first; on
    /// overflow the soonest-to-expire entry is evicted, oldest-inserted
    /// breaking ties.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn put(&self, token: Arc<SecurityContextToken>) -> Result<PutOutcome, StoreError> {
        let now = self.clock.now();
        if token.expires_at() <= now {
            warn!(
                context_id = %token.context_id(),
                instance_id = %token.instance_id(),
                expires_at = %token.expires_at(),
                "rejected already-expired token"
            );
            return Ok(PutOutcome::AlreadyExpired);
        }

        let key = StoreKey {
            context_id: token.context_id().clone(),
            key_generation: token.key_generation().cloned(),
        };

        let mut index = self.write()?;
        Self::sweep_locked(&mut index, now);

        // Replacing an existing key does not change the entry count, so it
        // never triggers eviction.
        if !index.entries.contains_key(&key) {
            while index.entries.len() >= self.config.max_entries {
                if !Self::evict_soonest_locked(&mut index) {
                    break;
                }
            }
        }

        let inserted_seq = index.next_seq;
        index.next_seq += 1;
        debug!(
            context_id = %key.context_id,
            generation = ?key.key_generation,
            instance_id = %token.instance_id(),
            "stored security context token"
        );
        index
            .current
            .insert(key.context_id.clone(), key.key_generation.clone());
        index.entries.insert(
            key,
            StoreEntry {
                token,
                inserted_seq,
            },
        );
        Ok(PutOutcome::Stored)
    }

    /// Looks up the live token for an identity.
    ///
    /// `generation: None` resolves the conversation's current generation.
    /// An indexed entry whose expiration has passed is purged as a side
    /// effect and reported as a miss.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn get(
        &self,
        context_id: &ContextId,
        generation: Option<&KeyGeneration>,
    ) -> Result<Option<Arc<SecurityContextToken>>, StoreError> {
        let (key, stale_instance) = {
            let index = self.read()?;
            let Some(key) = Self::resolve_key(&index, context_id, generation) else {
                return Ok(None);
            };
            let Some(entry) = index.entries.get(&key) else {
                return Ok(None);
            };
            if entry.token.expires_at() > self.clock.now() {
                return Ok(Some(Arc::clone(&entry.token)));
            }
            (key, entry.token.instance_id())
        };

        // Expired: upgrade to a write lock and purge. Re-check the entry,
        // since a writer may have replaced it between the locks; the stale
        // lookup still reports a miss either way.
        let mut index = self.write()?;
        if let Some(entry) = index.entries.get(&key) {
            if entry.token.instance_id() == stale_instance {
                index.entries.remove(&key);
                Self::drop_current_if_points_at(&mut index, &key);
                debug!(
                    context_id = %key.context_id,
                    generation = ?key.key_generation,
                    "purged expired entry on lookup"
                );
            }
        }
        Ok(None)
    }

    /// Explicitly evicts an entry, e.g. when a renewal supersedes an older
    /// generation or a session closes. Returns the evicted token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn remove(
        &self,
        context_id: &ContextId,
        generation: Option<&KeyGeneration>,
    ) -> Result<Option<Arc<SecurityContextToken>>, StoreError> {
        let now = self.clock.now();
        let mut index = self.write()?;
        Self::sweep_locked(&mut index, now);
        let Some(key) = Self::resolve_key(&index, context_id, generation) else {
            return Ok(None);
        };
        let removed = index.entries.remove(&key);
        if removed.is_some() {
            Self::drop_current_if_points_at(&mut index, &key);
            debug!(
                context_id = %key.context_id,
                generation = ?key.key_generation,
                "removed entry"
            );
        }
        Ok(removed.map(|entry| entry.token))
    }

    /// Removes every entry whose expiration is at or before the clock's
    /// current instant. Returns the number evicted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn sweep(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut index = self.write()?;
        let evicted = Self::sweep_locked(&mut index, now);
        if evicted > 0 {
            debug!(evicted, "sweep evicted expired entries");
        }
        Ok(evicted)
    }

    /// Drops every entry, e.g. when the owning session ends.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::LockPoisoned`] if a writer panicked.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut index = self.write()?;
        index.entries.clear();
        index.current.clear();
        Ok(())
    }

    fn resolve_key(
        index: &StoreIndex,
        context_id: &ContextId,
        generation: Option<&KeyGeneration>,
    ) -> Option<StoreKey> {
        let key_generation = match generation {
            Some(generation) => Some(generation.clone()),
            None => index.current.get(context_id)?.clone(),
        };
        Some(StoreKey {
            context_id: context_id.clone(),
            key_generation,
        })
    }

    fn drop_current_if_points_at(index: &mut StoreIndex, key: &StoreKey) {
        if index.current.get(&key.context_id) == Some(&key.key_generation) {
            index.current.remove(&key.context_id);
        }
    }

    fn sweep_locked(index: &mut StoreIndex, now: DateTime<Utc>) -> usize {
        let expired: Vec<StoreKey> = index
            .entries
            .iter()
            .filter(|(_, entry)| entry.token.expires_at() <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            index.entries.remove(key);
            Self::drop_current_if_points_at(index, key);
        }
        expired.len()
    }

    /// Evicts the entry with the nearest expiration, oldest-inserted first
    /// on ties. Returns `false` when the index is empty.
    fn evict_soonest_locked(index: &mut StoreIndex) -> bool {
        let victim = index
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.token.expires_at(), entry.inserted_seq))
            .map(|(key, _)| key.clone());
        let Some(key) = victim else {
            return false;
        };
        warn!(
            context_id = %key.context_id,
            generation = ?key.key_generation,
            "capacity overflow, evicting soonest-expiring entry"
        );
        index.entries.remove(&key);
        Self::drop_current_if_points_at(index, &key);
        true
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreIndex>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreIndex>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.read().map(|index| index.entries.len());
        f.debug_struct("TokenStore")
            .field("config", &self.config)
            .field("len", &len)
            .finish_non_exhaustive()
    }
}
