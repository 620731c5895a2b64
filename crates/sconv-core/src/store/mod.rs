//! Expiring token store.
//!
//! Holds live security context tokens keyed by conversation identity and key
//! generation, and guarantees that a lookup never serves an entry whose
//! validity has elapsed.
//!
//! # Architecture
//!
//! ```text
//! issuer ──put──────────────▶ ┌──────────────────────────────┐
//!                             │          TokenStore          │
//! senders ──get (concurrent)─▶│  RwLock<index>               │
//!                             │   entries: (ctx, gen) → Arc  │
//! timer ──sweep──────────────▶│   current: ctx → gen         │
//!                             └──────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! - **Lazy eviction**: a lookup that finds an expired entry purges it and
//!   reports a miss.
//! - **Opportunistic sweep**: every mutating operation sweeps expired
//!   entries first; [`TokenStore::sweep`] is also callable from a timer so
//!   idle periods still bound memory growth.
//! - **Capacity policy**: on overflow the soonest-to-expire entry is
//!   evicted first, oldest-inserted breaking ties. Not LRU.
//! - **Outcomes, not exceptions**: publishing an already-expired token and
//!   looking up an absent entry are ordinary results the caller branches
//!   on, not errors.
//!
//! # Concurrency
//!
//! Many concurrent readers run alongside a serialized stream of writers;
//! the `RwLock` guarantees a reader never observes a half-updated index.
//! Tokens are logically immutable once published: the store's
//! administrative operations change what an identity maps to, never a
//! token's own fields.

mod cache;

pub use cache::{
    DEFAULT_MAX_ENTRIES, MAX_STORE_ENTRIES, PutOutcome, StoreError, TokenStore, TokenStoreConfig,
};
