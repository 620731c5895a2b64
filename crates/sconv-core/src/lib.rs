//! # sconv-core
//!
//! Session-credential subsystem for a secure-conversation messaging stack.
//!
//! A negotiated conversation is represented by a
//! [`SecurityContextToken`](token::SecurityContextToken): a symmetric-key
//! credential with nested validity windows. Live tokens are cached in a
//! [`TokenStore`](store::TokenStore) keyed by conversation identity and key
//! generation, with passive expiration and bounded capacity. While an
//! outgoing message is secured, its header elements accumulate in a
//! [`SecurityHeaderAssembler`](header::SecurityHeaderAssembler) that
//! preserves the wire-required element order through encryption
//! substitution. [`AddressHeader`](address::AddressHeader) provides
//! order-insensitive structural equality for namespace-qualified headers.
//!
//! Out of scope by design: wire serialization, the cryptographic transforms
//! themselves, and the negotiation protocol that issues the first token.
//! This crate defines the in-memory entities, their invariants, and their
//! caching/assembly behavior; collaborators plug in through the
//! [`Clock`](time::Clock), [`Expirable`](time::Expirable), and
//! [`AuthorizationFact`](token::AuthorizationFact) capabilities.

pub mod address;
pub mod header;
pub mod store;
pub mod time;
pub mod token;

pub use address::{AddressHeader, HeaderAttribute};
pub use header::{HeaderElement, SecurityHeaderAssembler};
pub use store::{PutOutcome, TokenStore, TokenStoreConfig};
pub use time::{Clock, Expirable, ManualClock, SystemClock, ValidityWindow, WindowField};
pub use token::{
    ContextId, IdentifierClause, InstanceId, KeyGeneration, SecurityContextToken, TokenError,
};
