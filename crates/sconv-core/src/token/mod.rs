//! Security-context tokens and their supporting types.
//!
//! A security context token is a session-bound symmetric-key credential: the
//! result of a negotiation that both sides of a conversation reuse instead of
//! renegotiating credentials on every message. This module owns the token
//! entity, its construction-time validation, the identifier clauses other
//! security processing uses to name a token, and the disposal discipline
//! that scrubs key material exactly once.
//!
//! # Key Concepts
//!
//! - **Conversation identity** ([`ContextId`]): stable identifier shared by
//!   every generation of a conversation's keys.
//! - **Key generation** ([`KeyGeneration`]): distinguishes successive keys
//!   issued for the same conversation during renewal.
//! - **Nested windows**: the key validity window always sits inside the
//!   token validity window.
//!
//! # Security Properties
//!
//! - Key bytes are copied on construction and never handed out by reference.
//! - Disposal zeroizes the key buffer and is idempotent.
//! - Key reads and disposal are mutually exclusive per instance, so a reader
//!   never observes a scrubbed buffer mid-copy.

mod authorization;
mod bootstrap;
mod clause;
mod context_token;
mod error;
mod identity;

pub use authorization::{AuthorizationFact, AuthorizationFactSet, ClaimFact};
pub use bootstrap::BootstrapCredential;
pub use clause::{ClauseKind, IdentifierClause};
pub use context_token::{RenewalOverrides, SecurityContextToken, SecurityContextTokenBuilder};
pub use error::TokenError;
pub use identity::{ContextId, InstanceId, KeyGeneration};
