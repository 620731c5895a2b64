//! Identifier clauses naming security credentials.
//!
//! Message-security processing resolves which credential a signature or
//! encryption reference names by handing a clause to each candidate token
//! and asking for a match. The clause family is a closed tagged variant;
//! tokens construct clauses capability-style: ask for a kind, get `Some`
//! only when the token supports that kind.

use serde::{Deserialize, Serialize};

use super::identity::{ContextId, KeyGeneration};

/// The kinds of identifier clause a credential can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ClauseKind {
    /// Names a security context by conversation identity and generation.
    SecurityContext,
    /// Names a key by its registered key name.
    KeyName,
    /// Names a credential by a digest of its public material.
    Thumbprint,
}

/// An identifier clause carried in a security header reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentifierClause {
    /// Reference to a security context token.
    SecurityContext {
        /// Conversation identity the clause names.
        context_id: ContextId,
        /// Key generation the clause names; `None` for the initial key.
        key_generation: Option<KeyGeneration>,
    },
    /// Reference to a key by registered name.
    KeyName {
        /// The registered key name.
        name: String,
    },
    /// Reference to a credential by digest.
    Thumbprint {
        /// Digest of the credential's public material.
        digest: [u8; 32],
    },
}

impl IdentifierClause {
    /// The kind tag of this clause.
    #[must_use]
    pub const fn kind(&self) -> ClauseKind {
        match self {
            Self::SecurityContext { .. } => ClauseKind::SecurityContext,
            Self::KeyName { .. } => ClauseKind::KeyName,
            Self::Thumbprint { .. } => ClauseKind::Thumbprint,
        }
    }
}
