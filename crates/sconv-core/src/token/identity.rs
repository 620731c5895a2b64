//! Identifier newtypes for conversations, token instances, and key
//! generations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TokenError;

/// Opaque, stable identifier of a conversation.
///
/// Every generation of a conversation's keys shares the same context id;
/// the id is immutable for the life of the conversation. Typically a URI
/// minted by the issuer (`urn:ctx:...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    /// Wraps a non-empty identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::EmptyContextId`] for an empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, TokenError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TokenError::EmptyContextId);
        }
        Ok(Self(id))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of one token object.
///
/// Assigned once at construction and never reused; a renewal clone gets a
/// fresh instance id while keeping the conversation identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Mints a fresh random instance id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID, e.g. one carried in a renewal request.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier distinguishing successive keys issued for the same
/// conversation during key renewal.
///
/// A token negotiated before any renewal carries no generation; matching
/// treats two absent generations as equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyGeneration(String);

impl KeyGeneration {
    /// Wraps a generation identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_id_rejects_empty() {
        assert!(matches!(
            ContextId::new(""),
            Err(TokenError::EmptyContextId)
        ));
    }

    #[test]
    fn context_id_round_trips() {
        let id = ContextId::new("urn:ctx:1").expect("non-empty");
        assert_eq!(id.as_str(), "urn:ctx:1");
        assert_eq!(id.to_string(), "urn:ctx:1");
    }

    #[test]
    fn instance_ids_are_unique() {
        assert_ne!(InstanceId::generate(), InstanceId::generate());
    }
}
