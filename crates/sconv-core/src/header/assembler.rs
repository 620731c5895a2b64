//! Ordered slot sequence for one message's security header.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::token::{ContextId, IdentifierClause, InstanceId};

/// Errors from header assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AssemblerError {
    /// No slot carries the named id.
    #[error("no header slot with id {id}")]
    SlotNotFound {
        /// The id that resolved to nothing.
        id: String,
    },

    /// A slot with this id already exists.
    #[error("header slot id {id} is already taken")]
    DuplicateSlotId {
        /// The colliding id.
        id: String,
    },
}

/// One security element placed into an outgoing header.
///
/// Value-comparable via `PartialEq`; reference identity comes from the
/// `Arc` the assembler stores elements behind.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HeaderElement {
    /// Message timestamp element.
    Timestamp {
        /// When the message was created.
        created: DateTime<Utc>,
        /// When the message's security context expires.
        expires: DateTime<Utc>,
    },
    /// A security context token carried in the header.
    ContextToken {
        /// Conversation identity of the token.
        context_id: ContextId,
        /// Instance id of the token.
        instance_id: InstanceId,
    },
    /// A signature over header elements and body.
    Signature {
        /// Clause naming the signing credential.
        key_clause: IdentifierClause,
        /// Signature value bytes.
        value: Vec<u8>,
    },
    /// An encrypted placeholder substituted for a plaintext element.
    EncryptedData {
        /// Reference id linking ciphertext to its key information.
        reference: String,
        /// Ciphertext bytes.
        ciphertext: Vec<u8>,
    },
}

/// One slot in the ordered sequence.
#[derive(Debug, Clone)]
pub struct HeaderSlot {
    id: String,
    element: Arc<HeaderElement>,
    pending_encryption: bool,
}

impl HeaderSlot {
    /// The slot id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The held element.
    #[must_use]
    pub const fn element(&self) -> &Arc<HeaderElement> {
        &self.element
    }

    /// Whether the slot awaits cipher substitution.
    #[must_use]
    pub const fn is_pending_encryption(&self) -> bool {
        self.pending_encryption
    }
}

/// Accumulates the ordered security elements for one outgoing message.
///
/// Purely in-memory bookkeeping: the caller serializes the final sequence
/// and performs the actual cryptographic transform before calling
/// [`SecurityHeaderAssembler::replace`].
#[derive(Debug, Default)]
pub struct SecurityHeaderAssembler {
    slots: Vec<HeaderSlot>,
}

impl SecurityHeaderAssembler {
    /// Creates an empty assembler for one message-construction scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Appends a new slot at the end of the sequence.
    ///
    /// The encryption-pending flag starts false.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblerError::DuplicateSlotId`] when `id` is taken.
    pub fn append(
        &mut self,
        id: impl Into<String>,
        element: Arc<HeaderElement>,
    ) -> Result<(), AssemblerError> {
        let id = id.into();
        if self.index_of(&id).is_some() {
            return Err(AssemblerError::DuplicateSlotId { id });
        }
        self.slots.push(HeaderSlot {
            id,
            element,
            pending_encryption: false,
        });
        Ok(())
    }

    /// Marks the named slot as pending encryption.
    ///
    /// A later external pass reads the flag to decide which elements need
    /// cipher substitution.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblerError::SlotNotFound`] for an unknown id.
    pub fn mark_for_encryption(&mut self, id: &str) -> Result<(), AssemblerError> {
        let index = self.require(id)?;
        self.slots[index].pending_encryption = true;
        Ok(())
    }

    /// Substitutes the slot's id and element in place.
    ///
    /// The slot keeps its position in the overall order, so an encrypted
    /// placeholder occupies exactly the slot its plaintext predecessor
    /// occupied. The substituted slot is no longer pending encryption.
    ///
    /// # Errors
    ///
    /// - [`AssemblerError::SlotNotFound`] for an unknown `id`.
    /// - [`AssemblerError::DuplicateSlotId`] when `new_id` collides with a
    ///   different slot.
    pub fn replace(
        &mut self,
        id: &str,
        new_id: impl Into<String>,
        new_element: Arc<HeaderElement>,
    ) -> Result<(), AssemblerError> {
        let index = self.require(id)?;
        let new_id = new_id.into();
        if new_id != id && self.index_of(&new_id).is_some() {
            return Err(AssemblerError::DuplicateSlotId { id: new_id });
        }
        let slot = &mut self.slots[index];
        slot.id = new_id;
        slot.element = new_element;
        slot.pending_encryption = false;
        Ok(())
    }

    /// Finds the slot holding `element`, by reference identity first, then
    /// by value equality. Used to detect an element already represented
    /// before inserting a duplicate.
    #[must_use]
    pub fn find_by_same_element(&self, element: &Arc<HeaderElement>) -> Option<&HeaderSlot> {
        self.slots
            .iter()
            .find(|slot| Arc::ptr_eq(&slot.element, element) || *slot.element == **element)
    }

    /// The slot with the given id.
    #[must_use]
    pub fn slot(&self, id: &str) -> Option<&HeaderSlot> {
        self.index_of(id).map(|index| &self.slots[index])
    }

    /// Slots in sequence order.
    pub fn slots(&self) -> impl Iterator<Item = &HeaderSlot> {
        self.slots.iter()
    }

    /// Slots still awaiting cipher substitution, in sequence order.
    pub fn pending_slots(&self) -> impl Iterator<Item = &HeaderSlot> {
        self.slots.iter().filter(|slot| slot.pending_encryption)
    }

    /// Position of the named slot in the sequence.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    fn require(&self, id: &str) -> Result<usize, AssemblerError> {
        self.index_of(id).ok_or_else(|| AssemblerError::SlotNotFound {
            id: id.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn timestamp() -> Arc<HeaderElement> {
        let created = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        Arc::new(HeaderElement::Timestamp {
            created,
            expires: created + chrono::Duration::minutes(5),
        })
    }

    fn signature(byte: u8) -> Arc<HeaderElement> {
        Arc::new(HeaderElement::Signature {
            key_clause: IdentifierClause::KeyName {
                name: "primary".into(),
            },
            value: vec![byte; 8],
        })
    }

    fn encrypted(reference: &str) -> Arc<HeaderElement> {
        Arc::new(HeaderElement::EncryptedData {
            reference: reference.into(),
            ciphertext: vec![0xEE; 8],
        })
    }

    #[test]
    fn append_preserves_sequence_order() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("ts", timestamp()).unwrap();
        assembler.append("sig", signature(1)).unwrap();
        let ids: Vec<&str> = assembler.slots().map(HeaderSlot::id).collect();
        assert_eq!(ids, ["ts", "sig"]);
    }

    #[test]
    fn append_rejects_duplicate_id() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("ts", timestamp()).unwrap();
        let err = assembler.append("ts", signature(1)).expect_err("dup id");
        assert_eq!(
            err,
            AssemblerError::DuplicateSlotId { id: "ts".into() }
        );
    }

    #[test]
    fn mark_for_encryption_sets_flag() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("sig", signature(1)).unwrap();
        assert!(!assembler.slot("sig").unwrap().is_pending_encryption());

        assembler.mark_for_encryption("sig").unwrap();
        assert!(assembler.slot("sig").unwrap().is_pending_encryption());
        let pending: Vec<&str> = assembler.pending_slots().map(HeaderSlot::id).collect();
        assert_eq!(pending, ["sig"]);
    }

    #[test]
    fn mark_for_encryption_unknown_id_fails() {
        let mut assembler = SecurityHeaderAssembler::new();
        let err = assembler.mark_for_encryption("nope").expect_err("missing");
        assert_eq!(err, AssemblerError::SlotNotFound { id: "nope".into() });
    }

    #[test]
    fn replace_keeps_position_and_clears_pending_flag() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("ts", timestamp()).unwrap();
        assembler.append("sig", signature(1)).unwrap();
        assembler.append("token", signature(2)).unwrap();
        assembler.mark_for_encryption("sig").unwrap();

        assembler
            .replace("sig", "enc-sig", encrypted("enc-1"))
            .unwrap();

        // Same position, new id and element, no longer pending.
        assert_eq!(assembler.index_of("enc-sig"), Some(1));
        assert!(assembler.index_of("sig").is_none());
        let slot = assembler.slot("enc-sig").unwrap();
        assert!(!slot.is_pending_encryption());
        assert!(matches!(
            slot.element().as_ref(),
            HeaderElement::EncryptedData { .. }
        ));
        assert_eq!(assembler.len(), 3);
    }

    #[test]
    fn replace_may_keep_the_same_id() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("sig", signature(1)).unwrap();
        assembler.replace("sig", "sig", signature(9)).unwrap();
        assert_eq!(assembler.index_of("sig"), Some(0));
    }

    #[test]
    fn replace_rejects_collision_with_other_slot() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("ts", timestamp()).unwrap();
        assembler.append("sig", signature(1)).unwrap();
        let err = assembler
            .replace("sig", "ts", encrypted("enc-1"))
            .expect_err("collision");
        assert_eq!(err, AssemblerError::DuplicateSlotId { id: "ts".into() });
    }

    #[test]
    fn find_by_same_element_matches_reference_identity() {
        let mut assembler = SecurityHeaderAssembler::new();
        let element = signature(1);
        assembler.append("sig", Arc::clone(&element)).unwrap();
        let found = assembler.find_by_same_element(&element).expect("identity");
        assert_eq!(found.id(), "sig");
    }

    #[test]
    fn find_by_same_element_matches_value_equality() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("sig", signature(1)).unwrap();
        // A distinct allocation with an equal value still matches.
        let equal_value = signature(1);
        let found = assembler
            .find_by_same_element(&equal_value)
            .expect("value equality");
        assert_eq!(found.id(), "sig");
    }

    #[test]
    fn find_by_same_element_misses_unrelated_values() {
        let mut assembler = SecurityHeaderAssembler::new();
        assembler.append("sig", signature(1)).unwrap();
        assert!(assembler.find_by_same_element(&signature(2)).is_none());
    }
}
