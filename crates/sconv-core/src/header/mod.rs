//! Outbound security-header assembly.
//!
//! While one outgoing message is being secured, its security elements
//! accumulate in an ordered sequence: timestamp, tokens, signatures,
//! encrypted placeholders. The order is semantically significant: the wire
//! format requires elements in a fixed relative order, and an encrypted
//! form must occupy the same slot its plaintext predecessor occupied. The
//! assembler therefore only ever appends, marks, or substitutes in place.
//!
//! Strictly single-writer: one assembler belongs to one message's
//! construction scope and is never shared across concurrent builds, so it
//! carries no internal synchronization.

mod assembler;

pub use assembler::{AssemblerError, HeaderElement, HeaderSlot, SecurityHeaderAssembler};
