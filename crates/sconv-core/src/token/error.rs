//! Token-specific error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::identity::InstanceId;
use crate::time::WindowError;

/// Errors that can occur constructing or operating on a security context
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// The key material was missing or empty.
    #[error("key material must not be empty")]
    EmptyKey,

    /// The conversation identity was missing or empty.
    #[error("conversation identity must not be empty")]
    EmptyContextId,

    /// A validity window had inverted bounds.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// The key window is not nested inside the token window.
    #[error(
        "key window [{key_not_before}, {key_not_after}] extends outside \
         token window [{token_not_before}, {token_not_after}]"
    )]
    KeyWindowOutsideTokenWindow {
        /// Key window lower bound.
        key_not_before: DateTime<Utc>,
        /// Key window upper bound.
        key_not_after: DateTime<Utc>,
        /// Token window lower bound.
        token_not_before: DateTime<Utc>,
        /// Token window upper bound.
        token_not_after: DateTime<Utc>,
    },

    /// An operation required a live token but the instance was disposed.
    #[error("security context token {instance_id} is disposed")]
    Disposed {
        /// The disposed instance.
        instance_id: InstanceId,
    },
}
