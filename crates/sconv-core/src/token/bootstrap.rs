//! Bootstrap credential record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about the authentication exchange that established a session.
///
/// Optionally retained on a token for audit. Carries no secret material;
/// the record is released when the owning token is disposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapCredential {
    authority: String,
    mechanism: String,
    subject: Option<String>,
    established_at: DateTime<Utc>,
}

impl BootstrapCredential {
    /// Records a completed authentication exchange.
    #[must_use]
    pub fn new(
        authority: impl Into<String>,
        mechanism: impl Into<String>,
        established_at: DateTime<Utc>,
    ) -> Self {
        Self {
            authority: authority.into(),
            mechanism: mechanism.into(),
            subject: None,
            established_at,
        }
    }

    /// Attaches the authenticated subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Issuer that performed the exchange.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Authentication mechanism used, e.g. `x509` or `username`.
    #[must_use]
    pub fn mechanism(&self) -> &str {
        &self.mechanism
    }

    /// Authenticated subject, when recorded.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// When the exchange completed.
    #[must_use]
    pub const fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    /// Copies the record for a new logical holder.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}
