//! Authorization facts attached to a token.
//!
//! A fact set captures what the negotiated session is authorized to do.
//! Sets travel with the token through renewal clones, so each logical
//! holder needs its own copy it can release independently. Cloning makes a
//! per-element decision: immutable facts are shared, stateful facts are
//! deep-copied through the [`AuthorizationFact::copy_fact`] capability.

use std::sync::Arc;

/// One authorization fact.
///
/// Implementations that hold per-session mutable state report
/// `is_stateful() == true` and must produce an independent copy from
/// [`AuthorizationFact::copy_fact`]. Implementations that own releasable
/// resources report `is_disposable() == true` and release them in
/// [`AuthorizationFact::dispose`].
pub trait AuthorizationFact: std::fmt::Debug + Send + Sync {
    /// Stable name of the fact, for audit logging.
    fn name(&self) -> &str;

    /// Whether this fact carries per-holder mutable state.
    fn is_stateful(&self) -> bool {
        false
    }

    /// Whether this fact owns resources that need explicit release.
    fn is_disposable(&self) -> bool {
        false
    }

    /// Deep-copies the fact for a new logical holder.
    ///
    /// Only invoked for stateful facts; immutable facts are shared by
    /// reference count instead.
    fn copy_fact(&self) -> Arc<dyn AuthorizationFact>;

    /// Releases any resources the fact owns. No-op by default.
    fn dispose(&self) {}
}

/// An immutable claim: a name/value pair established during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimFact {
    name: String,
    value: String,
}

impl ClaimFact {
    /// Creates a claim fact.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The claim value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl AuthorizationFact for ClaimFact {
    fn name(&self) -> &str {
        &self.name
    }

    fn copy_fact(&self) -> Arc<dyn AuthorizationFact> {
        Arc::new(self.clone())
    }
}

/// The set of authorization facts held by one token instance.
///
/// Each token (original or clone) owns its set; disposal releases every
/// disposable fact exactly once for that holder. Immutable facts may be
/// shared across holders via `Arc`, so a fact's own `dispose` must tolerate
/// being called once per holder.
#[derive(Debug, Default)]
pub struct AuthorizationFactSet {
    facts: Vec<Arc<dyn AuthorizationFact>>,
}

impl AuthorizationFactSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from existing facts.
    #[must_use]
    pub fn from_facts(facts: Vec<Arc<dyn AuthorizationFact>>) -> Self {
        Self { facts }
    }

    /// Adds a fact to the set.
    pub fn push(&mut self, fact: Arc<dyn AuthorizationFact>) {
        self.facts.push(fact);
    }

    /// Number of facts in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterates over the facts.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AuthorizationFact>> {
        self.facts.iter()
    }

    /// Copies the set for a new logical holder.
    ///
    /// Stateful facts are deep-copied via [`AuthorizationFact::copy_fact`];
    /// immutable facts are shared.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let facts = self
            .facts
            .iter()
            .map(|fact| {
                if fact.is_stateful() {
                    fact.copy_fact()
                } else {
                    Arc::clone(fact)
                }
            })
            .collect();
        Self { facts }
    }

    /// Releases every disposable fact and consumes the set.
    pub fn dispose(self) {
        for fact in &self.facts {
            if fact.is_disposable() {
                fact.dispose();
            }
        }
    }
}
