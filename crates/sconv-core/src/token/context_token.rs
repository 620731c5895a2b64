//! The security context token entity.

use std::sync::{Mutex, MutexGuard, OnceLock};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use super::authorization::AuthorizationFactSet;
use super::bootstrap::BootstrapCredential;
use super::clause::{ClauseKind, IdentifierClause};
use super::error::TokenError;
use super::identity::{ContextId, InstanceId, KeyGeneration};
use crate::time::{Expirable, ValidityWindow};

/// State that must not be read once the token is disposed.
///
/// One mutex guards the whole record, so a key read and a disposal are
/// mutually exclusive per instance: a reader never observes a scrubbed
/// buffer mid-copy.
struct GuardedState {
    key: Zeroizing<Vec<u8>>,
    authorization_facts: Option<AuthorizationFactSet>,
    bootstrap: Option<BootstrapCredential>,
    disposed: bool,
}

/// A session-bound symmetric-key credential for one conversation.
///
/// Logically immutable once constructed: the only state transition is
/// disposal, which scrubs the key buffer and releases the authorization
/// facts and bootstrap record exactly once. Identity fields (ids, windows,
/// cookie) stay readable after disposal; disposal-guarded accessors fail
/// with [`TokenError::Disposed`].
pub struct SecurityContextToken {
    context_id: ContextId,
    instance_id: InstanceId,
    key_generation: Option<KeyGeneration>,
    token_window: ValidityWindow,
    key_window: ValidityWindow,
    cookie: Option<Vec<u8>>,
    cookie_mode: bool,
    key_base64: OnceLock<String>,
    guarded: Mutex<GuardedState>,
}

impl SecurityContextToken {
    /// Starts building a token for `context_id` valid over `token_window`.
    #[must_use]
    pub fn builder(
        context_id: ContextId,
        token_window: ValidityWindow,
    ) -> SecurityContextTokenBuilder {
        SecurityContextTokenBuilder {
            context_id,
            token_window,
            instance_id: None,
            key: Zeroizing::new(Vec::new()),
            key_generation: None,
            key_window: None,
            authorization_facts: None,
            bootstrap: None,
            cookie: None,
            cookie_mode: false,
        }
    }

    /// Conversation identity. Immutable for the life of the token.
    #[must_use]
    pub const fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    /// Unique id of this token object.
    #[must_use]
    pub const fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Key generation, `None` for the initial key of a conversation.
    #[must_use]
    pub const fn key_generation(&self) -> Option<&KeyGeneration> {
        self.key_generation.as_ref()
    }

    /// Token-level validity window.
    #[must_use]
    pub const fn token_window(&self) -> &ValidityWindow {
        &self.token_window
    }

    /// Key-level validity window, nested inside the token window.
    #[must_use]
    pub const fn key_window(&self) -> &ValidityWindow {
        &self.key_window
    }

    /// Opaque cookie blob, when the deployment round-trips token state
    /// through the client. The byte layout belongs to the external cookie
    /// serializer.
    #[must_use]
    pub fn cookie(&self) -> Option<&[u8]> {
        self.cookie.as_deref()
    }

    /// Whether this token operates in cookie mode.
    #[must_use]
    pub const fn is_cookie_mode(&self) -> bool {
        self.cookie_mode
    }

    /// Whether the token window contains `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token_window.contains(now)
    }

    /// Whether the key window contains `now`.
    #[must_use]
    pub fn is_key_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.key_window.contains(now)
    }

    /// Returns a fresh copy of the key bytes.
    ///
    /// Never hands out the live buffer: mutating the returned vector cannot
    /// affect the token or a later call's result.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Disposed`] once the token is disposed.
    pub fn key_material(&self) -> Result<Vec<u8>, TokenError> {
        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        Ok(state.key.to_vec())
    }

    /// Base64 rendering of the key, computed once per instance.
    ///
    /// Memoization is safe because the key is immutable while the token is
    /// live.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Disposed`] once the token is disposed.
    pub fn key_base64(&self) -> Result<&str, TokenError> {
        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        Ok(self
            .key_base64
            .get_or_init(|| BASE64_STANDARD.encode(state.key.as_slice())))
    }

    /// Constant-time comparison of the key against `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Disposed`] once the token is disposed.
    pub fn key_equals(&self, candidate: &[u8]) -> Result<bool, TokenError> {
        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        Ok(state.key.ct_eq(candidate).into())
    }

    /// Runs `visit` against the authorization-fact set.
    ///
    /// Returns `None` from the visitor position when the token carries no
    /// facts.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Disposed`] once the token is disposed.
    pub fn with_authorization_facts<R>(
        &self,
        visit: impl FnOnce(Option<&AuthorizationFactSet>) -> R,
    ) -> Result<R, TokenError> {
        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        Ok(visit(state.authorization_facts.as_ref()))
    }

    /// Copy of the bootstrap credential record, when retained.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Disposed`] once the token is disposed.
    pub fn bootstrap_credential(&self) -> Result<Option<BootstrapCredential>, TokenError> {
        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        Ok(state.bootstrap.clone())
    }

    /// True only for a security-context clause naming this token's
    /// conversation identity and key generation. Two absent generations
    /// count as equal.
    #[must_use]
    pub fn matches(&self, clause: &IdentifierClause) -> bool {
        match clause {
            IdentifierClause::SecurityContext {
                context_id,
                key_generation,
            } => *context_id == self.context_id && *key_generation == self.key_generation,
            _ => false,
        }
    }

    /// Capability-style clause construction: `Some` for supported kinds,
    /// `None` otherwise.
    #[must_use]
    pub fn try_create_clause(&self, kind: ClauseKind) -> Option<IdentifierClause> {
        match kind {
            ClauseKind::SecurityContext => Some(IdentifierClause::SecurityContext {
                context_id: self.context_id.clone(),
                key_generation: self.key_generation.clone(),
            }),
            _ => None,
        }
    }

    /// Clones this token into a new generation or an identity copy.
    ///
    /// The conversation identity and token window are inherited unchanged.
    /// Overrides may supply new key bytes, a new key generation, and a new
    /// key window; omitted overrides inherit the source's values (the key
    /// bytes are still an independently owned copy). The authorization-fact
    /// set and bootstrap record are copied per holder, each disposable on
    /// its own.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Disposed`] when the source is disposed.
    /// - [`TokenError::EmptyKey`] for an empty override key.
    /// - [`TokenError::KeyWindowOutsideTokenWindow`] when an override key
    ///   window leaves the inherited token window.
    pub fn clone_for_renewal(
        &self,
        new_instance_id: InstanceId,
        overrides: RenewalOverrides,
    ) -> Result<Self, TokenError> {
        let key_window = overrides.key_window.unwrap_or(self.key_window);
        if !self.token_window.encloses(&key_window) {
            return Err(TokenError::KeyWindowOutsideTokenWindow {
                key_not_before: key_window.not_before(),
                key_not_after: key_window.not_after(),
                token_not_before: self.token_window.not_before(),
                token_not_after: self.token_window.not_after(),
            });
        }
        if let Some(key) = &overrides.key {
            if key.is_empty() {
                return Err(TokenError::EmptyKey);
            }
        }

        let state = self.lock_guarded();
        self.ensure_live(&state)?;
        let key = overrides
            .key
            .unwrap_or_else(|| Zeroizing::new(state.key.to_vec()));
        let authorization_facts = state
            .authorization_facts
            .as_ref()
            .map(AuthorizationFactSet::duplicate);
        let bootstrap = state.bootstrap.as_ref().map(BootstrapCredential::duplicate);

        Ok(Self {
            context_id: self.context_id.clone(),
            instance_id: new_instance_id,
            key_generation: overrides
                .key_generation
                .or_else(|| self.key_generation.clone()),
            token_window: self.token_window,
            key_window,
            cookie: self.cookie.clone(),
            cookie_mode: self.cookie_mode,
            key_base64: OnceLock::new(),
            guarded: Mutex::new(GuardedState {
                key,
                authorization_facts,
                bootstrap,
                disposed: false,
            }),
        })
    }

    /// Scrubs the key buffer and releases the authorization facts and
    /// bootstrap record. Idempotent; never fails.
    pub fn dispose(&self) {
        let mut state = self.lock_guarded();
        if state.disposed {
            return;
        }
        state.disposed = true;
        // Zero the bytes in place, then drop the emptied buffer.
        state.key.zeroize();
        *state.key = Vec::new();
        if let Some(facts) = state.authorization_facts.take() {
            facts.dispose();
        }
        state.bootstrap = None;
    }

    /// Whether [`SecurityContextToken::dispose`] has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock_guarded().disposed
    }

    fn ensure_live(&self, state: &GuardedState) -> Result<(), TokenError> {
        if state.disposed {
            return Err(TokenError::Disposed {
                instance_id: self.instance_id,
            });
        }
        Ok(())
    }

    fn lock_guarded(&self) -> MutexGuard<'_, GuardedState> {
        // A poisoned guard still holds consistent state: every mutation is a
        // single field store. Recover it.
        self.guarded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Expirable for SecurityContextToken {
    fn expires_at(&self) -> DateTime<Utc> {
        self.token_window.not_after()
    }
}

impl std::fmt::Debug for SecurityContextToken {
    // Key bytes never appear in debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityContextToken")
            .field("context_id", &self.context_id)
            .field("instance_id", &self.instance_id)
            .field("key_generation", &self.key_generation)
            .field("token_window", &self.token_window)
            .field("key_window", &self.key_window)
            .field("cookie_mode", &self.cookie_mode)
            .finish_non_exhaustive()
    }
}

/// Optional replacements applied by [`SecurityContextToken::clone_for_renewal`].
///
/// The default overrides nothing, producing an identity copy.
#[derive(Debug, Default)]
pub struct RenewalOverrides {
    key: Option<Zeroizing<Vec<u8>>>,
    key_generation: Option<KeyGeneration>,
    key_window: Option<ValidityWindow>,
}

impl RenewalOverrides {
    /// No overrides: the clone is an identity copy.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Replaces the key bytes. The slice is copied.
    #[must_use]
    pub fn key(mut self, key: &[u8]) -> Self {
        self.key = Some(Zeroizing::new(key.to_vec()));
        self
    }

    /// Replaces the key generation.
    #[must_use]
    pub fn key_generation(mut self, generation: KeyGeneration) -> Self {
        self.key_generation = Some(generation);
        self
    }

    /// Replaces the key window. Must nest inside the inherited token window.
    #[must_use]
    pub const fn key_window(mut self, window: ValidityWindow) -> Self {
        self.key_window = Some(window);
        self
    }
}

/// Validated constructor for [`SecurityContextToken`].
pub struct SecurityContextTokenBuilder {
    context_id: ContextId,
    token_window: ValidityWindow,
    instance_id: Option<InstanceId>,
    key: Zeroizing<Vec<u8>>,
    key_generation: Option<KeyGeneration>,
    key_window: Option<ValidityWindow>,
    authorization_facts: Option<AuthorizationFactSet>,
    bootstrap: Option<BootstrapCredential>,
    cookie: Option<Vec<u8>>,
    cookie_mode: bool,
}

impl SecurityContextTokenBuilder {
    /// Copies `key` into an independently owned buffer.
    ///
    /// The caller's buffer is never aliased: mutating it afterwards cannot
    /// corrupt the token, and disposal scrubs only the token's copy.
    #[must_use]
    pub fn key(mut self, key: &[u8]) -> Self {
        self.key = Zeroizing::new(key.to_vec());
        self
    }

    /// Sets an explicit instance id. A fresh one is generated otherwise.
    #[must_use]
    pub const fn instance_id(mut self, id: InstanceId) -> Self {
        self.instance_id = Some(id);
        self
    }

    /// Sets the key generation.
    #[must_use]
    pub fn key_generation(mut self, generation: KeyGeneration) -> Self {
        self.key_generation = Some(generation);
        self
    }

    /// Sets the key validity window. Defaults to the token window.
    #[must_use]
    pub const fn key_window(mut self, window: ValidityWindow) -> Self {
        self.key_window = Some(window);
        self
    }

    /// Attaches the authorization-fact set.
    #[must_use]
    pub fn authorization_facts(mut self, facts: AuthorizationFactSet) -> Self {
        self.authorization_facts = Some(facts);
        self
    }

    /// Retains the bootstrap credential record.
    #[must_use]
    pub fn bootstrap(mut self, record: BootstrapCredential) -> Self {
        self.bootstrap = Some(record);
        self
    }

    /// Attaches the opaque cookie blob.
    #[must_use]
    pub fn cookie(mut self, blob: Vec<u8>) -> Self {
        self.cookie = Some(blob);
        self
    }

    /// Marks the token as operating in cookie mode.
    #[must_use]
    pub const fn cookie_mode(mut self, enabled: bool) -> Self {
        self.cookie_mode = enabled;
        self
    }

    /// Validates and constructs the token.
    ///
    /// # Errors
    ///
    /// - [`TokenError::EmptyKey`] when no key bytes were provided.
    /// - [`TokenError::KeyWindowOutsideTokenWindow`] when the key window is
    ///   not nested inside the token window.
    ///
    /// Inverted windows are rejected earlier, by
    /// [`ValidityWindow::new`](crate::time::ValidityWindow::new); an empty
    /// conversation identity is rejected by
    /// [`ContextId::new`](super::ContextId::new). Construction never yields
    /// a partially valid token.
    pub fn build(self) -> Result<SecurityContextToken, TokenError> {
        if self.key.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        let key_window = self.key_window.unwrap_or(self.token_window);
        if !self.token_window.encloses(&key_window) {
            return Err(TokenError::KeyWindowOutsideTokenWindow {
                key_not_before: key_window.not_before(),
                key_not_after: key_window.not_after(),
                token_not_before: self.token_window.not_before(),
                token_not_after: self.token_window.not_after(),
            });
        }

        Ok(SecurityContextToken {
            context_id: self.context_id,
            instance_id: self.instance_id.unwrap_or_else(InstanceId::generate),
            key_generation: self.key_generation,
            token_window: self.token_window,
            key_window,
            cookie: self.cookie,
            cookie_mode: self.cookie_mode,
            key_base64: OnceLock::new(),
            guarded: Mutex::new(GuardedState {
                key: self.key,
                authorization_facts: self.authorization_facts,
                bootstrap: self.bootstrap,
                disposed: false,
            }),
        })
    }
}
