use crate::core::clock::Clock;
use crate::core::signer::{AssertionMaterial, Authenticator, CredentialRequestOptions};
use crate::error::{DelegateKitError, Result};
use crate::events::{NotificationBus, NotificationEvent};
use crate::store::GrantStore;
use delegatekit_state::{CaveatError, Passkey, SessionKey};
use std::sync::Arc;
use uuid::Uuid;

/// Creates and tracks ephemeral execution credentials: session keys and
/// passkeys. Revocation is terminal for both kinds and takes effect on the
/// next pipeline lookup.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn GrantStore>,
    bus: Arc<NotificationBus>,
    clock: Arc<dyn Clock>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<dyn GrantStore>,
        bus: Arc<NotificationBus>,
        clock: Arc<dyn Clock>,
        authenticator: Option<Arc<dyn Authenticator>>,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            authenticator,
        }
    }

    /// Start building a session key. Defaults to a 30-day lifetime.
    pub fn create_session_key(&self) -> SessionKeyBuilder<'_> {
        SessionKeyBuilder::new(self)
    }

    /// Register a passkey through the platform authenticator ceremony.
    /// Only the public material and the raw credential id are stored; the
    /// private key never leaves the authenticator.
    pub async fn register_passkey(&self, options: CredentialRequestOptions) -> Result<Passkey> {
        let authenticator = self.authenticator.as_ref().ok_or_else(|| {
            DelegateKitError::AgentActionFailed("no platform authenticator configured".to_string())
        })?;

        let material = authenticator
            .create_credential(&options)
            .await
            .map_err(DelegateKitError::AgentActionFailed)?;

        let passkey = Passkey::new(
            material.raw_credential_id,
            material.public_key,
            self.clock.now(),
        );
        self.store.put_passkey(passkey.clone())?;
        tracing::info!(passkey_id = %passkey.id, "passkey registered");
        self.bus.publish(NotificationEvent::PasskeyRegistered {
            passkey_id: passkey.id,
        });
        Ok(passkey)
    }

    /// Run an assertion ceremony for a registered, unrevoked passkey.
    pub async fn assert_passkey(
        &self,
        id: Uuid,
        options: CredentialRequestOptions,
    ) -> Result<AssertionMaterial> {
        let passkey = self
            .store
            .passkey(&id)?
            .ok_or(DelegateKitError::CredentialNotFound(id))?;
        if passkey.revoked {
            return Err(DelegateKitError::CredentialRevoked(id));
        }
        let authenticator = self.authenticator.as_ref().ok_or_else(|| {
            DelegateKitError::AgentActionFailed("no platform authenticator configured".to_string())
        })?;
        authenticator
            .get_credential(&options)
            .await
            .map_err(DelegateKitError::AgentActionFailed)
    }

    /// Terminal: a revoked session key immediately fails pipeline lookups.
    /// Repeated revocation is a no-op success.
    pub fn revoke_session_key(&self, id: Uuid) -> Result<bool> {
        let mut key = self
            .store
            .session_key(&id)?
            .ok_or(DelegateKitError::CredentialNotFound(id))?;
        if key.revoked {
            return Ok(false);
        }
        key.revoked = true;
        self.store.put_session_key(key)?;
        tracing::info!(session_key_id = %id, "session key revoked");
        self.bus
            .publish(NotificationEvent::SessionKeyRevoked { session_key_id: id });
        Ok(true)
    }

    /// Terminal and irreversible.
    pub fn revoke_passkey(&self, id: Uuid) -> Result<bool> {
        let mut passkey = self
            .store
            .passkey(&id)?
            .ok_or(DelegateKitError::CredentialNotFound(id))?;
        if passkey.revoked {
            return Ok(false);
        }
        passkey.revoked = true;
        self.store.put_passkey(passkey)?;
        tracing::info!(passkey_id = %id, "passkey revoked");
        self.bus
            .publish(NotificationEvent::PasskeyRevoked { passkey_id: id });
        Ok(true)
    }

    pub fn session_key(&self, id: Uuid) -> Result<Option<SessionKey>> {
        Ok(self.store.session_key(&id)?)
    }

    pub fn passkey(&self, id: Uuid) -> Result<Option<Passkey>> {
        Ok(self.store.passkey(&id)?)
    }
}

/// Builder for session key creation.
pub struct SessionKeyBuilder<'a> {
    manager: &'a CredentialManager,
    ttl_secs: Option<i64>,
    delegation_id: Option<Uuid>,
}

impl<'a> SessionKeyBuilder<'a> {
    fn new(manager: &'a CredentialManager) -> Self {
        Self {
            manager,
            ttl_secs: None,
            delegation_id: None,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Scope the key to a delegation. The key then must not outlive the
    /// delegation; violating that is a construction-time error, not a
    /// runtime failure.
    pub fn scoped_to(mut self, delegation_id: Uuid) -> Self {
        self.delegation_id = Some(delegation_id);
        self
    }

    pub fn build(self) -> Result<SessionKey> {
        let manager = self.manager;
        let now = manager.clock.now();
        let expires_at = now.saturating_add(self.ttl_secs.unwrap_or(SessionKey::DEFAULT_TTL_SECS));

        if let Some(delegation_id) = self.delegation_id {
            let delegation = manager
                .store
                .delegation(&delegation_id)?
                .ok_or(DelegateKitError::DelegationNotFound(delegation_id))?;
            if expires_at > delegation.expires_at {
                return Err(DelegateKitError::InvalidCaveat(
                    CaveatError::CredentialOutlivesDelegation {
                        credential: expires_at,
                        delegation: delegation.expires_at,
                    },
                ));
            }
        }

        let key = SessionKey::generate(now, expires_at, self.delegation_id);
        manager.store.put_session_key(key.clone())?;
        tracing::info!(
            session_key_id = %key.id,
            expires_at = key.expires_at,
            scoped = key.delegation_id.is_some(),
            "session key created"
        );
        manager.bus.publish(NotificationEvent::SessionKeyCreated {
            session_key_id: key.id,
            expires_at: key.expires_at,
        });
        Ok(key)
    }
}
