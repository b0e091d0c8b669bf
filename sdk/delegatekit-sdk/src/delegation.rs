use crate::core::clock::Clock;
use crate::core::signer::DelegationSigner;
use crate::error::{DelegateKitError, Result};
use crate::events::{NotificationBus, NotificationEvent};
use crate::store::GrantStore;
use delegatekit_state::{caveat, Address, Caveat, Delegation, DelegationStatus, VerifyStatus};
use std::sync::Arc;
use uuid::Uuid;

/// Creates, revokes and verifies delegations. The only writer of delegation
/// records; every lifecycle transition goes through here.
#[derive(Clone)]
pub struct DelegationManager {
    store: Arc<dyn GrantStore>,
    bus: Arc<NotificationBus>,
    signer: Arc<dyn DelegationSigner>,
    clock: Arc<dyn Clock>,
}

impl DelegationManager {
    /// Default grant lifetime when the caller sets no expiry: 30 days.
    pub const DEFAULT_TTL_SECS: i64 = 30 * 24 * 60 * 60;

    pub fn new(
        store: Arc<dyn GrantStore>,
        bus: Arc<NotificationBus>,
        signer: Arc<dyn DelegationSigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            bus,
            signer,
            clock,
        }
    }

    /// Start building a new delegation grant.
    pub fn create_delegation(&self) -> CreateDelegationBuilder<'_> {
        CreateDelegationBuilder::new(self)
    }

    /// Revoke a delegation. Idempotent at the semantic level: revoking an
    /// already-terminal delegation is a no-op success (`Ok(false)`), but an
    /// unknown id is an error. Safe under repeated calls.
    pub async fn revoke(&self, id: Uuid) -> Result<bool> {
        let Some(mut delegation) = self.store.delegation(&id)? else {
            return Err(DelegateKitError::DelegationNotFound(id));
        };

        match delegation.status {
            DelegationStatus::Active | DelegationStatus::Pending => {
                delegation.status = DelegationStatus::Revoked;
                self.store.put_delegation(delegation)?;
                tracing::info!(delegation_id = %id, "delegation revoked");
                self.bus
                    .publish(NotificationEvent::DelegationRevoked { delegation_id: id });
                Ok(true)
            }
            DelegationStatus::Revoked | DelegationStatus::Failed => {
                tracing::debug!(delegation_id = %id, "revoke no-op, already terminal");
                Ok(false)
            }
        }
    }

    /// Pure read of a delegation's current state. Expiry is computed
    /// lazily against the clock and never written back.
    pub fn verify(&self, id: Uuid) -> Result<VerifyStatus> {
        Ok(match self.store.delegation(&id)? {
            Some(delegation) => delegation.verify_at(self.clock.now()),
            None => VerifyStatus::NotFound,
        })
    }

    pub fn delegation(&self, id: Uuid) -> Result<Option<Delegation>> {
        Ok(self.store.delegation(&id)?)
    }

    /// Outbound grants of a delegator. Result sets are bounded per account.
    pub fn delegations_by_delegator(&self, delegator: Address) -> Result<Vec<Delegation>> {
        Ok(self.store.delegations_by_delegator(&delegator)?)
    }

    /// Inbound grants held by a delegate.
    pub fn delegations_by_delegate(&self, delegate: Address) -> Result<Vec<Delegation>> {
        Ok(self.store.delegations_by_delegate(&delegate)?)
    }
}

/// Builder for the delegation grant call.
pub struct CreateDelegationBuilder<'a> {
    manager: &'a DelegationManager,
    delegate: Option<Address>,
    caveats: Vec<Caveat>,
    expires_at: Option<i64>,
    ttl_secs: Option<i64>,
}

impl<'a> CreateDelegationBuilder<'a> {
    fn new(manager: &'a DelegationManager) -> Self {
        Self {
            manager,
            delegate: None,
            caveats: Vec::new(),
            expires_at: None,
            ttl_secs: None,
        }
    }

    pub fn with_delegate(mut self, delegate: Address) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn with_caveat(mut self, caveat: Caveat) -> Self {
        self.caveats.push(caveat);
        self
    }

    pub fn with_caveats(mut self, caveats: impl IntoIterator<Item = Caveat>) -> Self {
        self.caveats.extend(caveats);
        self
    }

    /// Absolute expiry, unix seconds. Immutable once signed.
    pub fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Relative lifetime; resolved against the clock at build time.
    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Validate, sign and activate the grant. Caveat validation fails fast,
    /// before any signing attempt; a signer failure marks the record
    /// `Failed` and surfaces `DelegationCreationFailed`.
    pub async fn build(self) -> Result<Delegation> {
        let manager = self.manager;
        let delegate = self
            .delegate
            .ok_or_else(|| DelegateKitError::InvalidAddress("delegate required".to_string()))?;

        caveat::validate(&self.caveats)?;

        let now = manager.clock.now();
        let expires_at = match (self.expires_at, self.ttl_secs) {
            (Some(at), _) => at,
            (None, Some(ttl)) => now.saturating_add(ttl),
            (None, None) => now.saturating_add(DelegationManager::DEFAULT_TTL_SECS),
        };
        if expires_at <= now {
            return Err(DelegateKitError::InvalidPermission(format!(
                "expiry {expires_at} is not in the future"
            )));
        }

        let mut delegation = Delegation::new(
            manager.signer.address(),
            delegate,
            self.caveats,
            now,
            expires_at,
        );
        if delegation.is_unconstrained() {
            tracing::warn!(
                delegation_id = %delegation.id,
                "delegation carries zero caveats: unconstrained spend"
            );
        }

        // Pending exists only for the duration of the signing round-trip.
        manager.store.put_delegation(delegation.clone())?;

        let payload = delegation
            .signable_bytes()
            .map_err(|e| DelegateKitError::DelegationCreationFailed(e.to_string()))?;

        match manager.signer.sign_message(&payload).await {
            Ok(signature) => {
                delegation.signature = Some(signature);
                delegation.status = DelegationStatus::Active;
                manager.store.put_delegation(delegation.clone())?;
                tracing::info!(
                    delegation_id = %delegation.id,
                    delegate = %delegation.delegate,
                    expires_at = delegation.expires_at,
                    "delegation active"
                );
                manager.bus.publish(NotificationEvent::DelegationCreated {
                    delegation_id: delegation.id,
                    delegator: delegation.delegator,
                    delegate: delegation.delegate,
                });
                Ok(delegation)
            }
            Err(reason) => {
                delegation.status = DelegationStatus::Failed;
                manager.store.put_delegation(delegation.clone())?;
                tracing::warn!(delegation_id = %delegation.id, %reason, "signing failed");
                manager.bus.publish(NotificationEvent::DelegationFailed {
                    delegation_id: delegation.id,
                    reason: reason.clone(),
                });
                Err(DelegateKitError::DelegationCreationFailed(reason))
            }
        }
    }
}
