use crate::core::clock::Clock;
use crate::delegation::DelegationManager;
use crate::error::{DelegateKitError, Result};
use crate::events::{NotificationBus, NotificationEvent};
use crate::store::GrantStore;
use delegatekit_state::{
    parse_frequency, Address, Caveat, Permission, PermissionKind, TokenKind, VerifyStatus,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Read projection over a permission and its underlying delegation.
#[derive(Clone, Debug, Serialize)]
pub struct PermissionDetails {
    pub permission: Permission,
    pub status: VerifyStatus,
    pub rate_per_second: f64,
}

/// Streaming/recurring payment grants, built strictly atop the delegation
/// manager. A permission never exists independent of exactly one
/// delegation; cancelling one is equivalent to revoking the other.
#[derive(Clone)]
pub struct PermissionService {
    delegations: DelegationManager,
    store: Arc<dyn GrantStore>,
    bus: Arc<NotificationBus>,
    clock: Arc<dyn Clock>,
}

impl PermissionService {
    pub fn new(
        delegations: DelegationManager,
        store: Arc<dyn GrantStore>,
        bus: Arc<NotificationBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            delegations,
            store,
            bus,
            clock,
        }
    }

    /// Grant a streaming payment permission: `amount` per `frequency`
    /// (e.g. `"30d"`), spendable only toward `recipient`. Derives a
    /// `MaxAmount` + `TimeLimit` caveat pair from `(amount, frequency)` and
    /// delegates the rest to delegation creation. The recipient is the
    /// delegate: it pulls payments under the grant.
    pub async fn request_permission(
        &self,
        amount: u128,
        frequency: &str,
        token: TokenKind,
        recipient: Address,
    ) -> Result<Uuid> {
        if amount == 0 {
            return Err(DelegateKitError::InvalidPermission(
                "amount must be positive".to_string(),
            ));
        }
        let period_secs = parse_frequency(frequency)
            .map_err(|e| DelegateKitError::InvalidPermission(e.to_string()))?;

        // The grant is the caveat triple: amount ceiling, recipient lock,
        // and a time limit one period out. The delegation expiry matches
        // the time limit, so either bound alone ends the stream.
        let now = self.clock.now();
        let delegation = self
            .delegations
            .create_delegation()
            .with_delegate(recipient)
            .with_caveat(Caveat::MaxAmount(amount))
            .with_caveat(Caveat::time_limit(now, period_secs as i64))
            .with_caveat(Caveat::WhitelistedAddresses(vec![recipient]))
            .with_ttl(period_secs as i64)
            .build()
            .await?;

        let permission = Permission {
            id: Uuid::new_v4(),
            delegation_id: delegation.id,
            kind: match token {
                TokenKind::Native => PermissionKind::NativeTokenStream,
                TokenKind::Erc20(_) => PermissionKind::Custom,
            },
            amount,
            period_secs,
            token,
            recipient,
        };
        self.store.put_permission(permission.clone())?;
        tracing::info!(
            permission_id = %permission.id,
            delegation_id = %delegation.id,
            amount,
            period_secs,
            "permission granted"
        );
        self.bus.publish(NotificationEvent::PermissionGranted {
            permission_id: permission.id,
            delegation_id: delegation.id,
        });
        Ok(permission.id)
    }

    /// Cancel a permission by revoking its underlying delegation.
    pub async fn cancel(&self, permission_id: Uuid) -> Result<bool> {
        let permission = self
            .store
            .permission(&permission_id)?
            .ok_or(DelegateKitError::PermissionNotFound(permission_id))?;

        let revoked = self.delegations.revoke(permission.delegation_id).await?;
        tracing::info!(permission_id = %permission_id, revoked, "permission cancelled");
        self.bus
            .publish(NotificationEvent::PermissionCancelled { permission_id });
        Ok(revoked)
    }

    /// Read projection: the stored permission, its live delegation status
    /// and the derived streaming rate.
    pub fn details(&self, permission_id: Uuid) -> Result<PermissionDetails> {
        let permission = self
            .store
            .permission(&permission_id)?
            .ok_or(DelegateKitError::PermissionNotFound(permission_id))?;
        let status = self.delegations.verify(permission.delegation_id)?;
        let rate_per_second = permission.rate_per_second();
        Ok(PermissionDetails {
            permission,
            status,
            rate_per_second,
        })
    }
}
