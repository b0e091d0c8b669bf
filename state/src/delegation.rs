use crate::address::Address;
use crate::caveat::{self, Caveat};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored lifecycle states of a delegation.
///
/// `Pending` exists only during the signing round-trip. `Revoked` and
/// `Failed` are terminal. Expiry is never stored; it is derived from
/// `expires_at` at verification time, see [`Delegation::verify_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationStatus {
    Pending,
    Active,
    Revoked,
    Failed,
}

impl DelegationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DelegationStatus::Revoked | DelegationStatus::Failed)
    }
}

/// Result of verifying a delegation at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyStatus {
    Active,
    Revoked,
    Expired,
    NotFound,
}

/// A signed, caveat-constrained grant of limited authority from a smart
/// account to a delegate address.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Delegation {
    pub id: Uuid,
    pub delegator: Address,
    pub delegate: Address,
    pub caveats: Vec<Caveat>,
    pub created_at: i64,
    pub expires_at: i64,
    pub status: DelegationStatus,
    pub signature: Option<Vec<u8>>,
}

/// The unsigned view of a delegation, canonicalized for signing.
#[derive(Serialize)]
struct SignablePayload<'a> {
    id: &'a Uuid,
    delegator: &'a Address,
    delegate: &'a Address,
    caveats: &'a [Caveat],
    created_at: i64,
    expires_at: i64,
}

impl Delegation {
    /// Construct an unsigned, `Pending` delegation.
    pub fn new(
        delegator: Address,
        delegate: Address,
        caveats: Vec<Caveat>,
        created_at: i64,
        expires_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            delegator,
            delegate,
            caveats,
            created_at,
            expires_at,
            status: DelegationStatus::Pending,
            signature: None,
        }
    }

    /// A delegation with zero caveats is legal but implies unconstrained
    /// spend; callers are expected to flag it.
    pub fn is_unconstrained(&self) -> bool {
        self.caveats.is_empty()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn needs_confirmation(&self) -> bool {
        caveat::needs_confirmation(&self.caveats)
    }

    /// Project the delegation onto its externally observable state.
    /// `Expired` is computed here, lazily; `Pending` and `Failed` grants
    /// never became usable and report as `NotFound`.
    pub fn verify_at(&self, now: i64) -> VerifyStatus {
        match self.status {
            DelegationStatus::Active if self.is_expired(now) => VerifyStatus::Expired,
            DelegationStatus::Active => VerifyStatus::Active,
            DelegationStatus::Revoked => VerifyStatus::Revoked,
            DelegationStatus::Pending | DelegationStatus::Failed => VerifyStatus::NotFound,
        }
    }

    /// Canonical bytes the delegator signs over. Stable field order via
    /// the serialized struct definition.
    pub fn signable_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&SignablePayload {
            id: &self.id,
            delegator: &self.delegator,
            delegate: &self.delegate,
            caveats: &self.caveats,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}
