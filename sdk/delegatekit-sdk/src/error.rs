use crate::core::connection::TxHash;
use crate::store::StoreError;
use delegatekit_state::{AddressParseError, CaveatError, CaveatType};
use thiserror::Error;
use uuid::Uuid;

/// SDK-wide error taxonomy.
///
/// Construction-time errors (invalid caveats, invalid addresses) are raised
/// before any network interaction. Only `NetworkUnavailable` is retryable;
/// semantic and security failures are surfaced immediately.
#[derive(Debug, Error)]
pub enum DelegateKitError {
    /// Malformed grant parameters.
    #[error("invalid permission: {0}")]
    InvalidPermission(String),

    /// Malformed or contradictory constraint.
    #[error("invalid caveat: {0}")]
    InvalidCaveat(#[from] CaveatError),

    #[error("permission {0} not found")]
    PermissionNotFound(Uuid),

    #[error("delegation {0} not found")]
    DelegationNotFound(Uuid),

    #[error("delegation {0} is revoked or expired")]
    DelegationRevokedOrExpired(Uuid),

    #[error("caveat violation: {0}")]
    CaveatViolation(CaveatType),

    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Submission failure or on-chain revert.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Ambiguous outcome: the transaction may still land later.
    #[error("timed out awaiting confirmation of {0}; the transaction may still land")]
    ConfirmationTimeout(TxHash),

    /// Transient network-class failure; retried internally up to the bound.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// External agent/authenticator collaborator error.
    #[error("agent action failed: {0}")]
    AgentActionFailed(String),

    #[error("delegation creation failed: {0}")]
    DelegationCreationFailed(String),

    #[error("credential {0} not found")]
    CredentialNotFound(Uuid),

    #[error("credential {0} has been revoked")]
    CredentialRevoked(Uuid),

    #[error("credential {0} has expired")]
    CredentialExpired(Uuid),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("execution cancelled")]
    Cancelled,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl DelegateKitError {
    /// Whether the retry wrapper may re-attempt the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DelegateKitError::NetworkUnavailable(_))
    }
}

impl From<AddressParseError> for DelegateKitError {
    fn from(err: AddressParseError) -> Self {
        DelegateKitError::InvalidAddress(err.to_string())
    }
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, DelegateKitError>;
