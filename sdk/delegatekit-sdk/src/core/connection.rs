use crate::core::payload::{CallPayload, SignedPayload};
use async_trait::async_trait;
use delegatekit_state::{Address, TokenKind};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Transaction hash assigned by the substrate at submission time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Handle returned by a successful submission, used to await the receipt.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionHandle {
    pub hash: TxHash,
}

#[derive(Clone, Copy, Debug)]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub fee: u128,
}

#[derive(Clone, Copy, Debug)]
pub struct TransactionReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub confirmations: u32,
    pub success: bool,
}

/// Failure classes of the chain substrate. `Network` is transient and may
/// be retried; `Rejected` is a semantic refusal and must not be.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("network error: {0}")]
    Network(String),
    #[error("rejected by substrate: {0}")]
    Rejected(String),
    #[error("timed out")]
    Timeout,
}

impl ChainError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Network(_))
    }
}

/// The external chain RPC/bundler collaborator. The SDK constructs opaque
/// payloads and consumes these primitives; it never interprets chain state
/// beyond balances and receipts.
#[async_trait]
pub trait ChainConnection: Send + Sync {
    async fn estimate_gas(&self, payload: &CallPayload) -> Result<GasEstimate, ChainError>;

    async fn send_transaction(&self, payload: &SignedPayload)
        -> Result<SubmissionHandle, ChainError>;

    async fn wait_for_receipt(
        &self,
        handle: &SubmissionHandle,
        confirmations: u32,
        timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError>;

    async fn read_balance(&self, account: &Address, token: &TokenKind)
        -> Result<u128, ChainError>;
}
