//! Execute a delegated transfer end to end, including the retry path.

use async_trait::async_trait;
use delegatekit_sdk::state::{Address, Caveat, TokenKind};
use delegatekit_sdk::{
    CallPayload, ChainConnection, ChainError, ExecuteOptions, ExecutionRequest, GasEstimate,
    LocalSigner, SignedPayload, SmartAccount, SubmissionHandle, TransactionReceipt, TxHash,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Chain that drops the first submission, exercising the backoff path.
struct FlakyChain {
    sends: AtomicU32,
}

#[async_trait]
impl ChainConnection for FlakyChain {
    async fn estimate_gas(&self, _payload: &CallPayload) -> Result<GasEstimate, ChainError> {
        Ok(GasEstimate {
            gas_limit: 21_000,
            fee: 1,
        })
    }

    async fn send_transaction(
        &self,
        _payload: &SignedPayload,
    ) -> Result<SubmissionHandle, ChainError> {
        if self.sends.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ChainError::Network("connection reset".into()));
        }
        Ok(SubmissionHandle {
            hash: TxHash([7u8; 32]),
        })
    }

    async fn wait_for_receipt(
        &self,
        handle: &SubmissionHandle,
        confirmations: u32,
        _timeout: Duration,
    ) -> Result<TransactionReceipt, ChainError> {
        Ok(TransactionReceipt {
            hash: handle.hash,
            block_number: 42,
            confirmations,
            success: true,
        })
    }

    async fn read_balance(
        &self,
        _account: &Address,
        _token: &TokenKind,
    ) -> Result<u128, ChainError> {
        Ok(1_000_000)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let owner = Address::from_low_byte(1);
    let recipient = Address::from_low_byte(2);
    let chain = Arc::new(FlakyChain {
        sends: AtomicU32::new(0),
    });
    let account = SmartAccount::builder(
        Arc::clone(&chain) as Arc<dyn ChainConnection>,
        Arc::new(LocalSigner::random(owner)),
    )
    .build();

    let delegation = account
        .create_delegation()
        .with_delegate(recipient)
        .with_caveat(Caveat::MaxAmount(500))
        .build()
        .await?;

    let receipt = account
        .execute(
            ExecutionRequest::transfer(owner, recipient, 250).via_delegation(delegation.id),
            ExecuteOptions::default(),
        )
        .await?;
    println!(
        "confirmed {} in block {} after {} submissions",
        receipt.hash,
        receipt.block_number,
        chain.sends.load(Ordering::SeqCst),
    );
    Ok(())
}
