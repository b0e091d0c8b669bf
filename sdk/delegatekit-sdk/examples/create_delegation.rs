//! Create a caveated delegation, verify it, then revoke it.

use async_trait::async_trait;
use delegatekit_sdk::state::{Address, Caveat, TokenKind};
use delegatekit_sdk::{
    CallPayload, ChainConnection, ChainError, GasEstimate, LocalSigner, SignedPayload,
    SmartAccount, SubmissionHandle, TransactionReceipt, TxHash,
};
use std::sync::Arc;
use std::time::Duration;

/// Stand-in substrate that accepts everything.
struct DevChain;

#[async_trait]
impl ChainConnection for DevChain {
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
        Ok(SubmissionHandle {
            hash: TxHash([0u8; 32]),
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
            block_number: 1,
            confirmations,
            success: true,
        })
    }

    async fn read_balance(
        &self,
        _account: &Address,
        _token: &TokenKind,
    ) -> Result<u128, ChainError> {
        Ok(u128::MAX)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let owner = Address::from_low_byte(1);
    let agent = Address::from_low_byte(2);
    let account = SmartAccount::builder(Arc::new(DevChain), Arc::new(LocalSigner::random(owner)))
        .build();

    let delegation = account
        .create_delegation()
        .with_delegate(agent)
        .with_caveat(Caveat::MaxAmount(1_000))
        .with_caveat(Caveat::WhitelistedAddresses(vec![agent]))
        .with_ttl(24 * 60 * 60)
        .build()
        .await?;
    println!("delegation {} granted to {}", delegation.id, delegation.delegate);
    println!("status: {:?}", account.verify_delegation(delegation.id)?);

    account.revoke_delegation(delegation.id).await?;
    println!("status after revoke: {:?}", account.verify_delegation(delegation.id)?);
    Ok(())
}
