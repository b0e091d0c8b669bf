//! Grant a streaming payment permission and watch its lifecycle events.

use async_trait::async_trait;
use delegatekit_sdk::state::{Address, TokenKind};
use delegatekit_sdk::{
    CallPayload, ChainConnection, ChainError, GasEstimate, LocalSigner, NotificationKind,
    SignedPayload, SmartAccount, SubmissionHandle, TransactionReceipt, TxHash,
};
use std::sync::Arc;
use std::time::Duration;

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
    let service = Address::from_low_byte(9);
    let account = SmartAccount::builder(Arc::new(DevChain), Arc::new(LocalSigner::random(owner)))
        .build();

    let _watcher = account.on(NotificationKind::PermissionGranted, |event| {
        println!("event: {event:?}");
    });

    // 100 native tokens, streamed over 30 days, spendable only by `service`.
    let permission_id = account
        .request_permission(100, "30d", TokenKind::Native, service)
        .await?;

    let details = account.permission_details(permission_id)?;
    println!(
        "permission {} streams {} per {}s ({:.3e}/s) toward {}",
        permission_id,
        details.permission.amount,
        details.permission.period_secs,
        details.rate_per_second,
        details.permission.recipient,
    );

    account.cancel_permission(permission_id).await?;
    println!("after cancel: {:?}", account.permission_details(permission_id)?.status);
    Ok(())
}
